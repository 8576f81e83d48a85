//! Learned-model classifier: a fine-tuned sequence-classification model run
//! locally via ONNX Runtime.
//!
//! A method body is tokenized without truncation, split into
//! `TOKEN_MAX`-sized chunks, each chunk is classified independently, and
//! the method is "slow" unless "fast" strictly outnumbers "slow" across
//! chunks — ties favor "slow".

use crate::error::{AioptimError, Result};
use crate::model::Method;
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Value;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

const TOKEN_MAX: usize = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Slow,
    Fast,
}

/// Runs an exported sequence-classification model (e.g. a fine-tuned
/// GraphCodeBERT checkpoint) against chunks of method source.
///
/// `Session` is wrapped in a `Mutex` because `ort` sessions are not `Sync`
/// in the general case, and this classifier is shared across the
/// pipeline's single-threaded tick loop as an `Arc<dyn Classifier>`.
pub struct LearnedClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl LearnedClassifier {
    pub fn load(model_path: &str, tokenizer_path: &str) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| AioptimError::Other(format!("failed to load model: {e}")))?;
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| AioptimError::Other(format!("failed to load tokenizer: {e}")))?;
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn classify_chunk(&self, ids: &[u32]) -> Result<Label> {
        let input_ids: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = vec![1; ids.len()];
        let shape = [1usize, ids.len()];

        let input_ids = Value::from_array((shape, input_ids))
            .map_err(|e| AioptimError::Other(format!("failed to build input tensor: {e}")))?;
        let attention_mask = Value::from_array((shape, attention_mask))
            .map_err(|e| AioptimError::Other(format!("failed to build attention tensor: {e}")))?;

        let mut session = self.session.lock().expect("model session lock poisoned");
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            ])
            .map_err(|e| AioptimError::Other(format!("model inference failed: {e}")))?;

        let logits = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AioptimError::Other(format!("failed to read model output: {e}")))?;
        let (_, data) = logits;

        // Binary classifier: index 0 is FAST (LABEL_0), index 1 is SLOW (LABEL_1).
        if data.len() < 2 {
            return Err(AioptimError::Other("model returned fewer than two logits".into()));
        }
        Ok(if data[1] >= data[0] { Label::Slow } else { Label::Fast })
    }
}

#[async_trait]
impl crate::classifier::Classifier for LearnedClassifier {
    async fn is_slow(&self, method: &Arc<Method>) -> Result<bool> {
        let encoding = self
            .tokenizer
            .encode(method.body.as_str(), false)
            .map_err(|e| AioptimError::Other(format!("tokenization failed: {e}")))?;
        let ids = encoding.get_ids();

        let mut slow_count = 0usize;
        let mut fast_count = 0usize;
        for chunk in ids.chunks(TOKEN_MAX) {
            match self.classify_chunk(chunk)? {
                Label::Slow => slow_count += 1,
                Label::Fast => fast_count += 1,
            }
        }

        // Ties (including the zero-chunk case, which cannot occur since
        // `chunks` never yields zero chunks for non-empty input) favor slow.
        Ok(fast_count <= slow_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_tiebreak_favors_slow_on_equal_vote() {
        // A 1-1 split must favor slow — the vote arithmetic here
        // (`fast <= slow`) must agree.
        let slow_count = 1;
        let fast_count = 1;
        assert!(fast_count <= slow_count);
    }
}
