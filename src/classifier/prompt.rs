//! LLM-prompt classifier: asks the generative model whether a method body
//! is slow, via a literal `$CODE$` prompt template.
//!
//! Keeps the method iff the word "slow" appears anywhere in the
//! (lowercased) response.

use crate::error::Result;
use crate::model::Method;
use crate::model_client::ModelBackend;
use crate::prompt_template;
use async_trait::async_trait;
use std::sync::Arc;

/// Not part of the persisted prompt file — this template is built inline
/// rather than read from the YAML prompt file, since classification is a
/// narrower need than the Regenerator's four templates.
pub const DEFAULT_TEMPLATE: &str = "Is the following method slow? Answer with a sentence \
    that includes the word \"slow\" if it is.\n\n$CODE$";

pub struct PromptClassifier {
    model: Arc<dyn ModelBackend>,
    template: String,
}

impl PromptClassifier {
    pub fn new(model: Arc<dyn ModelBackend>, template: impl Into<String>) -> Self {
        Self {
            model,
            template: template.into(),
        }
    }

    pub fn with_default_template(model: Arc<dyn ModelBackend>) -> Self {
        Self::new(model, DEFAULT_TEMPLATE)
    }
}

#[async_trait]
impl crate::classifier::Classifier for PromptClassifier {
    async fn is_slow(&self, method: &Arc<Method>) -> Result<bool> {
        let prompt = prompt_template::render(&self.template, &[("$CODE$", &method.body)]);
        let response = self.model.generate(&prompt).await?;
        Ok(response.to_lowercase().contains("slow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::model::File;
    use crate::model_client::MockModelBackend;
    use crate::technology::Language as SourceLanguage;

    #[test]
    fn template_renders_with_method_body() {
        let rendered = prompt_template::render(
            "Is this method slow?\n$CODE$",
            &[("$CODE$", "def f(): pass")],
        );
        assert_eq!(rendered, "Is this method slow?\ndef f(): pass");
    }

    /// Spec §8 scenario 2: two methods fed through the prompt classifier,
    /// the model answering "fast" then "this is SLOW code" — only the
    /// second method is kept.
    #[tokio::test]
    async fn keeps_only_methods_the_model_calls_slow() {
        let model = Arc::new(MockModelBackend::new(vec!["fast", "this is SLOW code"]));
        let classifier = PromptClassifier::with_default_template(model);

        let file = File::new("a.py", SourceLanguage::Python, "");
        let quick = Arc::new(Method::new(&file, "quick", "()", "def quick(): pass", None));
        let slow = Arc::new(Method::new(&file, "slow", "()", "def slow(): pass", None));

        assert!(!classifier.is_slow(&quick).await.unwrap());
        assert!(classifier.is_slow(&slow).await.unwrap());
    }
}
