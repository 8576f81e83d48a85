//! SlowFilter: pluggable classification of methods as "slow" or not.
//!
//! Two concrete strategies implement the same [`Classifier`] trait:
//! [`learned::LearnedClassifier`] (a fine-tuned sequence-classification
//! model) and [`prompt::PromptClassifier`] (an LLM-prompt classifier). The
//! SlowFilter stage itself only ever calls through the trait object and is
//! indifferent to which strategy backs it.

pub mod learned;
pub mod prompt;

use crate::error::Result;
use crate::model::Method;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Whether `method` should be treated as slow.
    async fn is_slow(&self, method: &Arc<Method>) -> Result<bool>;
}

/// Always reports "slow" without inspecting the method at all.
///
/// Exists for the SlowFilter's single-method bypass path (a fault line of
/// exactly one method is never actually classified) and for tests that
/// need a `Classifier` without a real model or backend behind it.
pub struct SingleBypassClassifier;

#[async_trait]
impl Classifier for SingleBypassClassifier {
    async fn is_slow(&self, _method: &Arc<Method>) -> Result<bool> {
        Ok(true)
    }
}

pub use learned::LearnedClassifier;
pub use prompt::PromptClassifier;
