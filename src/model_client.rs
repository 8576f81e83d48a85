//! Client for the generative model backend (Ollama-compatible).
//!
//! The Regenerator only ever needs a non-streaming `/api/generate` call
//! and an `/api/tags` availability probe against Ollama's native API. Both
//! operations are captured in [`ModelBackend`] so that the Regenerator and
//! the prompt classifier can be driven against a canned [`MockModelBackend`]
//! in tests, rather than a live Ollama instance.

use crate::error::{AioptimError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// The generative-model operations the Regenerator and the prompt
/// classifier depend on.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Non-streaming single-shot completion; returns the backend's
    /// `response` text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Whether the configured model is currently listed as available.
    async fn is_model_available(&self) -> Result<bool>;
}

pub struct ModelClient {
    http: Client,
    base_url: String,
    model: String,
}

impl ModelClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self::new("http://localhost:11434", "codellama")
    }
}

#[async_trait]
impl ModelBackend for ModelClient {
    /// Probe `/api/tags` and check whether the configured model is listed.
    /// A connection failure is itself a `ConnectionError`, distinct from
    /// the model simply being absent from the list.
    async fn is_model_available(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?;
        let listed = body["models"]
            .as_array()
            .map(|models| {
                models.iter().any(|m| {
                    m["name"]
                        .as_str()
                        .map(|name| name == self.model || name.starts_with(&format!("{}:", self.model)))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);
        Ok(listed)
    }

    /// Non-streaming `POST /api/generate`. Any transport failure, or any
    /// response without a usable `response` string, is a hard error —
    /// no distinction is made between the two.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|_| AioptimError::InvalidResponse("Invalid Response from Ollama API".into()))?;
        if !resp.status().is_success() {
            return Err(AioptimError::InvalidResponse(
                "Invalid Response from Ollama API".into(),
            ));
        }
        let parsed: Value = resp
            .json()
            .await
            .map_err(|_| AioptimError::InvalidResponse("Invalid Response from Ollama API".into()))?;
        parsed["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AioptimError::InvalidResponse("Invalid Response from Ollama API".into()))
    }
}

/// A test backend that returns pre-configured `generate` responses in
/// order, cycling back to the start once all have been consumed.
/// `is_model_available` always reports `true` unless overridden with
/// [`MockModelBackend::unavailable`].
///
/// Mirrors the pack's `MockBackend` pattern for LLM clients: a small
/// hand-written fake rather than a mocking-framework dependency.
#[cfg(test)]
pub struct MockModelBackend {
    responses: Vec<String>,
    index: std::sync::atomic::AtomicUsize,
    available: bool,
}

#[cfg(test)]
impl MockModelBackend {
    /// Cycles through `responses` in order, wrapping back to the start
    /// once exhausted.
    pub fn new(responses: Vec<&str>) -> Self {
        assert!(!responses.is_empty(), "MockModelBackend requires at least one response");
        Self {
            responses: responses.into_iter().map(str::to_string).collect(),
            index: std::sync::atomic::AtomicUsize::new(0),
            available: true,
        }
    }

    pub fn fixed(response: &str) -> Self {
        Self::new(vec![response])
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    fn next_response(&self) -> String {
        let idx = self.index.fetch_add(1, std::sync::atomic::Ordering::Relaxed) % self.responses.len();
        self.responses[idx].clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelBackend for MockModelBackend {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.next_response())
    }

    async fn is_model_available(&self) -> Result<bool> {
        Ok(self.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_cycles_back_to_start_once_exhausted() {
        let mock = MockModelBackend::new(vec!["first", "second"]);
        assert_eq!(mock.generate("x").await.unwrap(), "first");
        assert_eq!(mock.generate("x").await.unwrap(), "second");
        assert_eq!(mock.generate("x").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn mock_unavailable_reports_false() {
        let mock = MockModelBackend::fixed("anything").unavailable();
        assert!(!mock.is_model_available().await.unwrap());
    }
}
