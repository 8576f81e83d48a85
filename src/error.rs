use thiserror::Error;

/// Errors produced by the pipeline and its components.
///
/// The five named variants correspond to the error kinds of the service:
/// missing/malformed configuration, transport failures, bad model payloads,
/// a misconfigured repository target, and an unavailable generative model.
#[derive(Error, Debug)]
pub enum AioptimError {
    /// Missing/malformed config or prompt file. Raised by validators before
    /// the scheduler loop starts; the CLI aborts with exit code 1.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Any outbound HTTP transport failure against the metrics backend,
    /// the repo host, or the model backend. Aborts the current tick; the
    /// scheduler continues to the next one.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The model backend returned a payload without a usable `response`
    /// field, or a non-JSON body. Aborts the current tick.
    #[error("invalid response from model backend: {0}")]
    InvalidResponse(String),

    /// No accessible repository matches the configured name with both pull
    /// and push permissions. Raised at Publisher construction; fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// The configured model is not listed by the model backend at
    /// Regeneration time. Raised mid-tick; aborts the tick.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Catch-all for errors that do not map onto one of the named kinds.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for AioptimError {
    fn from(err: reqwest::Error) -> Self {
        AioptimError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for AioptimError {
    fn from(err: serde_json::Error) -> Self {
        AioptimError::InvalidResponse(err.to_string())
    }
}

impl From<serde_yaml::Error> for AioptimError {
    fn from(err: serde_yaml::Error) -> Self {
        AioptimError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AioptimError {
    fn from(err: std::io::Error) -> Self {
        AioptimError::ConfigError(err.to_string())
    }
}

impl From<anyhow::Error> for AioptimError {
    fn from(err: anyhow::Error) -> Self {
        AioptimError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AioptimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = AioptimError::ConfigError("missing key".into());
        assert_eq!(err.to_string(), "configuration error: missing key");
    }

    #[test]
    fn model_unavailable_display() {
        let err = AioptimError::ModelUnavailable("codellama".into());
        assert_eq!(err.to_string(), "model unavailable: codellama");
    }

    #[test]
    fn anyhow_conversion_is_lossy_other() {
        let err: AioptimError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AioptimError::Other(msg) if msg == "boom"));
    }
}
