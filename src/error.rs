use std::path::PathBuf;

use crate::dispatch::DispatchError;

pub type Result<T> = std::result::Result<T, InferenceError>;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error for {parameter}: {message}")]
    Configuration { parameter: String, message: String },

    #[error("Invalid {parameter}: {message}")]
    InvalidSetting { parameter: String, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("{family} has no available architecture to load {}", path.display())]
    UnsupportedArchitecture { family: String, path: PathBuf },

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Dataset error in {}: {message}", path.display())]
    Dataset { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

impl InferenceError {
    pub(crate) fn configuration(parameter: &str, message: impl Into<String>) -> Self {
        InferenceError::Configuration {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}

/// Extension trait for error classification
pub trait ErrorExt {
    /// Errors raised before any provider exists; the binary exits with -1 on these.
    fn is_configuration(&self) -> bool;
}

impl ErrorExt for InferenceError {
    fn is_configuration(&self) -> bool {
        matches!(
            self,
            InferenceError::Dispatch(_) | InferenceError::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelFamily;

    #[test]
    fn test_error_display() {
        let error = InferenceError::configuration("labels", "expected a JSON list of strings");
        assert_eq!(
            error.to_string(),
            "Configuration error for labels: expected a JSON list of strings"
        );

        let error = InferenceError::UnsupportedArchitecture {
            family: "bloom".to_string(),
            path: PathBuf::from("LLMs/bloomz"),
        };
        assert_eq!(
            error.to_string(),
            "bloom has no available architecture to load LLMs/bloomz"
        );
    }

    #[test]
    fn test_error_classification() {
        let error: InferenceError = DispatchError::UnsupportedClassify(ModelFamily::Qwen).into();
        assert!(error.is_configuration());
        assert_eq!(error.to_string(), "Classify with Qwen is not support now.");

        let error = InferenceError::Model("weights missing".to_string());
        assert!(!error.is_configuration());
    }
}
