//! Error types for JobGuard

/// Result type alias using JobGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for JobGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request carried no text, or an empty string
    #[error("No input text")]
    EmptyInput,

    /// Text could not be converted into model input
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Forward pass or output validation failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Model artifacts are missing or malformed
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller stopped waiting for a prediction
    #[error("Prediction timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new tokenization error
    pub fn tokenization(msg: impl Into<String>) -> Self {
        Self::Tokenization(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller caused this error (maps to a 4xx response)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }

    /// Short, stable name used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::Tokenization(_) => "tokenization",
            Self::Inference(_) => "inference",
            Self::ModelLoad(_) => "model_load",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_message() {
        assert_eq!(Error::EmptyInput.to_string(), "No input text");
        assert!(Error::EmptyInput.is_client_error());
    }

    #[test]
    fn test_internal_errors_are_not_client_errors() {
        assert!(!Error::inference("NaN in logits").is_client_error());
        assert!(!Error::tokenization("bad vocab").is_client_error());
        assert_eq!(Error::inference("x").kind(), "inference");
    }
}
