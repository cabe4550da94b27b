use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors raised by the extraction pipeline.
///
/// Every stage either returns a complete result or one of these; nothing is
/// swallowed on the way up to the CLI.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractorError {
    /// Create a data unavailable error with a custom message
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        ExtractorError::DataUnavailable(msg.into())
    }

    /// Create a malformed input error with a custom message
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        ExtractorError::MalformedInput(msg.into())
    }

    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        ExtractorError::ValidationFailure(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ExtractorError::Configuration(msg.into())
    }
}
