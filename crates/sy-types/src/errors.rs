use thiserror::Error;

/// Main error type for the Sibyl system
#[derive(Error, Debug)]
pub enum SyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Correlation error: {0}")]
    Correlation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Sibyl operations
pub type SyResult<T> = Result<T, SyError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SyError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SyError::Internal(format!($($arg)*))
    };
}
