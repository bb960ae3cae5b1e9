use thiserror::Error;

/// Common error types shared by the nostrcoin crates
#[derive(Error, Debug)]
pub enum CommonError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Amounts that are not non-negative fixed-point decimals
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging subscriber setup errors
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CommonError>;

impl From<config::ConfigError> for CommonError {
    fn from(err: config::ConfigError) -> Self {
        CommonError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_prefixed_once() {
        let err: CommonError = config::ConfigError::Message("missing field".to_string()).into();
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }
}
