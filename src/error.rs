//! Error types for SQLBot
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for SQLBot operations
///
/// Transport-level failures are described by [`crate::api::ApiError`]; once
/// they reach the session store they are flattened into [`SqlbotError::Remote`],
/// which carries only the diagnostic string. Callers that need to react to a
/// failed store operation only ever inspect success or failure.
#[derive(Error, Debug)]
pub enum SqlbotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote call issued by the session store failed
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// Invalid input to a command handler
    #[error("Command error: {0}")]
    Command(String),

    /// IO errors while reading the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors in the config file
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Line editor errors from the interactive chat loop
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl SqlbotError {
    /// Wraps any displayable remote failure into [`SqlbotError::Remote`]
    pub fn remote(err: impl std::fmt::Display) -> Self {
        Self::Remote(err.to_string())
    }
}

/// Result type alias for SQLBot operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = SqlbotError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_remote_error_display() {
        let error = SqlbotError::Remote("API error (500): boom".to_string());
        assert_eq!(error.to_string(), "Remote call failed: API error (500): boom");
    }

    #[test]
    fn test_remote_helper_uses_display() {
        let error = SqlbotError::remote("connection refused");
        assert!(matches!(error, SqlbotError::Remote(ref m) if m == "connection refused"));
    }

    #[test]
    fn test_command_error_display() {
        let error = SqlbotError::Command("missing session id".to_string());
        assert_eq!(error.to_string(), "Command error: missing session id");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: SqlbotError = io_error.into();
        assert!(matches!(error, SqlbotError::Io(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: SqlbotError = yaml_error.into();
        assert!(matches!(error, SqlbotError::Yaml(_)));
    }

    #[test]
    fn test_readline_error_conversion() {
        let error: SqlbotError = rustyline::error::ReadlineError::Eof.into();
        assert!(matches!(error, SqlbotError::Readline(_)));
        assert_eq!(error.to_string(), "Readline error: EOF");
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let result: Result<()> = Err(SqlbotError::Remote("timeout".to_string()).into());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SqlbotError>(),
            Some(SqlbotError::Remote(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqlbotError>();
    }
}
