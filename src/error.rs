use thiserror::Error;

/// Errors surfaced by the registry and controller.
///
/// Handler failures are not represented here: they are the handler's own
/// `anyhow::Error` and are delivered to the output sink as
/// [`DispatchEvent::Failed`](crate::model::DispatchEvent::Failed).
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("Invalid handler: {0}")]
    InvalidHandler(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid handler error
    pub fn invalid_handler<S: Into<String>>(msg: S) -> Self {
        Self::InvalidHandler(msg.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownCommand(name) => {
                format!("unknown command `{}`. Type `help` to list available commands.", name)
            }
            Self::InvalidInput(msg) => {
                format!("Invalid input: {}. Usage: <command> [args...]", msg)
            }
            Self::Configuration(msg) => {
                format!("Configuration error: {}. Check the file passed with --config.", msg)
            }
            _ => self.to_string(),
        }
    }
}

/// Convenient result type for the controller core
pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation_helpers() {
        match ControllerError::invalid_input("empty request") {
            ControllerError::InvalidInput(msg) => assert_eq!(msg, "empty request"),
            other => panic!("Expected InvalidInput error, got {other:?}"),
        }

        match ControllerError::invalid_handler("name is empty") {
            ControllerError::InvalidHandler(msg) => assert_eq!(msg, "name is empty"),
            other => panic!("Expected InvalidHandler error, got {other:?}"),
        }

        match ControllerError::configuration("max_concurrent must be at least 1") {
            ControllerError::Configuration(msg) => {
                assert_eq!(msg, "max_concurrent must be at least 1")
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_display_messages() {
        let errors = vec![
            (
                ControllerError::InvalidInput("no tokens".to_string()),
                "Invalid input: no tokens",
            ),
            (
                ControllerError::UnknownCommand("nope".to_string()),
                "unknown command `nope`",
            ),
            (
                ControllerError::InvalidHandler("bad".to_string()),
                "Invalid handler: bad",
            ),
            (
                ControllerError::Configuration("broken".to_string()),
                "Configuration error: broken",
            ),
            (
                ControllerError::Runtime("no reactor".to_string()),
                "Runtime error: no reactor",
            ),
        ];

        for (error, expected_message) in errors {
            assert_eq!(error.to_string(), expected_message);
        }
    }

    #[test]
    fn test_unknown_command_is_distinguishable_from_malformed_request() {
        let unknown = ControllerError::UnknownCommand("nope".to_string());
        let malformed = ControllerError::InvalidInput("empty request".to_string());

        assert!(matches!(unknown, ControllerError::UnknownCommand(_)));
        assert!(matches!(malformed, ControllerError::InvalidInput(_)));
        assert_ne!(unknown.to_string(), malformed.to_string());
    }

    #[test]
    fn test_user_friendly_error_messages() {
        let message = ControllerError::UnknownCommand("deploy".to_string()).user_message();
        assert!(message.contains("deploy"));
        assert!(message.contains("help"));

        let message = ControllerError::InvalidInput("empty request".to_string()).user_message();
        assert!(message.contains("Usage"));

        let message = ControllerError::Configuration("bad value".to_string()).user_message();
        assert!(message.contains("--config"));

        // Generic error falls back to Display
        let message = ControllerError::Runtime("gone".to_string()).user_message();
        assert_eq!(message, "Runtime error: gone");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = ControllerError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(matches!(io_err, ControllerError::Io(_)));
        assert_eq!(io_err.user_message(), "IO error: missing");
    }
}
