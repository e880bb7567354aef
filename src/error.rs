//! Error types for tasksync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unknown task)
//! - 4: Operation failed (network, server, decoding)

use thiserror::Error;

/// Exit codes for the tasksync CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasksync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error("Push channel closed for session {0}")]
    ChannelClosed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response. `message` is the `message` field of the error
    /// body when the server sent one.
    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no error message"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("Malformed push frame: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidArgument(_) | Error::TaskNotFound(_) => {
                exit_codes::USER_ERROR
            }

            Error::ChannelClosed(_)
            | Error::Transport(_)
            | Error::Server { .. }
            | Error::Decode(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// The user-facing message carried by a structured server error body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Extra machine-readable context for JSON output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Server { status, message } => Some(serde_json::json!({
                "status": status,
                "message": message,
            })),
            _ => None,
        }
    }
}

/// Result type alias for tasksync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
