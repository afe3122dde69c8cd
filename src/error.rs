//! Error types for friction
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, empty text, malformed backup, blocked task)
//! - 4: Operation failed (io, lock, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the friction CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for friction operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed backup: {0}")]
    MalformedBackup(String),

    #[error("Task {0} is blocked and cannot be picked for today")]
    TaskBlocked(String),

    #[error("Ambiguous id '{input}' matches {count} records")]
    AmbiguousId { input: String, count: usize },

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::MalformedBackup(_)
            | Error::TaskBlocked(_)
            | Error::AmbiguousId { .. }
            | Error::ConfirmationRequired(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskBlocked(id) => Some(serde_json::json!({ "task_id": id })),
            Error::AmbiguousId { input, count } => {
                Some(serde_json::json!({ "input": input, "matches": count }))
            }
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for friction operations
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
