//! Error types for the Pebble CLI client

use std::time::Duration;
use thiserror::Error;

use crate::exec::StreamData;

/// Client error type
///
/// Callers branch on the variant; the message text is for humans only.
#[derive(Error, Debug)]
pub enum Error {
    /// The pebble binary is missing or cannot be executed
    #[error("pebble binary not found: {binary}")]
    ConnectionUnavailable {
        /// The configured binary path
        binary: String,
    },

    /// A management command exited with a non-zero code
    #[error("{status} (code {code}): {message}")]
    CommandFailed {
        /// Exit code of the pebble process
        code: i32,
        /// Short status line
        status: String,
        /// Structured payload, `{"message": <stderr>}`
        body: serde_json::Value,
        /// Human readable message, the captured stderr
        message: String,
    },

    /// The command did not finish before its deadline
    #[error("command {command:?} timed out after {timeout:?}")]
    Timeout {
        /// The command that was attempted
        command: Vec<String>,
        /// The configured deadline
        timeout: Duration,
    },

    /// A command run through `exec` exited with a non-zero code
    #[error("command {command:?} exited with code {exit_code}")]
    ExecutionFailed {
        /// The command that was executed
        command: Vec<String>,
        /// Exit code, or the negated signal number for signal deaths
        exit_code: i32,
        /// Captured standard output
        stdout: StreamData,
        /// Captured standard error, absent when combined into stdout
        stderr: Option<StreamData>,
    },

    /// A listing header lacks a column the decoder needs
    #[error("column '{column}' not found in header: {header}")]
    HeaderColumnMissing {
        /// The missing column name
        column: String,
        /// The header line that was searched
        header: String,
    },

    /// A field of the CLI output could not be decoded
    #[error("cannot decode {field} from {value:?}")]
    Decode {
        /// The field being decoded
        field: String,
        /// The raw text
        value: String,
    },

    /// The caller passed an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The plan output is not valid YAML
    #[error("invalid plan: {0}")]
    Plan(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other process-layer failure
    #[error("command execution error: {0}")]
    Executor(command_executor::Error),
}

impl Error {
    /// Create a decode error for `field` holding `value`
    pub fn decode(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<command_executor::Error> for Error {
    fn from(err: command_executor::Error) -> Self {
        use command_executor::Error as Exec;

        match err {
            Exec::CommandNotFound { command } => Self::ConnectionUnavailable { binary: command },
            Exec::TimedOut { command, timeout } => Self::Timeout { command, timeout },
            Exec::ExitFailure {
                command,
                code,
                stderr,
            } => {
                let message = if stderr.trim().is_empty() {
                    format!("command {command:?} exited with code {code}")
                } else {
                    stderr
                };
                Self::CommandFailed {
                    code,
                    status: "Command Failed".to_string(),
                    body: serde_json::json!({ "message": message }),
                    message,
                }
            }
            Exec::InvalidSignal { signal } => {
                Self::InvalidArgument(format!("invalid signal: {signal}"))
            }
            Exec::Io(e) => Self::Io(e),
            other => Self::Executor(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
