//! Error types for command execution

use std::time::Duration;
use thiserror::Error;

/// Unified error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// The program is missing or cannot be executed
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The program that could not be started
        command: String,
    },

    /// The process did not exit before its deadline and was killed
    #[error("command {command:?} timed out after {timeout:?}")]
    TimedOut {
        /// The full command line that was attempted
        command: Vec<String>,
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// The process exited with a non-zero code
    #[error("command {command:?} exited with code {code}: {stderr}")]
    ExitFailure {
        /// The full command line
        command: Vec<String>,
        /// Exit code, or the negated signal number for signal deaths
        code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// Failed to send signal to process
    #[error("failed to send signal {signal}: {reason}")]
    SignalFailed {
        /// The signal number that failed to send
        signal: i32,
        /// The reason for the signal failure
        reason: String,
    },

    /// A signal name or number that does not map to a known signal
    #[error("invalid signal: {signal}")]
    InvalidSignal {
        /// The rejected input
        signal: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Nix error (Unix signal handling)
    #[error(transparent)]
    Nix(#[from] nix::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Create a signal failed error
    pub fn signal_failed(signal: i32, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            signal,
            reason: reason.into(),
        }
    }

    /// Classify an error returned by `spawn`.
    ///
    /// A missing or non-executable program becomes [`Error::CommandNotFound`];
    /// anything else is a generic spawn failure.
    pub fn from_spawn(program: impl Into<String>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::CommandNotFound {
                    command: program.into(),
                }
            }
            _ => Self::spawn_failed(format!("{}: {}", program.into(), err)),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_program_is_command_not_found() {
        let err = Error::from_spawn("pebble", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::CommandNotFound { ref command } if command == "pebble"));
    }

    #[test]
    fn test_unexecutable_program_is_command_not_found() {
        let err = Error::from_spawn("pebble", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::CommandNotFound { .. }));
    }

    #[test]
    fn test_other_spawn_errors_keep_reason() {
        let err = Error::from_spawn("pebble", io::Error::other("boom"));
        match err {
            Error::SpawnFailed { reason } => assert!(reason.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
