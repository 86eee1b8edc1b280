//! Error types for coolmaster
//!
//! Provides a unified error type for all operations.
//!
//! Errors are `Clone` because a single connect failure is delivered to every
//! caller that was queued behind it.

use thiserror::Error;

/// Result type alias using AcError
pub type Result<T> = std::result::Result<T, AcError>;

/// Unified error type for controller operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcError {
    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Timed out after {0} ms waiting for controller")]
    Timeout(u64),

    #[error("Not connected")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Controller rejected command: {0}")]
    Rejected(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Dispatcher Errors
    // -------------------------------------------------------------------------
    #[error("Dispatcher stopped")]
    Stopped,

    /// The caller stopped waiting; the command itself may still run
    #[error("Gave up waiting for result after {0} ms")]
    WaitTimeout(u64),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Other I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error ({kind:?}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl From<std::io::Error> for AcError {
    fn from(err: std::io::Error) -> Self {
        AcError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl AcError {
    /// Whether the error means the session can no longer be trusted
    ///
    /// After one of these the wire stream may hold a late or partial response,
    /// so the transport must be dropped before the next command is sent.
    pub fn breaks_session(&self) -> bool {
        matches!(
            self,
            AcError::Write(_)
                | AcError::Read(_)
                | AcError::Timeout(_)
                | AcError::NotConnected
                | AcError::Io { .. }
        )
    }
}
