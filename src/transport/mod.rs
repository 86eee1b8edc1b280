//! Transport Module
//!
//! Line-level access to the controller's command shell.
//!
//! ## Implementations
//! - [`TcpTransport`]: telnet-style TCP session to a real controller
//! - [`MemoryTransport`]: scripted in-process responder, no sockets
//!
//! A transport is used by one thread at a time; the dispatcher owns it
//! exclusively.

mod memory;
mod tcp;
mod telnet;

pub use memory::{MemoryTransport, Reply};
pub use tcp::TcpTransport;
pub use telnet::TelnetFilter;

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{AcError, Result};

/// Lifecycle of the controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Blocking line transport to a controller
///
/// Read/write failures and timeouts leave the transport in
/// [`ConnectionState::Failed`]; [`Transport::connect`] starts a fresh session.
pub trait Transport: Send {
    /// Open the session and run the handshake
    fn connect(&mut self) -> Result<()>;

    /// Write one command line (terminator included)
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Read one line, or the bare prompt, waiting at most `timeout`
    fn read_line(&mut self, timeout: Duration) -> Result<String>;

    /// Drop the session
    fn disconnect(&mut self);

    fn state(&self) -> ConnectionState;

    /// Prompt that terminates a response
    fn prompt(&self) -> &str {
        ">"
    }

    /// Read every line up to the prompt within one deadline
    ///
    /// Blank lines are dropped; the prompt itself is not included. A prompt
    /// seen before any line is discarded, so a response is never empty: a
    /// peer that only answers with its prompt runs into the timeout.
    fn read_response(&mut self, timeout: Duration) -> Result<String> {
        let timeout_ms = timeout.as_millis() as u64;
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AcError::Timeout(timeout_ms));
            }

            let line = self.read_line(remaining).map_err(|e| match e {
                AcError::Timeout(_) => AcError::Timeout(timeout_ms),
                other => other,
            })?;

            if line == self.prompt() {
                // Every reply has at least one line, so a prompt before any
                // line was left over from an earlier exchange.
                if lines.is_empty() {
                    tracing::debug!("skipping stale prompt ahead of response");
                    continue;
                }
                break;
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }

        Ok(lines.join("\n"))
    }
}
