//! In-memory transport
//!
//! Answers each command line through a responder closure, with no sockets.
//! Used for unit tests and benchmarks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ConnectionState, Transport};
use crate::error::{AcError, Result};

/// What the responder does with one command line
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Respond with these lines followed by the prompt
    Lines(String),
    /// Never answer; the read times out
    Silent,
    /// Drop the session; the read fails
    Hangup,
}

type Responder = Box<dyn FnMut(&str) -> Reply + Send>;

/// Scripted transport
pub struct MemoryTransport {
    responder: Responder,

    /// Lines waiting to be read, prompt included
    pending: VecDeque<String>,

    /// Set when the last command got `Reply::Silent` or `Reply::Hangup`
    stalled: Option<Reply>,

    /// Every line passed to `send_line`, terminator stripped
    sent: Arc<Mutex<Vec<String>>>,

    /// Number of successful connects
    connects: Arc<Mutex<usize>>,

    /// Remaining connect attempts that fail
    connect_failures: usize,

    /// Delay applied to every read
    latency: Duration,

    state: ConnectionState,
}

impl MemoryTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Reply + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            pending: VecDeque::new(),
            stalled: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(Mutex::new(0)),
            connect_failures: 0,
            latency: Duration::ZERO,
            state: ConnectionState::Disconnected,
        }
    }

    /// Transport whose responder echoes every command back as its response
    pub fn echo() -> Self {
        Self::new(|line| Reply::Lines(line.to_string()))
    }

    /// Fail the next `count` connect attempts
    pub fn with_connect_failures(mut self, count: usize) -> Self {
        self.connect_failures = count;
        self
    }

    /// Sleep this long before every read
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shared log of sent lines
    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }

    /// Shared count of successful connects
    pub fn connect_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.connects)
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<()> {
        self.pending.clear();
        self.stalled = None;
        self.state = ConnectionState::Connecting;

        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            self.state = ConnectionState::Failed;
            return Err(AcError::Connect("controller unreachable".to_string()));
        }

        *self.connects.lock() += 1;
        self.state = ConnectionState::Ready;
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(AcError::NotConnected);
        }

        let line = line.trim_end();
        self.sent.lock().push(line.to_string());

        match (self.responder)(line) {
            Reply::Lines(text) => {
                let prompt = self.prompt().to_string();
                self.pending.extend(text.lines().map(|l| l.to_string()));
                self.pending.push_back(prompt);
                self.stalled = None;
            }
            stalled => self.stalled = Some(stalled),
        }
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String> {
        if self.state != ConnectionState::Ready {
            return Err(AcError::NotConnected);
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency.min(timeout));
        }

        if let Some(line) = self.pending.pop_front() {
            return Ok(line);
        }

        match self.stalled {
            Some(Reply::Hangup) => {
                self.state = ConnectionState::Failed;
                Err(AcError::Read("connection closed by controller".to_string()))
            }
            _ => {
                thread::sleep(timeout);
                self.state = ConnectionState::Failed;
                Err(AcError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    fn disconnect(&mut self) {
        self.pending.clear();
        self.stalled = None;
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}
