//! TCP transport
//!
//! Telnet-style session to the controller's command shell.
//!
//! ## Handshake
//! 1. TCP connect (bounded by the connect timeout), Nagle disabled
//! 2. Discard the greeting until the line has been quiet for `settle`
//! 3. Send an empty line to make the shell print its prompt
//! 4. Wait for that prompt, refusing any telnet options on the way
//!
//! Steps 2-4 share one deadline: a peer that never goes quiet or never
//! prompts fails the connect instead of holding the session open.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::BytesMut;

use super::{ConnectionState, TelnetFilter, Transport};
use crate::config::Config;
use crate::error::{AcError, Result};

/// Bytes read from the socket per call
const READ_CHUNK: usize = 1500;

/// Receive buffer is reset past this size to bound memory on a runaway peer
const MAX_BUFFER: usize = 64 * 1024;

/// TCP session to one controller
pub struct TcpTransport {
    /// `host:port`, also used for logging
    addr: String,

    connect_timeout: Duration,

    settle: Duration,

    prompt: String,

    stream: Option<TcpStream>,

    /// Filtered bytes not yet split into lines
    buffer: BytesMut,

    telnet: TelnetFilter,

    /// Last command written, for dropping its echo
    last_sent: Option<String>,

    state: ConnectionState,
}

impl TcpTransport {
    /// Create an unconnected transport for the configured endpoint
    pub fn new(config: &Config) -> Self {
        Self {
            addr: config.addr(),
            connect_timeout: config.connect_timeout(),
            settle: config.settle(),
            prompt: config.prompt.clone(),
            stream: None,
            buffer: BytesMut::with_capacity(READ_CHUNK * 2),
            telnet: TelnetFilter::new(),
            last_sent: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn open_stream(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| AcError::Connect(format!("cannot resolve {}: {}", self.addr, e)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(AcError::Connect(match last_err {
            Some(e) => format!("cannot connect to {}: {}", self.addr, e),
            None => format!("no addresses for {}", self.addr),
        }))
    }

    fn handshake(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.connect_timeout;

        // Greeting and any prompt printed on accept
        self.drain_until_quiet(deadline)?;
        self.buffer.clear();

        self.write_raw(b"\r\n")
            .map_err(|e| AcError::Connect(format!("handshake write failed: {}", e)))?;

        // The buffer was empty before the write, so this prompt answers our line.
        loop {
            if self.buffer_holds_prompt() {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AcError::Connect(format!(
                    "no prompt from {} within {} ms",
                    self.addr,
                    self.connect_timeout.as_millis()
                )));
            }
            self.fill(remaining)
                .map_err(|e| AcError::Connect(format!("handshake read failed: {}", e)))?;
        }

        self.buffer.clear();
        Ok(())
    }

    /// Discard output until the line has been quiet for `settle`
    ///
    /// Fails with `Connect` if the peer is still talking at `deadline`.
    fn drain_until_quiet(&mut self, deadline: Instant) -> Result<()> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AcError::Connect(format!(
                    "output from {} did not settle within {} ms",
                    self.addr,
                    self.connect_timeout.as_millis()
                )));
            }

            let wait = self.settle.min(remaining);
            let got_data = self
                .fill(wait)
                .map_err(|e| AcError::Connect(format!("handshake drain failed: {}", e)))?;

            if got_data {
                self.buffer.clear();
            } else if wait == self.settle {
                return Ok(());
            }
        }
    }

    fn buffer_holds_prompt(&self) -> bool {
        String::from_utf8_lossy(&self.buffer)
            .trim_end()
            .ends_with(self.prompt.as_str())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "not connected"))?;
        stream.write_all(bytes)?;
        stream.flush()
    }

    /// Read one chunk into the buffer
    ///
    /// Returns `Ok(false)` when nothing arrived within `wait`.
    fn fill(&mut self, wait: Duration) -> Result<bool> {
        let stream = self.stream.as_mut().ok_or(AcError::NotConnected)?;
        stream.set_read_timeout(Some(wait.max(Duration::from_millis(1))))?;

        let mut chunk = [0u8; READ_CHUNK];
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                return Err(AcError::Read(format!("{} closed the connection", self.addr)));
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Ok(false);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(true),
            Err(e) => return Err(AcError::Read(e.to_string())),
        };

        if self.buffer.len() + n > MAX_BUFFER {
            tracing::warn!("receive buffer overflow from {}, resetting", self.addr);
            self.buffer.clear();
        }

        let mut replies = Vec::new();
        self.telnet.feed(&chunk[..n], &mut self.buffer, &mut replies);
        if !replies.is_empty() {
            self.write_raw(&replies)
                .map_err(|e| AcError::Write(e.to_string()))?;
        }

        Ok(true)
    }

    /// Split one complete line off the buffer
    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r')?;
        let line = self.buffer.split_to(end);

        let skip = self
            .buffer
            .iter()
            .take_while(|&&b| b == b'\r' || b == b'\n')
            .count();
        let _ = self.buffer.split_to(skip);

        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Drop a prompt glued to the front of a line (`>query ...`, `>1`)
    fn strip_prompt(&self, line: String) -> String {
        match line.strip_prefix(self.prompt.as_str()) {
            Some(rest) if !rest.trim().is_empty() => rest.trim_start().to_string(),
            _ => line,
        }
    }

    fn fail(&mut self, err: AcError) -> AcError {
        tracing::debug!("session to {} failed: {}", self.addr, err);
        self.stream = None;
        self.state = ConnectionState::Failed;
        err
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        self.disconnect();
        self.state = ConnectionState::Connecting;
        tracing::info!("Connecting to controller at {}", self.addr);

        let stream = match self.open_stream() {
            Ok(s) => s,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = stream.set_nodelay(true) {
            return Err(self.fail(AcError::Connect(e.to_string())));
        }
        self.stream = Some(stream);

        if let Err(e) = self.handshake() {
            return Err(self.fail(e));
        }

        self.state = ConnectionState::Ready;
        tracing::info!("Controller session to {} ready", self.addr);
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(AcError::NotConnected);
        }

        // Anything still buffered belongs to an earlier exchange.
        self.buffer.clear();

        tracing::trace!("-> {}: {:?}", self.addr, line);
        if let Err(e) = self.write_raw(line.as_bytes()) {
            return Err(self.fail(AcError::Write(e.to_string())));
        }
        self.last_sent = Some(line.trim().to_string());
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String> {
        if self.state != ConnectionState::Ready {
            return Err(AcError::NotConnected);
        }

        let deadline = Instant::now() + timeout;
        loop {
            while let Some(line) = self.take_line() {
                let line = self.strip_prompt(line);
                if self.last_sent.as_deref() == Some(line.as_str()) {
                    self.last_sent = None;
                    continue;
                }
                tracing::trace!("<- {}: {:?}", self.addr, line);
                return Ok(line);
            }

            if String::from_utf8_lossy(&self.buffer).trim() == self.prompt {
                self.buffer.clear();
                return Ok(self.prompt.clone());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.fail(AcError::Timeout(timeout.as_millis() as u64)));
            }
            match self.fill(remaining) {
                Ok(_) => {}
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            tracing::debug!("Disconnected from {}", self.addr);
        }
        self.buffer.clear();
        self.telnet.reset();
        self.last_sent = None;
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }
}
