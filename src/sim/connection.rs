//! Connection Handler
//!
//! Serves one client session of the simulated command shell.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::UnitBank;
use crate::error::Result;

/// How often a blocked read wakes up to check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    bank: Arc<UnitBank>,

    prompt: String,

    shutdown: Arc<AtomicBool>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        bank: Arc<UnitBank>,
        prompt: &str,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(POLL_INTERVAL))?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            bank,
            prompt: prompt.to_string(),
            shutdown,
            peer_addr,
        })
    }

    /// Serve the session until the client leaves or the server stops
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Session opened from {}", self.peer_addr);
        self.write_prompt()?;

        let mut line = String::new();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::debug!("Closing session {} on shutdown", self.peer_addr);
                return Ok(());
            }

            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(_) => {}
                Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    // Partial input stays in `line` until the newline arrives.
                    continue;
                }
                Err(ref e)
                    if e.kind() == ErrorKind::ConnectionReset
                        || e.kind() == ErrorKind::ConnectionAborted =>
                {
                    tracing::debug!("Connection reset by client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            }

            let command = line.trim().to_string();
            line.clear();
            tracing::trace!("Received from {}: {:?}", self.peer_addr, command);

            if command.is_empty() {
                self.write_prompt()?;
                continue;
            }

            match self.bank.respond(&command) {
                Some(response) => {
                    let mut out = response.replace('\n', "\r\n");
                    out.push_str("\r\n");
                    if let Err(e) = self.send(&out).and_then(|_| self.write_prompt()) {
                        return self.closed_or(e);
                    }
                }
                None => tracing::debug!("Not answering {:?} from {}", command, self.peer_addr),
            }
        }
    }

    fn write_prompt(&mut self) -> Result<()> {
        let prompt = self.prompt.clone();
        self.send(&prompt)
    }

    fn send(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Treat a client that left mid-write as a normal close
    fn closed_or(&self, e: crate::error::AcError) -> Result<()> {
        if let crate::error::AcError::Io { kind, .. } = &e {
            match kind {
                ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                _ => {}
            }
        }
        tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
        Err(e)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
