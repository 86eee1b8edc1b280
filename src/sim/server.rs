//! Simulator TCP Server
//!
//! Accepts sessions and hands each one to its own connection thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{Connection, UnitBank};
use crate::error::Result;

/// How often the accept loop checks for shutdown
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// TCP front end of the simulated controller
pub struct SimServer {
    listener: TcpListener,
    bank: Arc<UnitBank>,
    prompt: String,
    shutdown: Arc<AtomicBool>,
}

impl SimServer {
    /// Bind the listener; `127.0.0.1:0` picks a free port
    pub fn bind(addr: &str, bank: Arc<UnitBank>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            bank,
            prompt: ">".to_string(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Use a different shell prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn bank(&self) -> Arc<UnitBank> {
        Arc::clone(&self.bank)
    }

    /// Accept sessions until shutdown (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Simulated controller listening on {}", self.local_addr()?);

        let mut sessions: Vec<JoinHandle<()>> = Vec::new();
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    let mut connection = match Connection::new(
                        stream,
                        Arc::clone(&self.bank),
                        &self.prompt,
                        Arc::clone(&self.shutdown),
                    ) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!("Cannot set up session for {}: {}", peer, e);
                            continue;
                        }
                    };

                    sessions.push(thread::spawn(move || {
                        if let Err(e) = connection.handle() {
                            tracing::warn!("Session {} ended with error: {}", connection.peer_addr(), e);
                        }
                    }));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => return Err(e.into()),
            }

            sessions.retain(|s| !s.is_finished());
        }

        for session in sessions {
            let _ = session.join();
        }
        tracing::info!("Simulated controller stopped");
        Ok(())
    }

    /// Run in a background thread
    pub fn spawn(self) -> Result<SimHandle> {
        let addr = self.local_addr()?;
        let bank = self.bank();
        let shutdown = Arc::clone(&self.shutdown);

        let join = thread::Builder::new()
            .name("coolmaster-sim".to_string())
            .spawn(move || {
                if let Err(e) = self.run() {
                    tracing::error!("Simulator error: {}", e);
                }
            })?;

        Ok(SimHandle {
            addr,
            bank,
            shutdown,
            join: Some(join),
        })
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Running background simulator; stops when dropped
pub struct SimHandle {
    addr: SocketAddr,
    bank: Arc<UnitBank>,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SimHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bank(&self) -> &UnitBank {
        &self.bank
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
