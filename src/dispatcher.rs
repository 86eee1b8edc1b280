//! Serial Dispatcher
//!
//! Funnels commands from any number of callers through the single controller
//! session.
//!
//! ## Ordering
//! The controller has no request ids, so responses are matched to commands
//! purely by order. One worker thread owns the transport and handles the
//! queue strictly FIFO with exactly one command in flight:
//!
//! ```text
//!  caller A ──┐
//!  caller B ──┼──► [ channel (FIFO) ] ──► worker ──► transport
//!  caller C ──┘                             │
//!       ▲                                   │
//!       └──────── one-shot reply ◄──────────┘
//! ```
//!
//! ## Failure Policy
//! - Write/read errors and timeouts fail the command in flight and leave the
//!   session Failed. The stream may still carry the late response, so it is
//!   never reused: the next command opens a fresh session first.
//! - A failed connect fails the command that triggered it and every command
//!   queued at that moment. The worker then waits for new work; the next
//!   command retries the connect.
//! - Shutdown lets commands queued before it run, then fails the rest with
//!   [`AcError::Stopped`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{AcError, Result};
use crate::transport::{ConnectionState, TcpTransport, Transport};

// =============================================================================
// Queue Types
// =============================================================================

/// A command waiting in, or owned by, the dispatcher
pub struct PendingCommand {
    /// Issue order, starting at 1
    seq: u64,

    /// Exact line written to the controller
    wire: String,

    /// One-shot sink for the result
    reply: Sender<Result<String>>,

    enqueued_at: Instant,
}

impl PendingCommand {
    /// Deliver the result; consumes the command so it resolves exactly once
    fn resolve(self, result: Result<String>, shared: &Shared) {
        match &result {
            Ok(_) => shared.counters.completed.fetch_add(1, Ordering::Relaxed),
            Err(_) => shared.counters.failed.fetch_add(1, Ordering::Relaxed),
        };

        if self.reply.send(result).is_err() {
            shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("caller abandoned command #{} {:?}", self.seq, self.wire.trim_end());
        }
    }
}

enum Request {
    Command(PendingCommand),
    Shutdown,
}

/// Handle to one queued command's result
///
/// Dropping a ticket does not retract the command; its response is still
/// read off the wire and discarded.
pub struct Ticket {
    seq: u64,
    wire: String,
    rx: Receiver<Result<String>>,
}

impl Ticket {
    /// Issue order of the command
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The command line this ticket is waiting on
    pub fn wire(&self) -> &str {
        &self.wire
    }

    /// Block until the dispatcher resolves the command
    pub fn wait(self) -> Result<String> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(AcError::Stopped),
        }
    }

    /// Block for at most `timeout`, giving up interest afterwards
    ///
    /// Giving up is reported as [`AcError::WaitTimeout`]; a controller that
    /// did not answer in time is [`AcError::Timeout`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<String> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(AcError::WaitTimeout(timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(AcError::Stopped),
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    sent: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct Shared {
    counters: Counters,
    next_seq: AtomicU64,
    /// Last connection state observed by the worker
    state: RwLock<ConnectionState>,
}

/// Point-in-time dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub enqueued: u64,
    pub sent: u64,
    pub completed: u64,
    pub failed: u64,
    /// Results nobody was waiting for any more
    pub abandoned: u64,
    pub in_flight: usize,
    /// Highest in-flight count ever observed
    pub peak_in_flight: usize,
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable entry point to the queue
#[derive(Clone)]
pub struct DispatchHandle {
    tx: Sender<Request>,
    shared: Arc<Shared>,
}

impl DispatchHandle {
    /// Append a command to the tail of the queue
    ///
    /// `wire` is sent verbatim, so it must carry its line terminator. If the
    /// dispatcher has stopped, the ticket resolves to `Stopped`.
    pub fn enqueue(&self, wire: impl Into<String>) -> Ticket {
        let wire = wire.into();
        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (reply, rx) = channel::bounded(1);

        let pending = PendingCommand {
            seq,
            wire: wire.clone(),
            reply,
            enqueued_at: Instant::now(),
        };

        if self.tx.send(Request::Command(pending)).is_ok() {
            self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("queued command #{} {:?}", seq, wire.trim_end());
        } else {
            tracing::debug!("dispatcher stopped, dropping {:?}", wire.trim_end());
        }

        Ticket { seq, wire, rx }
    }

    /// Enqueue and wait for the response
    pub fn execute(&self, wire: impl Into<String>) -> Result<String> {
        self.enqueue(wire).wait()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.shared.counters;
        DispatchStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            sent: c.sent.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            abandoned: c.abandoned.load(Ordering::Relaxed),
            in_flight: c.in_flight.load(Ordering::SeqCst),
            peak_in_flight: c.peak_in_flight.load(Ordering::SeqCst),
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Owner of the worker thread
///
/// Dropping the dispatcher shuts it down and joins the worker.
pub struct Dispatcher {
    handle: DispatchHandle,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start a worker that owns `transport`
    ///
    /// The transport is connected lazily by the first command.
    pub fn start<T>(transport: T, command_timeout: Duration) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let (tx, rx) = channel::unbounded();
        let shared = Arc::new(Shared {
            counters: Counters::default(),
            next_seq: AtomicU64::new(0),
            state: RwLock::new(transport.state()),
        });

        let mut worker = Worker {
            transport,
            rx,
            shared: Arc::clone(&shared),
            command_timeout,
        };

        let join = thread::Builder::new()
            .name("coolmaster-dispatch".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            handle: DispatchHandle { tx, shared },
            worker: Some(join),
        })
    }

    /// Start a dispatcher over a TCP session to the configured controller
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::start(TcpTransport::new(config), config.command_timeout())
    }

    /// A cloneable handle for callers
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    pub fn enqueue(&self, wire: impl Into<String>) -> Ticket {
        self.handle.enqueue(wire)
    }

    pub fn execute(&self, wire: impl Into<String>) -> Result<String> {
        self.handle.execute(wire)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.handle.connection_state()
    }

    pub fn stats(&self) -> DispatchStats {
        self.handle.stats()
    }

    /// Stop after the commands already queued, and join the worker
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.tx.send(Request::Shutdown);
            if worker.join().is_err() {
                tracing::error!("dispatch worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker<T: Transport> {
    transport: T,
    rx: Receiver<Request>,
    shared: Arc<Shared>,
    command_timeout: Duration,
}

impl<T: Transport> Worker<T> {
    fn run(&mut self) {
        tracing::debug!("dispatch worker started");

        // Blocks until work arrives; no polling while idle.
        while let Ok(request) = self.rx.recv() {
            let keep_running = match request {
                Request::Command(pending) => self.dispatch(pending),
                Request::Shutdown => false,
            };
            if !keep_running {
                break;
            }
        }

        let mut dropped = 0;
        while let Ok(request) = self.rx.try_recv() {
            if let Request::Command(pending) = request {
                pending.resolve(Err(AcError::Stopped), &self.shared);
                dropped += 1;
            }
        }

        self.transport.disconnect();
        self.publish_state();
        tracing::debug!("dispatch worker stopped, {} queued commands failed", dropped);
    }

    /// Run one command; returns false when a shutdown was seen while draining
    fn dispatch(&mut self, pending: PendingCommand) -> bool {
        if self.transport.state() != ConnectionState::Ready {
            if let Err(e) = self.transport.connect() {
                self.publish_state();
                tracing::warn!("cannot reach controller: {}", e);
                pending.resolve(Err(e.clone()), &self.shared);
                return self.fail_queued(&e);
            }
            self.publish_state();
        }

        let counters = &self.shared.counters;
        let in_flight = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        counters.sent.fetch_add(1, Ordering::Relaxed);

        let queued_for = pending.enqueued_at.elapsed();
        let result = self
            .transport
            .send_line(&pending.wire)
            .and_then(|_| self.transport.read_response(self.command_timeout));

        counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &result {
            Ok(response) => tracing::debug!(
                "command #{} {:?}, result {:?} (queued {:?})",
                pending.seq,
                pending.wire.trim_end(),
                response,
                queued_for
            ),
            Err(e) => {
                tracing::warn!("command #{} {:?} failed: {}", pending.seq, pending.wire.trim_end(), e);
                if e.breaks_session() && self.transport.state() == ConnectionState::Ready {
                    self.transport.disconnect();
                }
            }
        }

        self.publish_state();
        pending.resolve(result, &self.shared);
        true
    }

    /// Fail everything queued right now with `err`
    fn fail_queued(&mut self, err: &AcError) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(Request::Command(pending)) => pending.resolve(Err(err.clone()), &self.shared),
                Ok(Request::Shutdown) => return false,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn publish_state(&self) {
        let state = self.transport.state();
        let mut current = self.shared.state.write();
        if *current != state {
            tracing::debug!("connection {} -> {}", *current, state);
            *current = state;
        }
    }
}
