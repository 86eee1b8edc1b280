//! Dispatcher Tests
//!
//! Ordering, failure isolation and shutdown of the serial command queue.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use coolmaster::transport::{ConnectionState, MemoryTransport, Reply};
use coolmaster::{AcError, Dispatcher};

const TIMEOUT: Duration = Duration::from_millis(100);

fn echo_dispatcher() -> Dispatcher {
    Dispatcher::start(MemoryTransport::echo(), TIMEOUT).unwrap()
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_single_command_round_trip() {
    let dispatcher = echo_dispatcher();
    assert_eq!(dispatcher.execute("query L1.100 o\n").unwrap(), "query L1.100 o");
    assert_eq!(dispatcher.connection_state(), ConnectionState::Ready);
}

#[test]
fn test_tickets_resolve_in_issue_order() {
    let transport = MemoryTransport::echo();
    let log = transport.sent_log();
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    let tickets: Vec<_> = (0..20)
        .map(|i| dispatcher.enqueue(format!("query L1.{} o\n", i)))
        .collect();

    for (i, ticket) in tickets.into_iter().enumerate() {
        assert_eq!(ticket.seq(), i as u64 + 1);
        assert_eq!(ticket.wait().unwrap(), format!("query L1.{} o", i));
    }

    let sent = log.lock();
    let expected: Vec<String> = (0..20).map(|i| format!("query L1.{} o", i)).collect();
    assert_eq!(*sent, expected);
}

#[test]
fn test_concurrent_callers_get_their_own_responses() {
    let transport = MemoryTransport::echo().with_latency(Duration::from_millis(1));
    let dispatcher = Arc::new(Dispatcher::start(transport, TIMEOUT).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let handle = dispatcher.handle();
            thread::spawn(move || {
                for i in 0..10 {
                    let wire = format!("query T{}.{} h\n", t, i);
                    let response = handle.execute(wire.clone()).unwrap();
                    assert_eq!(response, wire.trim_end());
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let stats = dispatcher.stats();
    assert_eq!(stats.enqueued, 80);
    assert_eq!(stats.sent, 80);
    assert_eq!(stats.completed, 80);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.peak_in_flight, 1);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_timeout_fails_only_head_command() {
    let transport = MemoryTransport::new(|line| {
        if line.starts_with("stall") {
            Reply::Silent
        } else {
            Reply::Lines(format!("{}\nOK", line))
        }
    });
    let connects = transport.connect_count();
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    let started = Instant::now();
    let stalled = dispatcher.enqueue("stall L1.100\n");
    let after: Vec<_> = (0..3)
        .map(|i| dispatcher.enqueue(format!("query L1.10{} o\n", i)))
        .collect();

    assert_eq!(stalled.wait(), Err(AcError::Timeout(100)));
    for (i, ticket) in after.into_iter().enumerate() {
        assert_eq!(ticket.wait().unwrap(), format!("query L1.10{} o\nOK", i));
    }

    // One timeout, not one per queued command
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(*connects.lock(), 2);
    assert_eq!(dispatcher.stats().failed, 1);
}

#[test]
fn test_timeout_leaves_session_failed() {
    let dispatcher = Dispatcher::start(MemoryTransport::new(|_| Reply::Silent), TIMEOUT).unwrap();
    assert_eq!(dispatcher.execute("query L1.100 o\n"), Err(AcError::Timeout(100)));
    assert_eq!(dispatcher.connection_state(), ConnectionState::Failed);
}

#[test]
fn test_prompt_only_reply_is_not_a_response() {
    let transport = MemoryTransport::new(|line| {
        if line.starts_with("query") {
            Reply::Lines(String::new())
        } else {
            Reply::Lines("OK".to_string())
        }
    });
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    assert_eq!(dispatcher.execute("query L1.100 o\n"), Err(AcError::Timeout(100)));
    assert_eq!(dispatcher.connection_state(), ConnectionState::Failed);
    assert_eq!(dispatcher.execute("on L1.100\n").unwrap(), "OK");
}

#[test]
fn test_hangup_then_reconnect() {
    let mut calls = 0;
    let transport = MemoryTransport::new(move |line| {
        calls += 1;
        if calls == 1 {
            Reply::Hangup
        } else {
            Reply::Lines(line.to_string())
        }
    });
    let connects = transport.connect_count();
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    assert!(matches!(dispatcher.execute("on L1.100\n"), Err(AcError::Read(_))));
    assert_eq!(dispatcher.execute("off L1.100\n").unwrap(), "off L1.100");
    assert_eq!(*connects.lock(), 2);
    assert_eq!(dispatcher.connection_state(), ConnectionState::Ready);
}

#[test]
fn test_connect_failure_then_recovery() {
    let transport = MemoryTransport::echo().with_connect_failures(1);
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    let first = dispatcher.enqueue("on L1.100\n");
    let second = dispatcher.enqueue("off L1.100\n");

    assert!(matches!(first.wait(), Err(AcError::Connect(_))));
    // Failed with the connect error if it was already queued, otherwise it
    // triggered the retry.
    match second.wait() {
        Ok(response) => assert_eq!(response, "off L1.100"),
        Err(e) => assert!(matches!(e, AcError::Connect(_))),
    }

    assert_eq!(dispatcher.execute("query L1.100 o\n").unwrap(), "query L1.100 o");
    assert_eq!(dispatcher.connection_state(), ConnectionState::Ready);
}

#[test]
fn test_connect_failure_does_not_send() {
    let transport = MemoryTransport::echo().with_connect_failures(1);
    let log = transport.sent_log();
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();

    assert!(dispatcher.execute("on L1.100\n").is_err());
    assert!(log.lock().is_empty());
    assert_eq!(dispatcher.stats().sent, 0);
}

// =============================================================================
// Tickets and Shutdown
// =============================================================================

#[test]
fn test_wait_timeout_gives_up() {
    let transport = MemoryTransport::echo().with_latency(Duration::from_millis(50));
    let dispatcher = Dispatcher::start(transport, Duration::from_secs(1)).unwrap();

    let ticket = dispatcher.enqueue("query L1.100 o\n");
    assert_eq!(ticket.wire(), "query L1.100 o\n");
    assert_eq!(
        ticket.wait_timeout(Duration::from_millis(10)),
        Err(AcError::WaitTimeout(10))
    );
    assert!(!AcError::WaitTimeout(10).breaks_session());

    // The abandoned command still runs before this one
    assert_eq!(dispatcher.execute("query L1.100 h\n").unwrap(), "query L1.100 h");
    assert_eq!(dispatcher.stats().abandoned, 1);
}

#[test]
fn test_shutdown_runs_already_queued_commands() {
    let transport = MemoryTransport::echo().with_latency(Duration::from_millis(2));
    let log = transport.sent_log();
    let dispatcher = Dispatcher::start(transport, TIMEOUT).unwrap();
    let handle = dispatcher.handle();

    let tickets: Vec<_> = (0..5)
        .map(|i| dispatcher.enqueue(format!("on L1.10{}\n", i)))
        .collect();
    dispatcher.shutdown();

    for ticket in tickets {
        assert!(ticket.wait().is_ok());
    }
    assert_eq!(log.lock().len(), 5);

    assert_eq!(handle.execute("on L1.100\n"), Err(AcError::Stopped));
    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn test_drop_stops_worker() {
    let dispatcher = echo_dispatcher();
    let handle = dispatcher.handle();
    drop(dispatcher);

    assert_eq!(handle.execute("on L1.100\n"), Err(AcError::Stopped));
}
