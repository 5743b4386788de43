//! Reconnection scenarios: backoff, membership replay, exhaustion, and
//! credential rejection.

use std::time::Duration;

use chalkline_client::{
    ClientConfig, ClientEvent, CloseCause, ConnectionState,
};
use chalkline_core::backoff::BackoffConfig;
use chalkline_harness::ClientHarness;
use chalkline_proto::ClientCommand;

fn harness_with_max_attempts(max_attempts: u32) -> ClientHarness {
    ClientHarness::with_config(ClientConfig {
        backoff: BackoffConfig {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(5),
            max_attempts,
        },
        ..ClientConfig::default()
    })
}

#[test]
fn join_drop_reconnect_sends_join_exactly_once() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(ClientEvent::JoinRoom { room_id: "doubt-42".into() }).unwrap();
    assert_eq!(harness.join_count("doubt-42"), 1);
    harness.take_sent();

    harness.drop_connection();
    harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    harness.dispatch(ClientEvent::Opened).unwrap();

    // Exactly one join post-reconnect: not zero, not two.
    assert_eq!(harness.join_count("doubt-42"), 1);
}

#[test]
fn three_failures_then_success_opens_once_and_replays_once() {
    let mut harness = harness_with_max_attempts(3);
    harness.dispatch(ClientEvent::JoinRoom { room_id: "doubt-7".into() }).unwrap();
    harness.dispatch(ClientEvent::Connect).unwrap();

    // Three consecutive transport failures.
    for _ in 0..3 {
        harness.drop_connection();
        harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    }
    assert_eq!(harness.client.connection_state(), ConnectionState::Degraded);

    // Fourth dial succeeds.
    harness.dispatch(ClientEvent::Opened).unwrap();

    let opens = harness
        .transitions
        .iter()
        .filter(|c| c.current == ConnectionState::Open)
        .count();
    assert_eq!(opens, 1);
    assert_eq!(harness.join_count("doubt-7"), 1);
}

#[test]
fn backoff_delays_grow_until_capped() {
    let mut harness = harness_with_max_attempts(10);
    harness.open();

    let mut previous = Duration::ZERO;
    for _ in 0..6 {
        harness.drop_connection();
        let (delay, _) = *harness.retries.last().unwrap();
        // Equal jitter keeps every delay within [raw/2, raw]; raw doubles
        // below the cap, so the sequence never shrinks.
        assert!(delay <= Duration::from_secs(5));
        assert!(delay >= previous);
        previous = delay;
        harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    }
}

#[test]
fn exhaustion_surfaces_once_and_requires_explicit_reconnect() {
    let mut harness = harness_with_max_attempts(2);
    harness.open();

    harness.drop_connection();
    harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    harness.drop_connection();
    harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    harness.drop_connection();

    assert_eq!(harness.client.connection_state(), ConnectionState::Closed);
    let exhausted: Vec<_> = harness
        .transitions
        .iter()
        .filter(|c| matches!(c.cause, Some(CloseCause::Exhausted { attempts: 2 })))
        .collect();
    assert_eq!(exhausted.len(), 1);

    // Further failure reports are stale and change nothing.
    harness.drop_connection();
    assert_eq!(harness.client.connection_state(), ConnectionState::Closed);

    // An explicit reconnect starts over with a fresh budget.
    harness.dispatch(ClientEvent::Connect).unwrap();
    assert_eq!(harness.client.connection_state(), ConnectionState::Connecting);
    assert_eq!(harness.client.attempt(), 0);
}

#[test]
fn auth_rejection_is_never_retried() {
    let mut harness = ClientHarness::new();
    harness.dispatch(ClientEvent::Connect).unwrap();
    harness.dispatch(ClientEvent::AuthRejected).unwrap();

    assert_eq!(harness.client.connection_state(), ConnectionState::Closed);
    assert!(harness.retries.is_empty());
    assert!(
        harness
            .transitions
            .iter()
            .any(|c| matches!(c.cause, Some(CloseCause::AuthRejected)))
    );
}

#[test]
fn disconnect_makes_pending_retry_inert() {
    let mut harness = ClientHarness::new();
    harness.open();
    harness.drop_connection();
    assert_eq!(harness.retries.len(), 1);

    harness.dispatch(ClientEvent::Disconnect).unwrap();

    // The timer the driver failed to cancel fires late: no dial happens.
    let actions = harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    assert!(actions.is_empty());
    assert_eq!(harness.dials.last(), Some(&0));
}

#[test]
fn leave_while_degraded_is_not_replayed() {
    let mut harness = ClientHarness::new();
    harness.open();
    harness.dispatch(ClientEvent::JoinRoom { room_id: "doubt-1".into() }).unwrap();
    harness.dispatch(ClientEvent::JoinRoom { room_id: "doubt-2".into() }).unwrap();
    harness.take_sent();

    harness.drop_connection();
    harness.dispatch(ClientEvent::LeaveRoom { room_id: "doubt-1".into() }).unwrap();
    harness.dispatch(ClientEvent::RetryElapsed).unwrap();
    harness.dispatch(ClientEvent::Opened).unwrap();

    assert_eq!(harness.take_sent(), vec![ClientCommand::JoinDoubt {
        doubt_id: "doubt-2".into()
    }]);
}
