//! Typing indicator scenarios: debounce cadence, quiet-period stop, and
//! TTL self-healing for remote indicators.

use std::time::Duration;

use chalkline_client::ClientEvent;
use chalkline_harness::ClientHarness;
use chalkline_proto::{ClientCommand, ServerEvent, UserId, UserTyping};

fn typing_signal(room: &str, user: &str, typing: bool) -> ClientEvent {
    ClientEvent::EventReceived(ServerEvent::UserTyping(UserTyping {
        doubt_id: room.into(),
        user_id: user.into(),
        user_name: user.to_uppercase(),
        typing,
    }))
}

#[test]
fn keystroke_burst_is_debounced_to_one_signal_per_interval() {
    let mut harness = ClientHarness::new();
    harness.open();
    harness.take_sent();

    // Twenty keystrokes over 950ms: a single typing-start on the wire.
    for _ in 0..20 {
        harness.dispatch(ClientEvent::LocalTyping { room_id: "doubt-1".into() }).unwrap();
        harness.env.advance(Duration::from_millis(47));
    }

    let typing_sends = harness
        .take_sent()
        .into_iter()
        .filter(|c| matches!(c, ClientCommand::DoubtTyping { typing: true, .. }))
        .count();
    assert_eq!(typing_sends, 1);
}

#[test]
fn quiet_period_emits_single_stop_signal() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(ClientEvent::LocalTyping { room_id: "doubt-1".into() }).unwrap();
    harness.take_sent();

    harness.advance_and_tick(Duration::from_millis(1100));
    assert_eq!(harness.take_sent(), vec![ClientCommand::DoubtTyping {
        doubt_id: "doubt-1".into(),
        typing: false
    }]);

    // Nothing further once stopped.
    harness.advance_and_tick(Duration::from_secs(1));
    assert!(harness.take_sent().is_empty());
}

#[test]
fn remote_typist_expires_without_any_stop_signal() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(typing_signal("doubt-1", "u-1", true)).unwrap();
    assert_eq!(harness.client.typists(&"doubt-1".into()), vec![UserId::from("u-1")]);

    // The stop signal is dropped on the wire; TTL heals the indicator.
    harness.env.advance(Duration::from_millis(3100));
    assert!(harness.client.typists(&"doubt-1".into()).is_empty());
}

#[test]
fn refreshed_typist_stays_active_past_one_ttl() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(typing_signal("doubt-1", "u-1", true)).unwrap();
    harness.env.advance(Duration::from_secs(2));
    harness.dispatch(typing_signal("doubt-1", "u-1", true)).unwrap();
    harness.env.advance(Duration::from_secs(2));

    assert_eq!(harness.client.typists(&"doubt-1".into()), vec![UserId::from("u-1")]);
}

#[test]
fn explicit_stop_clears_immediately() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(typing_signal("doubt-1", "u-1", true)).unwrap();
    harness.dispatch(typing_signal("doubt-1", "u-1", false)).unwrap();

    assert!(harness.client.typists(&"doubt-1".into()).is_empty());
}

#[test]
fn typists_are_tracked_per_room() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(typing_signal("doubt-1", "u-1", true)).unwrap();
    harness.dispatch(typing_signal("doubt-2", "u-2", true)).unwrap();

    assert_eq!(harness.client.typists(&"doubt-1".into()), vec![UserId::from("u-1")]);
    assert_eq!(harness.client.typists(&"doubt-2".into()), vec![UserId::from("u-2")]);
}

#[test]
fn disconnect_suppresses_pending_stop_signal() {
    let mut harness = ClientHarness::new();
    harness.open();

    harness.dispatch(ClientEvent::LocalTyping { room_id: "doubt-1".into() }).unwrap();
    harness.take_sent();

    harness.dispatch(ClientEvent::Disconnect).unwrap();
    harness.advance_and_tick(Duration::from_secs(2));

    assert!(harness.take_sent().is_empty());
}
