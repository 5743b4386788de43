//! Fuzz target for client state machine robustness
//!
//! Applies arbitrary event sequences to a `Client` and checks the
//! invariants that must hold on every path:
//!
//! - `handle` never panics, whatever order transport outcomes arrive in
//! - the unread counter always matches a scan of the store
//! - no outbound command is produced while the connection is down

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use chalkline_client::{Client, ClientAction, ClientConfig, ClientEvent, ConnectionState};
use chalkline_core::env::test_utils::MockEnv;
use chalkline_proto::{NotificationRecord, Priority, ServerEvent, UserTyping};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Opened,
    ConnectionLost,
    AuthRejected,
    RetryElapsed,
    Tick { advance_ms: u16 },
    Join { room: u8 },
    Leave { room: u8 },
    LocalTyping { room: u8 },
    RemoteTyping { room: u8, user: u8, typing: bool },
    Notify { id: u8, low_priority: bool },
    MarkRead { id: u8 },
    MarkAllRead,
    Delete { id: u8 },
    Clear,
}

fn room(index: u8) -> String {
    format!("doubt-{}", index % 8)
}

fn notification(id: u8, low_priority: bool) -> NotificationRecord {
    NotificationRecord {
        id: format!("n-{}", id % 16),
        doubt_id: None,
        kind: "response".to_string(),
        priority: if low_priority { Priority::Low } else { Priority::Normal },
        title: "t".to_string(),
        message: "m".to_string(),
        metadata: None,
        created_at: chrono::DateTime::UNIX_EPOCH,
        action_ref: None,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let env = MockEnv::with_seed(1);
    let mut client = Client::new(env.clone(), ClientConfig::default());
    client.set_credential("fuzz-token");

    for op in ops {
        let event = match op {
            Op::Connect => ClientEvent::Connect,
            Op::Disconnect => ClientEvent::Disconnect,
            Op::Opened => ClientEvent::Opened,
            Op::ConnectionLost => {
                ClientEvent::ConnectionLost { reason: "fuzz".to_string() }
            }
            Op::AuthRejected => ClientEvent::AuthRejected,
            Op::RetryElapsed => ClientEvent::RetryElapsed,
            Op::Tick { advance_ms } => {
                env.advance(std::time::Duration::from_millis(u64::from(advance_ms)));
                let now = {
                    use chalkline_core::env::Environment as _;
                    env.now()
                };
                ClientEvent::Tick { now }
            }
            Op::Join { room: r } => ClientEvent::JoinRoom { room_id: room(r) },
            Op::Leave { room: r } => ClientEvent::LeaveRoom { room_id: room(r) },
            Op::LocalTyping { room: r } => ClientEvent::LocalTyping { room_id: room(r) },
            Op::RemoteTyping { room: r, user, typing } => {
                ClientEvent::EventReceived(ServerEvent::UserTyping(UserTyping {
                    doubt_id: room(r),
                    user_id: format!("u-{}", user % 8),
                    user_name: "fuzz".to_string(),
                    typing,
                }))
            }
            Op::Notify { id, low_priority } => ClientEvent::EventReceived(
                ServerEvent::Notification(notification(id, low_priority)),
            ),
            Op::MarkRead { id } => ClientEvent::MarkRead { id: format!("n-{}", id % 16) },
            Op::MarkAllRead => ClientEvent::MarkAllRead,
            Op::Delete { id } => ClientEvent::DeleteNotification { id: format!("n-{}", id % 16) },
            Op::Clear => ClientEvent::ClearNotifications,
        };

        let open_before = client.connection_state() == ConnectionState::Open;
        let completes_handshake = matches!(&event, ClientEvent::Opened);
        let Ok(actions) = client.handle(event) else {
            continue;
        };

        if !open_before && !completes_handshake {
            assert!(
                !actions.iter().any(|a| matches!(a, ClientAction::Send(_))),
                "command sent while connection was down"
            );
        }

        let scanned = client.notifications().filter(|(_, read)| !read).count();
        assert_eq!(client.unread_count(), scanned);
    }
});
