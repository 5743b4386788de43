//! Client events and actions.

use std::time::Duration;

use chalkline_core::{error::TransportError, session::StateChange};
use chalkline_proto::{ClientCommand, NotificationId, RoomId, ServerEvent};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Relaying transport outcomes (opened, failed, lost) and inbound events
/// - Driving time forward via ticks and reporting elapsed retry timers
/// - Forwarding application intents (join, typing, notification mutations)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual clock) environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Application wants to establish the connection.
    Connect,

    /// Application wants a deterministic teardown.
    ///
    /// Membership intent and subscriptions survive for the next connect;
    /// pending timers become inert.
    Disconnect,

    /// The dial handshake completed.
    Opened,

    /// A dial attempt failed before the handshake completed.
    DialFailed {
        /// What went wrong.
        error: TransportError,
    },

    /// The server rejected the bearer credential.
    AuthRejected,

    /// An established connection dropped unexpectedly.
    ConnectionLost {
        /// Driver diagnostic.
        reason: String,
    },

    /// A scheduled retry delay elapsed.
    RetryElapsed,

    /// Event received from the server.
    EventReceived(ServerEvent),

    /// Time tick for timeout processing.
    ///
    /// The caller should send ticks periodically so the client can expire
    /// remote typing entries, emit stop-typing signals, and drop stale
    /// low-priority notifications.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Application entered a room-scoped view.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },

    /// Application left a room-scoped view.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Local keystroke in a room's composer.
    LocalTyping {
        /// Room the user is typing in.
        room_id: RoomId,
    },

    /// Mark one notification as read.
    MarkRead {
        /// Notification to mark.
        id: NotificationId,
    },

    /// Mark every notification as read.
    MarkAllRead,

    /// Delete one notification.
    DeleteNotification {
        /// Notification to delete.
        id: NotificationId,
    },

    /// Delete every notification.
    ClearNotifications,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the transport, attaching the bearer credential.
    ///
    /// The driver reports the outcome as [`ClientEvent::Opened`],
    /// [`ClientEvent::DialFailed`], or [`ClientEvent::AuthRejected`].
    Dial {
        /// Zero-based attempt number (0 is the initial dial).
        attempt: u32,
    },

    /// Send a control command to the server.
    Send(ClientCommand),

    /// Sleep `delay`, then feed back [`ClientEvent::RetryElapsed`].
    ///
    /// A disconnect makes the pending timer inert; the driver should also
    /// cancel it so nothing fires after teardown.
    ScheduleRetry {
        /// Jittered delay before the next dial.
        delay: Duration,
        /// Attempt number the retry will carry.
        attempt: u32,
    },

    /// Connection lifecycle transition.
    ///
    /// Also dispatched to bus subscribers under
    /// [`chalkline_proto::EventKind::ConnectionStateChanged`].
    StateChanged(StateChange),

    /// The unread notification count changed.
    NotificationsChanged {
        /// Current unread count, for badge rendering.
        unread: usize,
    },
}
