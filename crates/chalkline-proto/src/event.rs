//! Inbound server events.
//!
//! One enum variant per logical event stream multiplexed over the
//! connection. Most payloads use snake_case keys; `user_typing` keeps the
//! camelCase keys the server has always sent for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotificationId, RoomId, UserId};

/// Events pushed by the server.
///
/// The envelope tag (`"event"`) selects the variant; the payload lives under
/// `"data"`. Per-kind ordering follows transport delivery order; no ordering
/// is defined across kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Status or content change on a doubt thread.
    DoubtUpdate(DoubtUpdate),

    /// A new response was posted to a doubt thread.
    NewResponse(NewResponse),

    /// A remote user started or stopped typing in a room.
    UserTyping(UserTyping),

    /// A notification addressed to this client.
    Notification(NotificationRecord),

    /// A new doubt is available for pickup (mentor-facing).
    NewDoubtAvailable(NewDoubtAvailable),

    /// Aggregate statistics for a doubt changed.
    DoubtStatisticsUpdate(DoubtStatisticsUpdate),
}

impl ServerEvent {
    /// Multiplexer kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DoubtUpdate(_) => EventKind::DoubtUpdate,
            Self::NewResponse(_) => EventKind::NewResponse,
            Self::UserTyping(_) => EventKind::UserTyping,
            Self::Notification(_) => EventKind::Notification,
            Self::NewDoubtAvailable(_) => EventKind::NewDoubtAvailable,
            Self::DoubtStatisticsUpdate(_) => EventKind::DoubtStatisticsUpdate,
        }
    }

    /// Room this event is scoped to. `None` for unscoped streams.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::DoubtUpdate(e) => Some(&e.doubt_id),
            Self::NewResponse(e) => Some(&e.doubt_id),
            Self::UserTyping(e) => Some(&e.doubt_id),
            Self::Notification(e) => e.doubt_id.as_ref(),
            Self::NewDoubtAvailable(e) => Some(&e.doubt_id),
            Self::DoubtStatisticsUpdate(e) => Some(&e.doubt_id),
        }
    }
}

/// Kinds of events flowing through the multiplexer.
///
/// Covers every [`ServerEvent`] stream plus the two client-internal streams
/// (connection state changes and handler failure reports) so UI surfaces
/// subscribe to all of them through one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `doubt_update` stream.
    DoubtUpdate,
    /// `new_response` stream.
    NewResponse,
    /// `user_typing` stream.
    UserTyping,
    /// `notification` stream.
    Notification,
    /// `new_doubt_available` stream.
    NewDoubtAvailable,
    /// `doubt_statistics_update` stream.
    DoubtStatisticsUpdate,
    /// Client-internal: connection lifecycle transitions.
    ConnectionStateChanged,
    /// Client-internal: isolated subscriber failures.
    HandlerError,
}

impl EventKind {
    /// Wire/registry name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoubtUpdate => "doubt_update",
            Self::NewResponse => "new_response",
            Self::UserTyping => "user_typing",
            Self::Notification => "notification",
            Self::NewDoubtAvailable => "new_doubt_available",
            Self::DoubtStatisticsUpdate => "doubt_statistics_update",
            Self::ConnectionStateChanged => "connection_state_changed",
            Self::HandlerError => "handler_error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification priority.
///
/// Ordering matters: the notification store compares priorities against its
/// alert threshold, and only `Low` items are eligible for auto-expiry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational; eligible for auto-expiry.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Shown prominently; forwarded to the host alert sink.
    High,
    /// Requires attention; forwarded to the host alert sink.
    Urgent,
}

/// Status or content change on a doubt thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubtUpdate {
    /// Doubt thread the update belongs to.
    pub doubt_id: RoomId,

    /// Update discriminator (e.g. `"status_change"`, `"edited"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable description of the change.
    pub message: String,

    /// When the change happened, server clock.
    pub timestamp: DateTime<Utc>,
}

/// A response posted to a doubt thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResponse {
    /// Doubt thread the response belongs to.
    pub doubt_id: RoomId,

    /// Unique identifier of the response.
    pub response_id: String,

    /// Display name of the author.
    pub author_name: String,

    /// Author role (e.g. `"student"`, `"mentor"`).
    pub author_type: String,

    /// Response body.
    pub content: String,

    /// Creation time, server clock.
    pub created_at: DateTime<Utc>,
}

/// A remote user started or stopped typing in a room.
///
/// The `typing: false` stop signal is best-effort; consumers must expire
/// entries by TTL rather than rely on it arriving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTyping {
    /// Room the signal is scoped to.
    pub doubt_id: RoomId,

    /// Remote user emitting the signal.
    pub user_id: UserId,

    /// Display name of the remote user.
    pub user_name: String,

    /// `true` on start/refresh, `false` on explicit stop.
    pub typing: bool,
}

/// A notification addressed to this client.
///
/// `id` is the de-duplication key: re-delivery of an id already held by the
/// store updates the stored record in place instead of appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Unique identifier; insertion de-duplicates on it.
    pub id: NotificationId,

    /// Doubt thread the notification refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubt_id: Option<RoomId>,

    /// Category discriminator (e.g. `"response"`, `"rating"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Priority; absent on the wire means [`Priority::Normal`].
    #[serde(default)]
    pub priority: Priority,

    /// Short headline.
    pub title: String,

    /// Body text.
    pub message: String,

    /// Free-form extra payload, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// Creation time, server clock.
    pub created_at: DateTime<Utc>,

    /// Optional navigation target for the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_ref: Option<String>,
}

/// A new doubt is available for pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDoubtAvailable {
    /// Doubt thread that became available.
    pub doubt_id: RoomId,

    /// Doubt title.
    pub title: String,

    /// Subject the doubt belongs to.
    pub subject: String,

    /// Priority assigned by the platform.
    pub priority: Priority,

    /// Display name of the student who asked.
    pub student_name: String,
}

/// Aggregate statistics for a doubt changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubtStatisticsUpdate {
    /// Statistic discriminator (e.g. `"view"`, `"response_count"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Doubt thread the statistic belongs to.
    pub doubt_id: RoomId,

    /// When the statistic changed, server clock.
    pub timestamp: DateTime<Utc>,
}
