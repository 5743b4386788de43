//! Protocol types
//!
//! Wire-facing types for the Chalkline realtime protocol: inbound server
//! events, outbound control commands, and the JSON envelope that carries both
//! over the transport.
//!
//! # Envelope
//!
//! Every message on the wire is a JSON object of the form
//! `{"event": "<name>", "data": {...}}`. The event name selects the payload
//! shape; unknown names decode to [`ProtocolError::UnknownEvent`] so a client
//! talking to a newer server can skip events it does not understand instead
//! of dropping the connection.
//!
//! Frame headers, authentication, and retransmission are transport concerns
//! and intentionally absent here; this crate only defines the shapes both
//! sides must agree on.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod envelope;
mod errors;
mod event;

pub use command::ClientCommand;
pub use envelope::{decode_event, encode_command};
pub use errors::{ProtocolError, Result};
pub use event::{
    DoubtStatisticsUpdate, DoubtUpdate, EventKind, NewDoubtAvailable, NewResponse,
    NotificationRecord, Priority, ServerEvent, UserTyping,
};

/// Identifier of a room-scoped channel (one doubt thread).
pub type RoomId = String;

/// Stable identifier of a remote user.
pub type UserId = String;

/// Unique identifier of a notification record.
pub type NotificationId = String;
