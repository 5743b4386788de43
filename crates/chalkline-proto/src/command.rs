//! Outbound control commands.

use serde::{Deserialize, Serialize};

use crate::RoomId;

/// Control messages the client sends to the server.
///
/// These are the only messages the realtime layer originates; everything
/// else the platform does goes over plain REST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join a doubt thread to receive its room-scoped events.
    JoinDoubt {
        /// Room to join.
        doubt_id: RoomId,
    },

    /// Leave a doubt thread.
    LeaveDoubt {
        /// Room to leave.
        doubt_id: RoomId,
    },

    /// Announce local typing state in a room.
    DoubtTyping {
        /// Room the signal is scoped to.
        doubt_id: RoomId,
        /// `true` while the local user is typing, `false` once quiet.
        typing: bool,
    },
}

impl ClientCommand {
    /// Room this command is scoped to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinDoubt { doubt_id }
            | Self::LeaveDoubt { doubt_id }
            | Self::DoubtTyping { doubt_id, .. } => doubt_id,
        }
    }
}
