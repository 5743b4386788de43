//! Room membership tracking.
//!
//! Membership is *intent*, not transport state: the set of rooms the
//! application wants to be in survives disconnects and is replayed to the
//! server after every successful (re)connection. A separate `announced` set
//! records which joins were sent on the current connection, which is what
//! makes replay exactly-once and double-joins silent.

use std::collections::{BTreeSet, HashSet};

use chalkline_proto::{ClientCommand, RoomId};

/// Room membership intent tracker.
#[derive(Debug, Default, Clone)]
pub struct RoomRegistry {
    /// Rooms the application intends to be joined to. Ordered so replay is
    /// deterministic.
    intent: BTreeSet<RoomId>,
    /// Rooms whose `join_doubt` was sent on the current connection.
    /// Cleared on every disconnect.
    announced: HashSet<RoomId>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intent to be in `room`.
    ///
    /// Returns the join command to send now, or `None` when the connection
    /// is down (the join will be replayed on the next open) or the room was
    /// already announced (double-join is idempotent).
    pub fn join(&mut self, room: RoomId, open: bool) -> Option<ClientCommand> {
        self.intent.insert(room.clone());

        if open && self.announced.insert(room.clone()) {
            Some(ClientCommand::JoinDoubt { doubt_id: room })
        } else {
            None
        }
    }

    /// Drop intent to be in `room`.
    ///
    /// Returns the leave command to send now, or `None` when the server was
    /// never told about this room on the current connection. Leaving an
    /// unjoined room is a no-op.
    pub fn leave(&mut self, room: &RoomId, open: bool) -> Option<ClientCommand> {
        self.intent.remove(room);

        if self.announced.remove(room) && open {
            Some(ClientCommand::LeaveDoubt { doubt_id: room.clone() })
        } else {
            None
        }
    }

    /// Join commands for every intended room not yet announced on this
    /// connection, in sorted order. Marks them announced.
    ///
    /// Called once per successful open, before `Open` is reported to
    /// dependents, so room-scoped subscribers never observe a false
    /// "joined" state.
    pub fn replay(&mut self) -> Vec<ClientCommand> {
        let mut commands = Vec::new();
        for room in &self.intent {
            if self.announced.insert(room.clone()) {
                commands.push(ClientCommand::JoinDoubt { doubt_id: room.clone() });
            }
        }
        commands
    }

    /// Forget which rooms were announced. Called on every disconnect so the
    /// next open replays the full intent set.
    pub fn reset_announcements(&mut self) {
        self.announced.clear();
    }

    /// Whether the application intends to be in `room`.
    #[must_use]
    pub fn is_joined(&self, room: &RoomId) -> bool {
        self.intent.contains(room)
    }

    /// Intended rooms, in sorted order.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.intent.iter()
    }

    /// Number of intended rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intent.len()
    }

    /// Whether no rooms are intended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_while_open_sends_immediately() {
        let mut rooms = RoomRegistry::new();

        let cmd = rooms.join("doubt-42".into(), true);
        assert_eq!(cmd, Some(ClientCommand::JoinDoubt { doubt_id: "doubt-42".into() }));
        assert!(rooms.is_joined(&"doubt-42".into()));
    }

    #[test]
    fn double_join_sends_once() {
        let mut rooms = RoomRegistry::new();

        assert!(rooms.join("doubt-42".into(), true).is_some());
        assert!(rooms.join("doubt-42".into(), true).is_none());
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn join_while_down_is_queued_for_replay() {
        let mut rooms = RoomRegistry::new();

        assert!(rooms.join("doubt-1".into(), false).is_none());
        assert!(rooms.is_joined(&"doubt-1".into()));

        let replayed = rooms.replay();
        assert_eq!(replayed, vec![ClientCommand::JoinDoubt { doubt_id: "doubt-1".into() }]);
    }

    #[test]
    fn leave_unjoined_room_is_noop() {
        let mut rooms = RoomRegistry::new();

        assert!(rooms.leave(&"doubt-9".into(), true).is_none());
        assert!(rooms.is_empty());
    }

    #[test]
    fn leave_after_announce_sends_leave() {
        let mut rooms = RoomRegistry::new();
        rooms.join("doubt-1".into(), true);

        let cmd = rooms.leave(&"doubt-1".into(), true);
        assert_eq!(cmd, Some(ClientCommand::LeaveDoubt { doubt_id: "doubt-1".into() }));
        assert!(!rooms.is_joined(&"doubt-1".into()));
    }

    #[test]
    fn replay_after_reset_covers_full_intent_once() {
        let mut rooms = RoomRegistry::new();
        rooms.join("doubt-b".into(), true);
        rooms.join("doubt-a".into(), true);

        // Connection dropped; server forgot everything.
        rooms.reset_announcements();

        let replayed = rooms.replay();
        assert_eq!(replayed, vec![
            ClientCommand::JoinDoubt { doubt_id: "doubt-a".into() },
            ClientCommand::JoinDoubt { doubt_id: "doubt-b".into() },
        ]);

        // A second replay on the same connection sends nothing.
        assert!(rooms.replay().is_empty());
    }

    #[test]
    fn membership_reflects_last_action_per_room() {
        let mut rooms = RoomRegistry::new();

        rooms.join("doubt-1".into(), false);
        rooms.join("doubt-2".into(), false);
        rooms.leave(&"doubt-1".into(), false);
        rooms.join("doubt-1".into(), false);
        rooms.leave(&"doubt-2".into(), false);

        let joined: Vec<_> = rooms.rooms().cloned().collect();
        assert_eq!(joined, vec![RoomId::from("doubt-1")]);
    }
}
