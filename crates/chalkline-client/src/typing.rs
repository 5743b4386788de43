//! Typing indicator debounce and expiry.
//!
//! Two halves, both per room:
//!
//! - **Local**: a burst of keystrokes becomes at most one typing-start
//!   signal per send interval, and a single stop signal once the composer
//!   has been quiet long enough.
//! - **Remote**: inbound signals refresh a last-seen map. Entries are
//!   authoritative only while younger than the TTL, so an indicator whose
//!   stop signal was dropped on the wire heals itself; the worst case is a
//!   lingering indicator for one TTL.
//!
//! Generic over the instant type so the same logic runs under a virtual
//! clock in tests.

use std::{collections::HashMap, ops::Sub, time::Duration};

use chalkline_proto::{ClientCommand, RoomId, UserId};

use crate::config::TypingConfig;

/// Local composer state for one room.
#[derive(Debug, Clone, Copy)]
struct LocalTyping<I> {
    /// When the last typing-start signal was sent.
    last_sent: I,
    /// When the local user last pressed a key.
    last_activity: I,
}

/// Typing indicator tracker.
#[derive(Debug, Clone)]
pub struct TypingTracker<I> {
    config: TypingConfig,
    local: HashMap<RoomId, LocalTyping<I>>,
    remote: HashMap<RoomId, HashMap<UserId, I>>,
}

impl<I> TypingTracker<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a tracker with the given timings.
    pub fn new(config: TypingConfig) -> Self {
        Self { config, local: HashMap::new(), remote: HashMap::new() }
    }

    /// Record a local keystroke in `room`.
    ///
    /// Returns the typing-start command to send, at most once per send
    /// interval per room. While the connection is down nothing is recorded:
    /// a typing signal is meaningless to a server that cannot see us.
    pub fn notify_local(&mut self, room: RoomId, now: I, open: bool) -> Option<ClientCommand> {
        if !open {
            return None;
        }

        match self.local.get_mut(&room) {
            Some(state) => {
                state.last_activity = now;
                if now - state.last_sent >= self.config.send_interval {
                    state.last_sent = now;
                    Some(ClientCommand::DoubtTyping { doubt_id: room, typing: true })
                } else {
                    None
                }
            },
            None => {
                self.local
                    .insert(room.clone(), LocalTyping { last_sent: now, last_activity: now });
                Some(ClientCommand::DoubtTyping { doubt_id: room, typing: true })
            },
        }
    }

    /// Record an inbound typing signal from a remote user.
    pub fn observe_remote(&mut self, room: RoomId, user: UserId, typing: bool, now: I) {
        if typing {
            self.remote.entry(room).or_default().insert(user, now);
        } else if let Some(users) = self.remote.get_mut(&room) {
            users.remove(&user);
            if users.is_empty() {
                self.remote.remove(&room);
            }
        }
    }

    /// Users currently typing in `room`, sorted for determinism.
    ///
    /// Filters by TTL at read time, so consumers never see an entry the
    /// server stopped refreshing more than one TTL ago.
    pub fn typists(&self, room: &RoomId, now: I) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .remote
            .get(room)
            .map(|users| {
                users
                    .iter()
                    .filter(|(_, seen)| now - **seen < self.config.remote_ttl)
                    .map(|(user, _)| user.clone())
                    .collect()
            })
            .unwrap_or_default();

        users.sort_unstable();
        users
    }

    /// Periodic maintenance.
    ///
    /// Emits stop-typing commands for rooms whose composer went quiet and
    /// prunes expired remote entries so the maps stay bounded.
    pub fn tick(&mut self, now: I, open: bool) -> Vec<ClientCommand> {
        let quiet: Vec<RoomId> = self
            .local
            .iter()
            .filter(|(_, state)| now - state.last_activity >= self.config.quiet_period)
            .map(|(room, _)| room.clone())
            .collect();

        let mut commands = Vec::new();
        for room in quiet {
            self.local.remove(&room);
            if open {
                commands.push(ClientCommand::DoubtTyping { doubt_id: room, typing: false });
            }
        }

        let ttl = self.config.remote_ttl;
        self.remote.retain(|_, users| {
            users.retain(|_, seen| now - *seen < ttl);
            !users.is_empty()
        });

        commands
    }

    /// Drop all local debounce state.
    ///
    /// Called on disconnect so no stop-typing frame fires after teardown.
    pub fn clear_local(&mut self) {
        self.local.clear();
    }
}
