//! Connection lifecycle state machine.
//!
//! Owns the single logical connection's state and the retry policy around
//! it. Uses the action pattern: methods report what happened and return
//! actions for the driver to execute (dial, sleep a retry delay). This keeps
//! the state machine pure and makes reconnection behavior fully testable
//! without a transport.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ connect ┌────────────┐ handshake ok ┌──────┐
//! │ Idle │────────>│ Connecting │─────────────>│ Open │
//! └──────┘         └────────────┘              └──────┘
//!                        │                        │
//!                        │ failure                │ drop
//!                        ↓                        ↓
//!                  ┌──────────┐   retry ok   ┌──────────┐
//!                  │ Degraded │<─────────────│ Degraded │──┐ retry fail,
//!                  └──────────┘              └──────────┘<─┘ attempts < max
//!                        │
//!                        │ attempts >= max, auth rejected, or disconnect()
//!                        ↓
//!                   ┌────────┐    connect    ┌────────────┐
//!                   │ Closed │──────────────>│ Connecting │
//!                   └────────┘               └────────────┘
//! ```
//!
//! A retry dial is a connecting phase *within* `Degraded`: externally the
//! session reports `Degraded` until the handshake succeeds, so UI surfaces
//! see a single "reconnecting" period rather than flapping.

use std::time::Duration;

use crate::{
    backoff::{Backoff, BackoffConfig},
    env::Environment,
    error::SessionError,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// First dial in progress.
    Connecting,
    /// Connected and authenticated.
    Open,
    /// Connection lost; retrying with backoff.
    Degraded,
    /// Terminal until an explicit reconnect request.
    Closed,
}

/// Why a session reached [`ConnectionState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// The application called disconnect.
    LocalDisconnect,
    /// The server rejected the credential; retrying is pointless.
    AuthRejected,
    /// The retry budget was spent.
    Exhausted {
        /// Consecutive failures before giving up.
        attempts: u32,
    },
}

/// One observed lifecycle transition.
///
/// Emitted for every state change so any number of UI surfaces can react
/// without polling. `attempt` lets consumers stay quiet below the first
/// retry and show a "reconnecting" indicator afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub previous: ConnectionState,
    /// State after the transition.
    pub current: ConnectionState,
    /// Consecutive failed attempts at the time of the transition.
    pub attempt: u32,
    /// Close reason; `None` unless `current` is [`ConnectionState::Closed`].
    pub cause: Option<CloseCause>,
}

/// Actions returned by the session state machine.
///
/// The driver executes these: open the transport for `Dial`, sleep then
/// report `retry_elapsed` for `ScheduleRetry`, fan `StateChanged` out to
/// subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open the transport, attaching the bearer credential.
    Dial {
        /// Zero-based attempt number (0 is the initial dial).
        attempt: u32,
    },

    /// Sleep `delay`, then report `retry_elapsed`.
    ScheduleRetry {
        /// Jittered delay before the next dial.
        delay: Duration,
        /// Attempt number the retry will carry.
        attempt: u32,
    },

    /// A lifecycle transition happened.
    StateChanged(StateChange),
}

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Retry policy for transient transport failures.
    pub backoff: BackoffConfig,
}

/// Connection lifecycle state machine.
///
/// Pure: no I/O, no clock. The driver reports outcomes (`opened`,
/// `connection_lost`, `retry_elapsed`) and executes the returned actions.
#[derive(Debug, Clone)]
pub struct Session {
    state: ConnectionState,
    backoff: Backoff,
}

impl Session {
    /// Create a session in [`ConnectionState::Idle`].
    pub fn new(config: SessionConfig) -> Self {
        Self { state: ConnectionState::Idle, backoff: Backoff::new(config.backoff) }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }

    /// Whether the session is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Begin connecting.
    ///
    /// # Errors
    ///
    /// - [`SessionError`] unless the session is `Idle` or `Closed`
    pub fn connect(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Closed => {
                self.backoff.reset();
                let changed = self.transition(ConnectionState::Connecting, None);
                Ok(vec![changed, SessionAction::Dial { attempt: 0 }])
            },
            state => Err(SessionError { state, operation: "connect" }),
        }
    }

    /// The dial handshake completed.
    ///
    /// Resets the retry budget: the next drop starts again from the base
    /// delay.
    ///
    /// # Errors
    ///
    /// - [`SessionError`] unless the session is `Connecting` or `Degraded`
    pub fn opened(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Degraded => {
                self.backoff.reset();
                Ok(vec![self.transition(ConnectionState::Open, None)])
            },
            state => Err(SessionError { state, operation: "opened" }),
        }
    }

    /// A dial failed or an established connection dropped.
    ///
    /// Schedules a retry while attempts remain, otherwise closes with
    /// [`CloseCause::Exhausted`]. Reported exactly once even if the driver
    /// relays further failures after closure.
    pub fn connection_lost<E: Environment>(&mut self, env: &E) -> Vec<SessionAction> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Degraded => {
                if let Some(delay) = self.backoff.next_delay(env) {
                    let attempt = self.backoff.attempt();
                    let mut actions = Vec::new();
                    if self.state != ConnectionState::Degraded {
                        actions.push(self.transition(ConnectionState::Degraded, None));
                    }
                    actions.push(SessionAction::ScheduleRetry { delay, attempt });
                    actions
                } else {
                    let attempts = self.backoff.attempt();
                    vec![self.transition(
                        ConnectionState::Closed,
                        Some(CloseCause::Exhausted { attempts }),
                    )]
                }
            },
            // Stale failure report after close or before connect.
            ConnectionState::Idle | ConnectionState::Closed => vec![],
        }
    }

    /// The server rejected the credential.
    ///
    /// Fatal: closes immediately without engaging the retry machinery.
    pub fn auth_rejected(&mut self) -> Vec<SessionAction> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Degraded => {
                vec![self.transition(ConnectionState::Closed, Some(CloseCause::AuthRejected))]
            },
            ConnectionState::Idle | ConnectionState::Closed => vec![],
        }
    }

    /// A scheduled retry delay elapsed.
    ///
    /// Returns the next dial, or nothing if the session left `Degraded` in
    /// the meantime (a timer that fires after disconnect must be inert).
    pub fn retry_elapsed(&mut self) -> Vec<SessionAction> {
        if self.state == ConnectionState::Degraded {
            vec![SessionAction::Dial { attempt: self.backoff.attempt() }]
        } else {
            vec![]
        }
    }

    /// Tear down deterministically.
    ///
    /// Idempotent: disconnecting an already closed or idle session returns
    /// no actions.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Closed => vec![],
            _ => vec![self.transition(ConnectionState::Closed, Some(CloseCause::LocalDisconnect))],
        }
    }

    fn transition(&mut self, to: ConnectionState, cause: Option<CloseCause>) -> SessionAction {
        let change = StateChange {
            previous: self.state,
            current: to,
            attempt: self.backoff.attempt(),
            cause,
        };
        self.state = to;
        SessionAction::StateChanged(change)
    }
}
