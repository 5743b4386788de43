//! Error taxonomy for the connection layer.
//!
//! The split matters for retry policy: [`TransportError`] is transient and
//! goes through backoff, [`AuthError`] is fatal and must surface to the
//! caller for re-authentication, and exhaustion is terminal until the user
//! explicitly asks to reconnect. We avoid `std::io::Error` in protocol logic
//! so the retry decision is a type-level property, not string matching.

use std::time::Duration;

use thiserror::Error;

use crate::session::ConnectionState;

/// Credential problems. Never retried by the backoff mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer credential was configured before `connect`.
    #[error("no credential available")]
    Missing,

    /// The server rejected the presented credential.
    #[error("credential rejected by server")]
    Rejected,
}

/// Transport-level failures. All transient; retried via backoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Opening the connection failed before the handshake completed.
    #[error("dial failed: {reason}")]
    Dial {
        /// Driver diagnostic.
        reason: String,
    },

    /// An established connection dropped unexpectedly.
    #[error("connection lost: {reason}")]
    Lost {
        /// Driver diagnostic.
        reason: String,
    },

    /// The handshake did not complete in time.
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited.
        elapsed: Duration,
    },
}

/// Failure of a connection attempt as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Fatal credential problem; the caller must re-authenticate.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transient transport failure; retried automatically while attempts
    /// remain.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Retries were exhausted; an explicit reconnect is required.
    #[error("connection attempts exhausted after {attempts} failures")]
    Exhausted {
        /// Consecutive failures before giving up.
        attempts: u32,
    },
}

impl ConnectError {
    /// Returns true if this error is transient and retried by backoff.
    ///
    /// Credential failures and exhaustion are never transient: retrying them
    /// without caller intervention would either hammer the server with a bad
    /// token or silently restart an abandoned connection.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Invalid operation against the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state transition: cannot {operation} from {state:?}")]
pub struct SessionError {
    /// State the session was in when the operation was attempted.
    pub state: ConnectionState,
    /// Operation that was attempted.
    pub operation: &'static str,
}
