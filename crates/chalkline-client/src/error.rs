//! Client error type.

use thiserror::Error;

use chalkline_core::error::{AuthError, SessionError};

/// Errors returned by [`crate::Client::handle`].
///
/// Transient transport failures never surface here; they feed the retry
/// machinery instead. What does surface is what the caller must act on: a
/// credential problem or a misuse of the lifecycle API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Fatal credential problem; the caller must re-authenticate before
    /// connecting again.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Lifecycle operation invalid in the current connection state.
    #[error(transparent)]
    Session(#[from] SessionError),
}
