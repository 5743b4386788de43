//! Protocol decode errors.
//!
//! Malformed envelopes and unknown event names are distinct failures: the
//! former indicates a broken peer or transport corruption, the latter is
//! expected during rolling upgrades and must be skippable.

use thiserror::Error;

/// Errors produced while decoding wire envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The envelope named an event this client does not know.
    #[error("unknown event: {name}")]
    UnknownEvent {
        /// Event name as it appeared on the wire.
        name: String,
    },

    /// The envelope was not valid JSON or did not match the expected shape.
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// Decoder diagnostic.
        reason: String,
    },

    /// The envelope lacked a required field.
    #[error("missing envelope field: {field}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },
}

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
