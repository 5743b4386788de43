//! JSON envelope encoding and decoding.
//!
//! Decoding is two-phase: the envelope is parsed as a generic JSON value
//! first so an unrecognized event name can be reported as
//! [`ProtocolError::UnknownEvent`] instead of a generic deserialization
//! failure. Clients skip unknown events; they treat malformed ones as peer
//! bugs worth logging.

use serde_json::Value;

use crate::{
    ClientCommand, ServerEvent,
    errors::{ProtocolError, Result},
};

/// Event names this client understands.
const KNOWN_EVENTS: &[&str] = &[
    "doubt_update",
    "new_response",
    "user_typing",
    "notification",
    "new_doubt_available",
    "doubt_statistics_update",
];

/// Encode an outbound command into its wire envelope.
pub fn encode_command(command: &ClientCommand) -> Result<Vec<u8>> {
    serde_json::to_vec(command).map_err(|e| ProtocolError::Malformed { reason: e.to_string() })
}

/// Decode an inbound envelope into a [`ServerEvent`].
///
/// # Errors
///
/// - [`ProtocolError::Malformed`] if the bytes are not a JSON object or the
///   payload does not match the event's declared shape
/// - [`ProtocolError::MissingField`] if the `event` tag is absent
/// - [`ProtocolError::UnknownEvent`] if the event name is not recognized
pub fn decode_event(bytes: &[u8]) -> Result<ServerEvent> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::Malformed { reason: e.to_string() })?;

    let name = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField { field: "event" })?
        .to_string();

    if !KNOWN_EVENTS.contains(&name.as_str()) {
        return Err(ProtocolError::UnknownEvent { name });
    }

    serde_json::from_value(value)
        .map_err(|e| ProtocolError::Malformed { reason: format!("{name}: {e}") })
}
