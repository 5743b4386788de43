//! Fuzz target for envelope decoding
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary input (general malformation)
//! - Valid JSON scaffolding with hostile payloads (type confusion,
//!   missing fields, unknown event names)
//!
//! # Invariants
//!
//! - Decoding completes quickly (no infinite loops)
//! - Unknown event names are reported as `UnknownEvent`, never `Malformed`
//! - NEVER panic on malformed input

#![no_main]

use libfuzzer_sys::fuzz_target;

use chalkline_proto::{ProtocolError, decode_event};

fuzz_target!(|data: &[u8]| {
    match decode_event(data) {
        Ok(event) => {
            // A decoded event must re-encode without panicking.
            let _ = serde_json::to_vec(&event);
        }
        Err(
            ProtocolError::UnknownEvent { .. }
            | ProtocolError::Malformed { .. }
            | ProtocolError::MissingField { .. },
        ) => {}
    }
});
