//! Property-based tests for envelope decoding.

use chalkline_proto::{ClientCommand, ProtocolError, decode_event, encode_command};
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic_the_decoder(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_event(&bytes);
    }

    #[test]
    fn unknown_event_names_are_classified_not_conflated(name in "[a-z_]{1,24}") {
        let raw = format!(r#"{{"event": "{name}", "data": {{}}}}"#);

        match decode_event(raw.as_bytes()) {
            Err(ProtocolError::UnknownEvent { name: reported }) => {
                prop_assert_eq!(reported, name);
            },
            // Known names may still fail on the empty payload, but must
            // not be reported as unknown.
            Err(ProtocolError::Malformed { .. }) | Ok(_) => {},
            Err(other) => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
        }
    }

    #[test]
    fn commands_round_trip_through_the_envelope(
        doubt_id in "doubt-[0-9a-z]{1,12}",
        typing in any::<bool>(),
    ) {
        let commands = [
            ClientCommand::JoinDoubt { doubt_id: doubt_id.clone() },
            ClientCommand::LeaveDoubt { doubt_id: doubt_id.clone() },
            ClientCommand::DoubtTyping { doubt_id, typing },
        ];

        for command in commands {
            let bytes = encode_command(&command).unwrap();
            let back: ClientCommand = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(command, back);
        }
    }
}
