//! Random bytes through every wire parser.
//!
//! Parsers must never panic, and anything that parses must survive an
//! encode and parse unchanged.

#![no_main]

use aunbridge_proto::{AunPacket, LocalFrame, Scout, TrunkPacket};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = AunPacket::parse(data) {
        let again = AunPacket::parse(&packet.encode()).expect("re-encoded AUN packet parses");
        assert_eq!(again, packet);
    }

    if let Ok(packet) = TrunkPacket::parse(data) {
        let again = TrunkPacket::parse(&packet.encode()).expect("re-encoded trunk packet parses");
        assert_eq!(again, packet);
    }

    if let Ok(scout) = Scout::parse(data) {
        assert_eq!(scout.to_bytes().as_slice(), data);
        let _ = LocalFrame::from_pair(&scout, data);
    }

    if let Ok(frame) = LocalFrame::decode(data) {
        assert_eq!(frame.encode(), data);
    }
});
