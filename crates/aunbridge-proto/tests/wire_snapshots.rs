//! Snapshot tests for wire format stability.
//!
//! Every byte here is observed by other bridges, AUN hosts or the link
//! daemon. A failing snapshot means the wire format changed.

use aunbridge_proto::{
    AunPacket, FrameAddress, LocalFrame, Scout, StationAddress, TransactionType, TrunkPacket,
};
use insta::assert_snapshot;

fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[test]
fn snapshot_scout() {
    let scout = Scout {
        address: FrameAddress::new(StationAddress::new(0, 200), StationAddress::new(0, 10)),
        control: 0x80,
        port: 0x99,
    };
    assert_snapshot!(to_hex(&scout.to_bytes()), @"c8000a008099");
}

#[test]
fn snapshot_local_frame() {
    let frame = LocalFrame {
        address: FrameAddress::new(StationAddress::new(0, 254), StationAddress::new(1, 3)),
        control: 0x81,
        port: 0xD1,
        payload: vec![0x01, 0x02, 0x03],
    };
    assert_snapshot!(to_hex(&frame.encode()), @"fe00030181d1010203");
}

#[test]
fn snapshot_aun_data() {
    let packet = AunPacket::data(0x99, 0x00, 4, b"hi".to_vec());
    assert_snapshot!(to_hex(&packet.encode()), @"02990000040000006869");
}

#[test]
fn snapshot_aun_nack() {
    let request = AunPacket::data(0x99, 0x00, 0x100, Vec::new());
    let nack = AunPacket::reply_to(&request, TransactionType::Nack, Vec::new());
    assert_snapshot!(to_hex(&nack.encode()), @"0499000000010000");
}

#[test]
fn snapshot_trunk_advertisement() {
    assert_snapshot!(to_hex(&TrunkPacket::advertisement(88).encode()), @"ffff0200019c81000000000058");
}

#[test]
fn snapshot_trunk_immediate_reply() {
    let packet = TrunkPacket {
        address: FrameAddress::new(StationAddress::new(1, 10), StationAddress::new(88, 254)),
        transaction_type: TransactionType::ImmediateReply,
        port: 0x00,
        control: 0x88,
        sequence: 0x0000_0010,
        payload: vec![0xAB],
    };
    assert_snapshot!(to_hex(&packet.encode()), @"0a01fe580600880010000000ab");
}
