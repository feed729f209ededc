//! Trunk packets exchanged between bridges.
//!
//! A trunk packet is an AUN packet prefixed with the full Econet addressing,
//! so the far bridge can deliver it without any station table:
//!
//! ```text
//! 0..4               4..12        12..
//! [dst_stn, dst_net, [AUN header] [payload]
//!  src_stn, src_net]
//! ```
//!
//! On the wire the packet only ever travels inside an encrypted envelope.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    aun::{AunHeader, TransactionType},
    control::{BRIDGE_PORT, BridgeControl},
    errors::{ProtocolError, Result},
    frame::{BROADCAST, FrameAddress, StationAddress},
};

/// Station number bridges use as the source of their own control traffic.
pub const BRIDGE_STATION: u8 = 2;

/// Fixed 12-byte trunk header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct TrunkHeader {
    address: [u8; 4],
    aun: AunHeader,
}

impl TrunkHeader {
    /// Size of the header on the wire
    pub const SIZE: usize = FrameAddress::SIZE + AunHeader::SIZE;

    /// Borrow the header at the start of `bytes`.
    pub fn from_prefix(bytes: &[u8]) -> Result<(&Self, &[u8])> {
        Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::TooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Econet addressing
    pub const fn address(&self) -> FrameAddress {
        FrameAddress::from_bytes(self.address)
    }

    /// Embedded AUN header
    pub const fn aun(&self) -> &AunHeader {
        &self.aun
    }
}

/// A parsed trunk packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkPacket {
    /// Full Econet addressing
    pub address: FrameAddress,
    /// Transaction type
    pub transaction_type: TransactionType,
    /// Port
    pub port: u8,
    /// Control byte, carried unmodified between bridges
    pub control: u8,
    /// Sender-chosen sequence number
    pub sequence: u32,
    /// Data following the header
    pub payload: Vec<u8>,
}

impl TrunkPacket {
    /// Reachability advertisement listing `our_net` as reachable through the
    /// sender.
    pub fn advertisement(our_net: u8) -> Self {
        Self {
            address: FrameAddress::new(
                StationAddress::BROADCAST,
                StationAddress::new(0, BRIDGE_STATION),
            ),
            transaction_type: TransactionType::Broadcast,
            port: BRIDGE_PORT,
            control: BridgeControl::UPDATE,
            sequence: 0,
            payload: vec![our_net],
        }
    }

    /// Reply to `request`: same port, control and sequence, addresses swapped.
    pub fn reply_to(request: &Self, transaction_type: TransactionType, payload: Vec<u8>) -> Self {
        Self {
            address: request.address.swapped(),
            transaction_type,
            port: request.port,
            control: request.control,
            sequence: request.sequence,
            payload,
        }
    }

    /// Whether the packet is addressed to every station or network.
    pub const fn is_broadcast_scoped(&self) -> bool {
        matches!(self.transaction_type, TransactionType::Broadcast)
            || self.address.dst.net == BROADCAST
            || self.address.dst.station == BROADCAST
    }

    /// Whether the packet belongs to the bridge-control protocol.
    pub const fn is_bridge_control(&self) -> bool {
        self.is_broadcast_scoped() && self.port == BRIDGE_PORT
    }

    /// Parse decrypted trunk plaintext.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = TrunkHeader::from_prefix(bytes)?;
        let aun = header.aun();
        Ok(Self {
            address: header.address(),
            transaction_type: aun.transaction_type()?,
            port: aun.port(),
            control: aun.control(),
            sequence: aun.sequence(),
            payload: payload.to_vec(),
        })
    }

    /// Encode as plaintext, ready for sealing.
    pub fn encode(&self) -> Vec<u8> {
        let header = TrunkHeader {
            address: self.address.to_bytes(),
            aun: AunHeader::new(self.transaction_type, self.port, self.control, self.sequence),
        };
        let mut out = Vec::with_capacity(TrunkHeader::SIZE + self.payload.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn advertisement_layout() {
        let advert = TrunkPacket::advertisement(88);
        assert_eq!(advert.encode(), hex!("FF FF 02 00 01 9C 81 00 00 00 00 00 58").to_vec());
        assert!(advert.is_bridge_control());
    }

    #[test]
    fn data_packet_parses() {
        let packet = TrunkPacket::parse(&hex!("C8 58 0A 33 02 99 80 00 04 00 00 00 01 02")).unwrap();
        assert_eq!(packet.address.dst, StationAddress::new(88, 200));
        assert_eq!(packet.address.src, StationAddress::new(51, 10));
        assert_eq!(packet.transaction_type, TransactionType::Data);
        assert_eq!(packet.control, 0x80);
        assert_eq!(packet.sequence, 4);
        assert_eq!(packet.payload, vec![1, 2]);
        assert!(!packet.is_bridge_control());
    }

    #[test]
    fn reply_swaps_addresses() {
        let packet = TrunkPacket::parse(&hex!("C8 58 0A 33 02 99 80 00 04 00 00 00")).unwrap();
        let ack = TrunkPacket::reply_to(&packet, TransactionType::Ack, Vec::new());
        assert_eq!(ack.address.dst, StationAddress::new(51, 10));
        assert_eq!(ack.address.src, StationAddress::new(88, 200));
        assert_eq!(ack.sequence, 4);
    }

    #[test]
    fn broadcast_scope_needs_bridge_port_for_control() {
        let mut packet = TrunkPacket::advertisement(1);
        packet.port = 0x99;
        assert!(packet.is_broadcast_scoped());
        assert!(!packet.is_bridge_control());

        packet.port = BRIDGE_PORT;
        packet.transaction_type = TransactionType::Data;
        packet.address.dst = StationAddress::new(0xFF, 7);
        assert!(packet.is_bridge_control());
    }

    #[test]
    fn truncated_plaintext_is_rejected() {
        assert_eq!(
            TrunkPacket::parse(&[0; 11]),
            Err(ProtocolError::TooShort { expected: 12, actual: 11 })
        );
    }
}
