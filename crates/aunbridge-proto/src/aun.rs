//! AUN packets carried over UDP.
//!
//! Every packet starts with a fixed 8-byte header, followed by the payload:
//!
//! ```text
//! 0        1      2         3         4..8
//! [type]   [port] [control] [reserved] [sequence, little-endian u32]
//! ```
//!
//! Ack and Nack packets carry no payload. Sequence numbers are chosen by the
//! sender and echoed verbatim in acknowledgments; the bridge treats them as
//! opaque apart from equality.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::errors::{ProtocolError, Result};

/// AUN transaction type.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Delivered to every station on the destination network
    Broadcast = 1,
    /// Reliable unicast data
    Data = 2,
    /// Positive acknowledgment of a Data transaction
    Ack = 3,
    /// Negative acknowledgment of a Data transaction
    Nack = 4,
    /// Immediate operation (answered with an [`TransactionType::ImmediateReply`])
    Immediate = 5,
    /// Answer to an immediate operation, carrying the reply payload
    ImmediateReply = 6,
}

impl TransactionType {
    /// Convert from the wire byte. Returns `None` for unknown values.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Broadcast),
            2 => Some(Self::Data),
            3 => Some(Self::Ack),
            4 => Some(Self::Nack),
            5 => Some(Self::Immediate),
            6 => Some(Self::ImmediateReply),
            _ => None,
        }
    }

    /// Wire byte for this type.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value).ok_or(ProtocolError::UnknownTransactionType(value))
    }
}

/// Fixed 8-byte AUN header as it appears on the wire.
///
/// Fields are raw bytes so that every bit pattern is a valid header. The
/// transaction type is only checked when converting to [`AunPacket`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct AunHeader {
    transaction_type: u8,
    port: u8,
    control: u8,
    reserved: u8,
    sequence: [u8; 4],
}

impl AunHeader {
    /// Size of the header on the wire
    pub const SIZE: usize = 8;

    /// Build a header. The reserved byte is always zero.
    pub const fn new(transaction_type: TransactionType, port: u8, control: u8, sequence: u32) -> Self {
        Self {
            transaction_type: transaction_type.to_u8(),
            port,
            control,
            reserved: 0,
            sequence: sequence.to_le_bytes(),
        }
    }

    /// Borrow the header at the start of `bytes`.
    pub fn from_prefix(bytes: &[u8]) -> Result<(&Self, &[u8])> {
        Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::TooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Transaction type, if known.
    pub fn transaction_type(&self) -> Result<TransactionType> {
        TransactionType::try_from(self.transaction_type)
    }

    /// Port byte
    pub const fn port(&self) -> u8 {
        self.port
    }

    /// Control byte
    pub const fn control(&self) -> u8 {
        self.control
    }

    /// Sequence number
    pub const fn sequence(&self) -> u32 {
        u32::from_le_bytes(self.sequence)
    }
}

/// A parsed AUN packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AunPacket {
    /// Transaction type
    pub transaction_type: TransactionType,
    /// Destination port
    pub port: u8,
    /// Control byte
    pub control: u8,
    /// Sender-chosen sequence number
    pub sequence: u32,
    /// Data following the header
    pub payload: Vec<u8>,
}

impl AunPacket {
    /// A Data packet.
    pub fn data(port: u8, control: u8, sequence: u32, payload: Vec<u8>) -> Self {
        Self { transaction_type: TransactionType::Data, port, control, sequence, payload }
    }

    /// An acknowledgment-style reply (Ack, Nack or ImmediateReply) for a
    /// received packet.
    pub fn reply_to(
        request: &Self,
        transaction_type: TransactionType,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            transaction_type,
            port: request.port,
            control: request.control,
            sequence: request.sequence,
            payload,
        }
    }

    /// Header for this packet.
    pub const fn header(&self) -> AunHeader {
        AunHeader::new(self.transaction_type, self.port, self.control, self.sequence)
    }

    /// Parse a UDP datagram.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = AunHeader::from_prefix(bytes)?;
        Ok(Self {
            transaction_type: header.transaction_type()?,
            port: header.port(),
            control: header.control(),
            sequence: header.sequence(),
            payload: payload.to_vec(),
        })
    }

    /// Encode for the wire.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AunHeader::SIZE + self.payload.len());
        out.extend_from_slice(self.header().as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}
