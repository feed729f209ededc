//! Econet frames as seen on the local bus.
//!
//! A transaction on the bus is a scout followed by a data frame:
//!
//! ```text
//! scout: [dst_stn, dst_net, src_stn, src_net, control, port]
//! data:  [dst_stn, dst_net, src_stn, src_net, payload...]
//! ```
//!
//! The link layer hands both frames over as raw bytes once clock recovery,
//! bit stuffing and CRC checks are done. [`LocalFrame::from_pair`] joins
//! them into one addressed frame, refusing pairs whose addressing differs.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Largest payload the bridge will carry in one frame.
pub const ECONET_MTU: usize = 1280;

/// Station or network number meaning "everyone".
pub const BROADCAST: u8 = 0xFF;

/// Top bit of the control byte. Set on frames that expect a reply on the bus.
pub const CONTROL_REPLY_BIT: u8 = 0x80;

/// A station identity: network number plus station number.
///
/// Network 0 means "the network this frame is on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StationAddress {
    /// Network number
    pub net: u8,
    /// Station number
    pub station: u8,
}

impl StationAddress {
    /// The all-stations, all-networks broadcast address.
    pub const BROADCAST: Self = Self { net: BROADCAST, station: BROADCAST };

    /// Create a new address.
    pub const fn new(net: u8, station: u8) -> Self {
        Self { net, station }
    }

    /// Whether either half of the address is the broadcast value.
    pub const fn is_broadcast_scoped(&self) -> bool {
        self.net == BROADCAST || self.station == BROADCAST
    }
}

impl fmt::Display for StationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.net, self.station)
    }
}

/// Destination and source of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameAddress {
    /// Where the frame is going
    pub dst: StationAddress,
    /// Where the frame came from
    pub src: StationAddress,
}

impl FrameAddress {
    /// Size of the address block on the wire
    pub const SIZE: usize = 4;

    /// Create a new address block.
    pub const fn new(dst: StationAddress, src: StationAddress) -> Self {
        Self { dst, src }
    }

    /// Decode from bus byte order (`dst_stn, dst_net, src_stn, src_net`).
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            dst: StationAddress { station: bytes[0], net: bytes[1] },
            src: StationAddress { station: bytes[2], net: bytes[3] },
        }
    }

    /// Encode in bus byte order.
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.dst.station, self.dst.net, self.src.station, self.src.net]
    }

    /// Same frame, reply direction.
    pub const fn swapped(self) -> Self {
        Self { dst: self.src, src: self.dst }
    }

    fn read(bytes: &[u8]) -> Result<Self> {
        match bytes.first_chunk::<4>() {
            Some(chunk) => Ok(Self::from_bytes(*chunk)),
            None => Err(ProtocolError::TooShort { expected: Self::SIZE, actual: bytes.len() }),
        }
    }
}

impl fmt::Display for FrameAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// The header-only frame announcing an impending data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scout {
    /// Addressing that the data frame must repeat
    pub address: FrameAddress,
    /// Control byte
    pub control: u8,
    /// Port selecting the application-level service
    pub port: u8,
}

impl Scout {
    /// Exact size of a scout on the wire
    pub const SIZE: usize = 6;

    /// Parse a scout. Anything other than exactly six bytes is rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let Ok(raw) = <[u8; Self::SIZE]>::try_from(bytes) else {
            return Err(ProtocolError::BadScoutLength(bytes.len()));
        };

        Ok(Self {
            address: FrameAddress::from_bytes([raw[0], raw[1], raw[2], raw[3]]),
            control: raw[4],
            port: raw[5],
        })
    }

    /// Encode for the wire.
    pub const fn to_bytes(&self) -> [u8; 6] {
        let a = self.address.to_bytes();
        [a[0], a[1], a[2], a[3], self.control, self.port]
    }
}

/// A complete addressed frame: scout fields plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFrame {
    /// Destination and source
    pub address: FrameAddress,
    /// Control byte
    pub control: u8,
    /// Port
    pub port: u8,
    /// Data carried by the frame
    pub payload: Vec<u8>,
}

impl LocalFrame {
    /// Bytes preceding the payload in [`LocalFrame::encode`]
    pub const HEADER_SIZE: usize = Scout::SIZE;

    /// Join a scout with the data frame that followed it.
    ///
    /// The data frame must carry the scout's four address bytes unchanged and
    /// its payload must fit the MTU.
    pub fn from_pair(scout: &Scout, data: &[u8]) -> Result<Self> {
        let address = FrameAddress::read(data)?;
        if address != scout.address {
            return Err(ProtocolError::AddressMismatch { scout: scout.address, data: address });
        }

        let payload = &data[FrameAddress::SIZE..];
        if payload.len() > ECONET_MTU {
            return Err(ProtocolError::PayloadTooLarge { size: payload.len(), max: ECONET_MTU });
        }

        Ok(Self { address, control: scout.control, port: scout.port, payload: payload.to_vec() })
    }

    /// The scout announcing this frame.
    pub const fn scout(&self) -> Scout {
        Scout { address: self.address, control: self.control, port: self.port }
    }

    /// Whether this frame goes to every station.
    pub const fn is_broadcast(&self) -> bool {
        self.address.dst.is_broadcast_scoped()
    }

    /// Encode as scout bytes followed by the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.scout().to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode the layout produced by [`LocalFrame::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::TooShort { expected: Self::HEADER_SIZE, actual: bytes.len() });
        }
        let scout = Scout::parse(&bytes[..Scout::SIZE])?;
        let payload = &bytes[Scout::SIZE..];
        if payload.len() > ECONET_MTU {
            return Err(ProtocolError::PayloadTooLarge { size: payload.len(), max: ECONET_MTU });
        }

        Ok(Self {
            address: scout.address,
            control: scout.control,
            port: scout.port,
            payload: payload.to_vec(),
        })
    }
}
