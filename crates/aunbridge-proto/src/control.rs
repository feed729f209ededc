//! Bridge-control protocol.
//!
//! Bridges talk to each other on a reserved port using broadcast-scoped
//! packets. The control byte selects the operation.

/// Port reserved for bridge-to-bridge control traffic.
pub const BRIDGE_PORT: u8 = 0x9C;

/// Control codes understood on [`BRIDGE_PORT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeControl {
    /// Liveness ping. Accepted and ignored.
    Keepalive,
    /// Replace the sender's reachable networks with the payload
    Reset,
    /// Same as [`BridgeControl::Reset`]; sent periodically as an advertisement
    Update,
    /// Query for the asker's own network number
    WhatNet,
    /// Query whether a network is reachable
    IsNet,
    /// Any other control code
    Other(u8),
}

impl BridgeControl {
    /// Wire value for keepalive
    pub const KEEPALIVE: u8 = 0xD0;
    /// Wire value for reset
    pub const RESET: u8 = 0x80;
    /// Wire value for update
    pub const UPDATE: u8 = 0x81;
    /// Wire value for whatnet
    pub const WHATNET: u8 = 0x82;
    /// Wire value for isnet
    pub const ISNET: u8 = 0x83;

    /// Decode a control byte.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            Self::KEEPALIVE => Self::Keepalive,
            Self::RESET => Self::Reset,
            Self::UPDATE => Self::Update,
            Self::WHATNET => Self::WhatNet,
            Self::ISNET => Self::IsNet,
            other => Self::Other(other),
        }
    }

    /// Whether this code replaces the sender's reachability set.
    pub const fn rebuilds_reachability(self) -> bool {
        matches!(self, Self::Reset | Self::Update)
    }
}
