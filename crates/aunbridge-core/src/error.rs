//! Error types for the bridging engine.
//!
//! Nothing here is fatal. Every [`BridgeError`] ends with the packet being
//! dropped or the transaction abandoned; [`ErrorClass`] decides how loudly
//! it is logged and which counter it lands in.

use std::net::SocketAddr;

use aunbridge_crypto::EnvelopeError;
use aunbridge_proto::{ProtocolError, TransactionType};
use thiserror::Error;

/// How an error is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bytes that do not parse. Dropped and counted.
    Malformed,
    /// Valid traffic with nowhere to go. Warned and counted.
    RoutingMiss,
    /// Send failure or envelope failure. Counted; a failed attempt.
    Transport,
    /// Retries used up. Aborted, never requeued.
    Exhausted,
    /// Tables disagree with each other. Logged at error level.
    Internal,
}

/// Errors raised while translating or forwarding traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Packet or frame failed to parse
    #[error("malformed packet: {0}")]
    Malformed(#[from] ProtocolError),

    /// Trunk envelope could not be sealed or opened
    #[error("trunk envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// No local station with this number
    #[error("no local station {0}")]
    UnknownLocalStation(u8),

    /// A frame reached the bridge for a remote station it does not know
    #[error("no remote station {0} although the bus accepted a frame for it")]
    UnknownRemoteStation(u8),

    /// Datagram from an address no remote station uses
    #[error("no remote station sends from {0}")]
    UnknownSender(SocketAddr),

    /// Trunk packet for a network that is not ours
    #[error("trunk packet for network {dst_net}, ours is {our_net}")]
    NotOurNetwork {
        /// Destination network in the packet
        dst_net: u8,
        /// Our network number
        our_net: u8,
    },

    /// Transaction type not valid in this position
    #[error("unexpected {0:?} packet")]
    UnexpectedType(TransactionType),

    /// Endpoint index outside the current tables
    #[error("no endpoint {0}")]
    UnknownEndpoint(usize),

    /// Datagram could not be sent
    #[error("send failed: {0}")]
    Send(String),

    /// Every attempt failed
    #[error("no acknowledgment for sequence {sequence} after {attempts} attempts")]
    RetriesExhausted {
        /// Sequence of the abandoned transaction
        sequence: u32,
        /// Attempts made
        attempts: u32,
    },
}

impl BridgeError {
    /// Handling class.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed(_) | Self::UnexpectedType(_) => ErrorClass::Malformed,
            Self::UnknownLocalStation(_) | Self::UnknownSender(_) | Self::NotOurNetwork { .. } => {
                ErrorClass::RoutingMiss
            },
            Self::Envelope(_) | Self::Send(_) => ErrorClass::Transport,
            Self::RetriesExhausted { .. } => ErrorClass::Exhausted,
            Self::UnknownRemoteStation(_) | Self::UnknownEndpoint(_) => ErrorClass::Internal,
        }
    }
}

/// Configuration that cannot be run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Network 255 is the broadcast network
    #[error("network 255 is reserved for broadcast")]
    BroadcastNetwork,

    /// Station numbers 0 and 255 are reserved
    #[error("station {0} is reserved")]
    InvalidStation(u8),

    /// The same local station appears twice
    #[error("local station {0} configured twice")]
    DuplicateStation(u8),

    /// Two local stations listen on the same port
    #[error("port {0} used by two local stations")]
    DuplicatePort(u16),

    /// The same remote station appears twice
    #[error("remote station {0} configured twice")]
    DuplicateRemoteStation(u8),

    /// Two remote stations send from the same port
    #[error("port {0} used by two remote stations")]
    DuplicateRemotePort(u16),

    /// A port is zero
    #[error("{what} {id} has port 0")]
    ZeroPort {
        /// Kind of entry
        what: &'static str,
        /// Station number or trunk index
        id: u8,
    },

    /// Trunk key is not 64 hex digits
    #[error("trunk key must be 64 hex digits")]
    InvalidKey,

    /// A timing value is out of range
    #[error("invalid timing: {0}")]
    InvalidTiming(&'static str),
}
