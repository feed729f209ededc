//! Outgoing datagrams and the sockets they leave from.

use std::net::SocketAddr;

/// One of the bridge's UDP sockets.
///
/// Every local station and every trunk owns exactly one socket. The index is
/// the entry's position in the station or trunk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    /// Socket of local station `n`
    Station(usize),
    /// Socket of trunk `n`
    Trunk(usize),
}

/// A datagram ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Socket to send from
    pub endpoint: Endpoint,
    /// Destination
    pub target: SocketAddr,
    /// Wire bytes
    pub bytes: Vec<u8>,
}
