//! Datagram transport abstraction.
//!
//! Production binds Tokio UDP sockets, tests bind Turmoil's simulated UDP
//! sockets. Both expose the same `&self` send and receive calls, so one socket
//! can be shared by the task that sends on it and the task that reads it.

use std::{io, net::SocketAddr};

use async_trait::async_trait;

/// A bound UDP socket.
#[async_trait]
pub trait DatagramSocket: Send + Sync + 'static {
    /// Send `buf` to `target`.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram into `buf`.
    ///
    /// Must be cancel-safe: dropping the future loses no datagram.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Address the socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Factory for [`DatagramSocket`]s.
#[async_trait]
pub trait DatagramTransport: Send + Sync + 'static {
    /// Socket type produced by [`DatagramTransport::bind`].
    type Socket: DatagramSocket;

    /// Bind a socket to `addr`. Port 0 picks an ephemeral port.
    async fn bind(&self, addr: SocketAddr) -> io::Result<Self::Socket>;
}
