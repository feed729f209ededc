//! Tokio UDP transport.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use aunbridge_core::transport::{DatagramSocket, DatagramTransport};
use tokio::net::UdpSocket;

/// Binds real UDP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTransport;

/// A Tokio UDP socket.
#[derive(Debug)]
pub struct TokioSocket(UdpSocket);

#[async_trait]
impl DatagramTransport for TokioTransport {
    type Socket = TokioSocket;

    async fn bind(&self, addr: SocketAddr) -> io::Result<TokioSocket> {
        Ok(TokioSocket(UdpSocket::bind(addr).await?))
    }
}

#[async_trait]
impl DatagramSocket for TokioSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.0.send_to(buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }
}
