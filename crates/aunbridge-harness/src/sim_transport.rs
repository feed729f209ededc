//! Turmoil-based datagram transport.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use aunbridge_core::transport::{DatagramSocket, DatagramTransport};
use turmoil::net::UdpSocket;

/// Binds Turmoil's simulated UDP sockets.
///
/// Delivery, loss, latency and partitions are all under the control of the
/// enclosing `turmoil::Sim`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

/// A simulated UDP socket.
pub struct SimSocket(UdpSocket);

#[async_trait]
impl DatagramTransport for SimTransport {
    type Socket = SimSocket;

    async fn bind(&self, addr: SocketAddr) -> io::Result<SimSocket> {
        Ok(SimSocket(UdpSocket::bind(addr).await?))
    }
}

#[async_trait]
impl DatagramSocket for SimSocket {
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

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    #[test]
    fn datagram_echo() {
        let mut sim = turmoil::Builder::new().build();

        sim.host("server", || async {
            let socket = SimTransport.bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9000)).await?;
            let mut buf = [0u8; 64];
            let (n, from) = socket.recv_from(&mut buf).await?;
            socket.send_to(&buf[..n], from).await?;
            Ok(())
        });

        sim.client("client", async {
            let socket = SimTransport.bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9001)).await?;
            let server = SocketAddr::new(turmoil::lookup("server"), 9000);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            socket.send_to(b"econet", server).await?;

            let mut buf = [0u8; 64];
            let (n, from) = socket.recv_from(&mut buf).await?;
            assert_eq!(&buf[..n], b"econet");
            assert_eq!(from, server);
            Ok(())
        });

        sim.run().expect("simulation failed");
    }
}
