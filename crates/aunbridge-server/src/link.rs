//! Link layer reached through a local daemon.
//!
//! The daemon owns the bus hardware and talks to the bridge over UDP. Each
//! datagram is one message, tagged by its first byte.
//!
//! | Direction        | Tag    | Body                                   |
//! |------------------|--------|----------------------------------------|
//! | daemon → bridge  | `0x01` | scout frame                            |
//! | daemon → bridge  | `0x02` | data frame                             |
//! | daemon → bridge  | `0x03` | bus idle                               |
//! | daemon → bridge  | `0x11` | result (0 Ack, 1 Nack, 2 reply) ‖ data |
//! | bridge → daemon  | `0x10` | scout fields ‖ payload                 |
//! | bridge → daemon  | `0x20` | 32-byte accepted-network bitmap        |
//! | bridge → daemon  | `0x21` | clear accepted stations                |
//! | bridge → daemon  | `0x22` | station number to accept               |
//!
//! A transmit with no result within [`RESULT_TIMEOUT`] counts as a Nack.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use aunbridge_core::{LinkEvent, LinkLayer, LinkReply, NetworkSet};
use aunbridge_proto::LocalFrame;
use tokio::{net::UdpSocket, sync::mpsc};
use tracing::{debug, warn};

use crate::error::LinkMessageError;

/// How long a transmit waits for the daemon's result.
pub const RESULT_TIMEOUT: Duration = Duration::from_secs(2);

const RECV_BUFFER_SIZE: usize = 2048;
const RESULT_QUEUE_DEPTH: usize = 4;

const TAG_SCOUT: u8 = 0x01;
const TAG_DATA: u8 = 0x02;
const TAG_IDLE: u8 = 0x03;
const TAG_TRANSMIT: u8 = 0x10;
const TAG_RESULT: u8 = 0x11;
const TAG_NETWORKS: u8 = 0x20;
const TAG_CLEAR_STATIONS: u8 = 0x21;
const TAG_ACCEPT_STATION: u8 = 0x22;

/// A message from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonMessage {
    /// Something seen on the bus
    Event(LinkEvent),
    /// Outcome of the last transmit
    Result(LinkReply),
}

impl DaemonMessage {
    /// Parse one datagram.
    pub fn parse(bytes: &[u8]) -> Result<Self, LinkMessageError> {
        let (&tag, body) = bytes.split_first().ok_or(LinkMessageError::Empty)?;
        match tag {
            TAG_SCOUT => Ok(Self::Event(LinkEvent::Scout(body.to_vec()))),
            TAG_DATA => Ok(Self::Event(LinkEvent::Data(body.to_vec()))),
            TAG_IDLE => Ok(Self::Event(LinkEvent::Idle)),
            TAG_RESULT => {
                let (&code, payload) = body.split_first().ok_or(LinkMessageError::MissingResult)?;
                let reply = match code {
                    0 => LinkReply::Ack,
                    1 => LinkReply::Nack,
                    2 => LinkReply::ImmediateReply(payload.to_vec()),
                    other => return Err(LinkMessageError::UnknownResult(other)),
                };
                Ok(Self::Result(reply))
            },
            other => Err(LinkMessageError::UnknownTag(other)),
        }
    }
}

/// A command to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Put a frame on the bus
    Transmit(LocalFrame),
    /// Replace the accepted-network set
    AcceptNetworks(NetworkSet),
    /// Forget every accepted station
    ClearStations,
    /// Accept frames for a station
    AcceptStation(u8),
}

impl LinkCommand {
    /// Encode as one datagram.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Transmit(frame) => {
                let mut out = vec![TAG_TRANSMIT];
                out.extend_from_slice(&frame.encode());
                out
            },
            Self::AcceptNetworks(networks) => {
                let mut out = vec![TAG_NETWORKS];
                out.extend_from_slice(&networks.to_bytes());
                out
            },
            Self::ClearStations => vec![TAG_CLEAR_STATIONS],
            Self::AcceptStation(station) => vec![TAG_ACCEPT_STATION, *station],
        }
    }
}

/// Transmit half, handed to the bridge.
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    daemon: SocketAddr,
    results: mpsc::Receiver<LinkReply>,
}

/// Receive half. Run it on its own task with [`LinkReader::run`].
pub struct LinkReader {
    socket: Arc<UdpSocket>,
    daemon: SocketAddr,
    results: mpsc::Sender<LinkReply>,
}

impl UdpLink {
    /// Bind `local` and talk to the daemon at `daemon`.
    pub async fn bind(local: SocketAddr, daemon: SocketAddr) -> io::Result<(Self, LinkReader)> {
        let socket = Arc::new(UdpSocket::bind(local).await?);
        let (results_tx, results_rx) = mpsc::channel(RESULT_QUEUE_DEPTH);
        debug!(local = %socket.local_addr()?, %daemon, "link daemon socket bound");

        Ok((
            Self { socket: Arc::clone(&socket), daemon, results: results_rx },
            LinkReader { socket, daemon, results: results_tx },
        ))
    }

    async fn command(&self, command: &LinkCommand) -> io::Result<()> {
        self.socket.send_to(&command.encode(), self.daemon).await.map(|_| ())
    }
}

#[async_trait]
impl LinkLayer for UdpLink {
    async fn transmit(&mut self, frame: &LocalFrame) -> LinkReply {
        // A result that arrived after its transmit timed out belongs to
        // nobody.
        while self.results.try_recv().is_ok() {}

        if let Err(e) = self.command(&LinkCommand::Transmit(frame.clone())).await {
            warn!(address = %frame.address, error = %e, "transmit to link daemon failed");
            return LinkReply::Nack;
        }

        match tokio::time::timeout(RESULT_TIMEOUT, self.results.recv()).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                warn!("link reader stopped");
                LinkReply::Nack
            },
            Err(_) => {
                debug!(address = %frame.address, "no result from link daemon");
                LinkReply::Nack
            },
        }
    }

    async fn set_accepted_networks(&mut self, networks: &NetworkSet) {
        if let Err(e) = self.command(&LinkCommand::AcceptNetworks(*networks)).await {
            warn!(error = %e, "network update to link daemon failed");
        }
    }

    async fn accept_station(&mut self, station: u8) {
        if let Err(e) = self.command(&LinkCommand::AcceptStation(station)).await {
            warn!(station, error = %e, "station update to link daemon failed");
        }
    }

    async fn clear_accepted_stations(&mut self) {
        if let Err(e) = self.command(&LinkCommand::ClearStations).await {
            warn!(error = %e, "station clear to link daemon failed");
        }
    }
}

impl LinkReader {
    /// Forward bus events to `events` and results to the transmit half.
    ///
    /// Returns when `events` closes.
    pub async fn run(self, events: mpsc::Sender<LinkEvent>) {
        let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "link daemon receive failed");
                    continue;
                },
            };
            if from != self.daemon {
                debug!(%from, "datagram from unknown sender on link socket");
                continue;
            }

            match DaemonMessage::parse(&buffer[..len]) {
                Ok(DaemonMessage::Event(event)) => {
                    if events.send(event).await.is_err() {
                        debug!("bridge gone, link reader stopping");
                        return;
                    }
                },
                Ok(DaemonMessage::Result(reply)) => {
                    if self.results.try_send(reply).is_err() {
                        debug!("unsolicited link result dropped");
                    }
                },
                Err(e) => debug!(error = %e, len, "bad message from link daemon"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use aunbridge_proto::{FrameAddress, StationAddress};

    use super::*;

    fn frame() -> LocalFrame {
        LocalFrame {
            address: FrameAddress::new(StationAddress::new(0, 10), StationAddress::new(0, 200)),
            control: 0x80,
            port: 0x99,
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn parses_daemon_messages() {
        assert_eq!(
            DaemonMessage::parse(&[0x01, 10, 0, 200, 0, 0x80, 0x99]),
            Ok(DaemonMessage::Event(LinkEvent::Scout(vec![10, 0, 200, 0, 0x80, 0x99])))
        );
        assert_eq!(DaemonMessage::parse(&[0x02, 9]), Ok(DaemonMessage::Event(LinkEvent::Data(vec![9]))));
        assert_eq!(DaemonMessage::parse(&[0x03]), Ok(DaemonMessage::Event(LinkEvent::Idle)));
        assert_eq!(DaemonMessage::parse(&[0x11, 0]), Ok(DaemonMessage::Result(LinkReply::Ack)));
        assert_eq!(DaemonMessage::parse(&[0x11, 1]), Ok(DaemonMessage::Result(LinkReply::Nack)));
        assert_eq!(
            DaemonMessage::parse(&[0x11, 2, 0xAB, 0xCD]),
            Ok(DaemonMessage::Result(LinkReply::ImmediateReply(vec![0xAB, 0xCD])))
        );
    }

    #[test]
    fn rejects_bad_daemon_messages() {
        assert_eq!(DaemonMessage::parse(&[]), Err(LinkMessageError::Empty));
        assert_eq!(DaemonMessage::parse(&[0x7F]), Err(LinkMessageError::UnknownTag(0x7F)));
        assert_eq!(DaemonMessage::parse(&[0x11]), Err(LinkMessageError::MissingResult));
        assert_eq!(DaemonMessage::parse(&[0x11, 3]), Err(LinkMessageError::UnknownResult(3)));
    }

    #[test]
    fn encodes_commands() {
        assert_eq!(
            LinkCommand::Transmit(frame()).encode(),
            vec![0x10, 10, 0, 200, 0, 0x80, 0x99, 1, 2, 3]
        );

        let networks: NetworkSet = [1, 9].into_iter().collect();
        let encoded = LinkCommand::AcceptNetworks(networks).encode();
        assert_eq!(encoded.len(), 33);
        assert_eq!(encoded[0], 0x20);
        assert_eq!(encoded[1], 0b0000_0010);
        assert_eq!(encoded[2], 0b0000_0010);

        assert_eq!(LinkCommand::ClearStations.encode(), vec![0x21]);
        assert_eq!(LinkCommand::AcceptStation(200).encode(), vec![0x22, 200]);
    }

    async fn pair() -> (UdpLink, LinkReader, UdpSocket) {
        let daemon = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let (link, reader) =
            UdpLink::bind((Ipv4Addr::LOCALHOST, 0).into(), daemon.local_addr().unwrap()).await.unwrap();
        (link, reader, daemon)
    }

    #[tokio::test]
    async fn transmit_returns_daemon_result() {
        let (mut link, reader, daemon) = pair().await;
        let (events_tx, _events_rx) = mpsc::channel(4);
        tokio::spawn(reader.run(events_tx));

        let fake_daemon = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, from) = daemon.recv_from(&mut buf).await.unwrap();
            assert_eq!(buf[0], 0x10);
            assert_eq!(LocalFrame::decode(&buf[1..n]).unwrap(), frame());
            daemon.send_to(&[0x11, 2, 0x42], from).await.unwrap();
        });

        assert_eq!(link.transmit(&frame()).await, LinkReply::ImmediateReply(vec![0x42]));
        fake_daemon.await.unwrap();
    }

    #[tokio::test]
    async fn silent_daemon_is_nack() {
        let (mut link, _reader, _daemon) = pair().await;
        tokio::time::pause();
        assert_eq!(link.transmit(&frame()).await, LinkReply::Nack);
    }

    #[tokio::test]
    async fn events_reach_the_bridge() {
        let (_link, reader, daemon) = pair().await;
        let link_addr = reader.socket.local_addr().unwrap();
        let (events_tx, mut events_rx) = mpsc::channel(4);
        tokio::spawn(reader.run(events_tx));

        daemon.send_to(&[0x03], link_addr).await.unwrap();
        daemon.send_to(&[0x02, 7, 7], link_addr).await.unwrap();

        assert_eq!(events_rx.recv().await, Some(LinkEvent::Idle));
        assert_eq!(events_rx.recv().await, Some(LinkEvent::Data(vec![7, 7])));
    }

    #[tokio::test]
    async fn stranger_traffic_is_ignored() {
        let (_link, reader, daemon) = pair().await;
        let link_addr = reader.socket.local_addr().unwrap();
        let (events_tx, mut events_rx) = mpsc::channel(4);
        tokio::spawn(reader.run(events_tx));

        let stranger = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        stranger.send_to(&[0x03], link_addr).await.unwrap();
        daemon.send_to(&[0x02, 1], link_addr).await.unwrap();

        assert_eq!(events_rx.recv().await, Some(LinkEvent::Data(vec![1])));
    }
}
