//! Local bus to IP: translation and the retry state machine.
//!
//! # Flow
//!
//! 1. A validated scout and data pair arrives as a [`LocalFrame`].
//! 2. [`Outbound::prepare`] routes it: to a trunk if one reaches the
//!    destination network, otherwise to the remote station named by the
//!    destination station number, sent from the source station's socket.
//! 3. The caller drives the returned [`Transmission`]: send, wait for an
//!    acknowledgment, feed it to [`Transmission::on_signal`], and resend the
//!    same datagram until it completes or [`Transmission::begin_attempt`]
//!    reports that attempts are exhausted.
//!
//! # Invariants
//!
//! - One transaction at a time. [`Outbound`] is owned by the local-bus task.
//! - Sequence numbers advance by 4 per transaction, never per attempt. The
//!   bridge counter and each trunk counter advance independently.
//! - Every attempt sends byte-identical datagrams.

use aunbridge_crypto::seal;
use aunbridge_proto::{
    AunPacket, LocalFrame, StationAddress, TransactionType, TrunkPacket,
    frame::CONTROL_REPLY_BIT,
};
use tracing::debug;

use crate::{
    datagram::{Datagram, Endpoint},
    env::Environment,
    error::BridgeError,
    registry::StationLookup,
    trunk::{Routes, TrunkInfo},
};

/// Sequence step between transactions.
pub const SEQUENCE_STEP: u32 = 4;

/// Kind of acknowledgment received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    /// Delivered
    Ack,
    /// Refused
    Nack,
}

/// An acknowledgment passed from the IP task to the local-bus task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckSignal {
    /// Sequence echoed by the far end
    pub sequence: u32,
    /// Ack or Nack
    pub kind: AckKind,
}

/// Result of offering a signal to a [`Transmission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The awaited sequence; the transaction is over
    Complete(AckKind),
    /// Some other sequence; counts as a failed attempt
    Stale,
}

/// Outbound sequence counters.
#[derive(Debug, Clone)]
pub struct Outbound {
    bridge_sequence: u32,
    trunk_sequences: Vec<u32>,
    max_attempts: u32,
}

impl Outbound {
    /// Counters at zero for `trunk_count` trunks.
    pub fn new(trunk_count: usize, max_attempts: u32) -> Self {
        Self { bridge_sequence: 0, trunk_sequences: vec![0; trunk_count], max_attempts }
    }

    /// Route `frame` and build the datagram every attempt will send.
    pub fn prepare<E: Environment, L: StationLookup>(
        &mut self,
        frame: &LocalFrame,
        stations: &L,
        routes: &Routes,
        trunks: &[TrunkInfo],
        env: &E,
    ) -> Result<Transmission<E::Instant>, BridgeError> {
        if let Some(trunk) = routes.select_trunk_for(frame.address.dst.net) {
            return self.prepare_trunk(frame, trunk, routes.our_net(), trunks, env);
        }

        let (local, _) = stations
            .local_station_by_id(frame.address.src.station)
            .ok_or(BridgeError::UnknownLocalStation(frame.address.src.station))?;
        let (_, remote) = stations
            .remote_station_by_id(frame.address.dst.station)
            .ok_or(BridgeError::UnknownRemoteStation(frame.address.dst.station))?;

        self.bridge_sequence = self.bridge_sequence.wrapping_add(SEQUENCE_STEP);
        let packet = AunPacket::data(
            frame.port,
            frame.control & !CONTROL_REPLY_BIT,
            self.bridge_sequence,
            frame.payload.clone(),
        );

        debug!(
            sequence = self.bridge_sequence,
            from = frame.address.src.station,
            to = %remote.endpoint,
            port = frame.port,
            len = frame.payload.len(),
            "station transmission prepared"
        );

        Ok(Transmission::new(
            Datagram { endpoint: Endpoint::Station(local), target: remote.endpoint, bytes: packet.encode() },
            self.bridge_sequence,
            self.max_attempts,
            env.now(),
        ))
    }

    fn prepare_trunk<E: Environment>(
        &mut self,
        frame: &LocalFrame,
        trunk: usize,
        our_net: u8,
        trunks: &[TrunkInfo],
        env: &E,
    ) -> Result<Transmission<E::Instant>, BridgeError> {
        let info = trunks.get(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
        let counter =
            self.trunk_sequences.get_mut(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
        *counter = counter.wrapping_add(SEQUENCE_STEP);
        let sequence = *counter;

        let mut address = frame.address;
        address.src = StationAddress::new(our_net, frame.address.src.station);
        let packet = TrunkPacket {
            address,
            transaction_type: TransactionType::Data,
            port: frame.port,
            control: frame.control,
            sequence,
            payload: frame.payload.clone(),
        };
        let bytes = seal(info.key.as_bytes(), &env.random_iv(), &packet.encode())?;

        debug!(sequence, trunk, to = %frame.address.dst, port = frame.port, "trunk transmission prepared");

        Ok(Transmission::new(
            Datagram { endpoint: Endpoint::Trunk(trunk), target: info.endpoint, bytes },
            sequence,
            self.max_attempts,
            env.now(),
        ))
    }
}

/// One outbound transaction.
#[derive(Debug, Clone)]
pub struct Transmission<I> {
    datagram: Datagram,
    sequence: u32,
    attempts: u32,
    max_attempts: u32,
    started: I,
}

impl<I: Copy> Transmission<I> {
    fn new(datagram: Datagram, sequence: u32, max_attempts: u32, started: I) -> Self {
        Self { datagram, sequence, attempts: 0, max_attempts, started }
    }

    /// Start the next attempt. Returns the datagram to send, or `None` when
    /// every attempt has been used.
    pub fn begin_attempt(&mut self) -> Option<&Datagram> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(&self.datagram)
    }

    /// Offer an acknowledgment.
    pub fn on_signal(&self, signal: AckSignal) -> SignalOutcome {
        if signal.sequence == self.sequence {
            SignalOutcome::Complete(signal.kind)
        } else {
            SignalOutcome::Stale
        }
    }

    /// Sequence number of this transaction.
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Attempts started so far.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Where the datagram goes.
    pub const fn datagram(&self) -> &Datagram {
        &self.datagram
    }

    /// When the transaction was prepared.
    pub const fn started(&self) -> I {
        self.started
    }

    /// Error describing an exhausted transaction.
    pub const fn exhausted(&self) -> BridgeError {
        BridgeError::RetriesExhausted { sequence: self.sequence, attempts: self.attempts }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use aunbridge_crypto::open;
    use aunbridge_proto::{FrameAddress, frame::BROADCAST};

    use super::*;
    use crate::{
        config::{BridgeConfig, LocalStationConfig, RemoteStationConfig, TrunkKey},
        registry::StationRegistry,
        test_env::TestEnv,
        trunk::TrunkTable,
    };

    const KEY: [u8; 32] = [0x33; 32];

    fn registry() -> StationRegistry {
        StationRegistry::from_config(&BridgeConfig {
            local_stations: vec![LocalStationConfig { station: 10, listen_port: 32768 }],
            remote_stations: vec![RemoteStationConfig {
                station: 200,
                network: 0,
                address: "10.0.0.2".parse().unwrap(),
                port: 32768,
            }],
            ..BridgeConfig::default()
        })
    }

    fn trunks() -> Vec<TrunkInfo> {
        vec![TrunkInfo {
            endpoint: "198.51.100.1:9000".parse().unwrap(),
            listen_port: None,
            key: TrunkKey::new(KEY),
        }]
    }

    fn frame(dst: StationAddress, control: u8) -> LocalFrame {
        LocalFrame {
            address: FrameAddress::new(dst, StationAddress::new(0, 10)),
            control,
            port: 0x99,
            payload: vec![0xDE, 0xAD],
        }
    }

    #[test]
    fn station_frame_becomes_aun_data() {
        let mut outbound = Outbound::new(0, 5);
        let routes = Routes::new(88, 0);
        let mut tx = outbound
            .prepare(&frame(StationAddress::new(0, 200), 0x80), &registry(), &routes, &[], &TestEnv::new())
            .unwrap();

        let datagram = tx.begin_attempt().unwrap().clone();
        assert_eq!(datagram.endpoint, Endpoint::Station(0));
        assert_eq!(datagram.target, "10.0.0.2:32768".parse::<SocketAddr>().unwrap());

        let packet = AunPacket::parse(&datagram.bytes).unwrap();
        assert_eq!(packet.transaction_type, TransactionType::Data);
        assert_eq!(packet.port, 0x99);
        assert_eq!(packet.control, 0x00);
        assert_eq!(packet.sequence, 4);
        assert_eq!(packet.payload, vec![0xDE, 0xAD]);
    }

    #[test]
    fn sequence_steps_by_four_per_transaction() {
        let mut outbound = Outbound::new(0, 5);
        let routes = Routes::new(88, 0);
        let env = TestEnv::new();
        let sequences: Vec<u32> = (0..3)
            .map(|_| {
                outbound
                    .prepare(&frame(StationAddress::new(0, 200), 0x80), &registry(), &routes, &[], &env)
                    .unwrap()
                    .sequence()
            })
            .collect();
        assert_eq!(sequences, vec![4, 8, 12]);
    }

    #[test]
    fn attempts_repeat_identical_bytes_until_exhausted() {
        let mut outbound = Outbound::new(0, 5);
        let routes = Routes::new(88, 0);
        let mut tx = outbound
            .prepare(&frame(StationAddress::new(0, 200), 0x80), &registry(), &routes, &[], &TestEnv::new())
            .unwrap();

        let first = tx.begin_attempt().unwrap().bytes.clone();
        for _ in 1..5 {
            assert_eq!(tx.begin_attempt().unwrap().bytes, first);
        }
        assert!(tx.begin_attempt().is_none());
        assert_eq!(tx.attempts(), 5);
        assert_eq!(tx.exhausted(), BridgeError::RetriesExhausted { sequence: 4, attempts: 5 });
    }

    #[test]
    fn only_matching_sequence_completes() {
        let mut outbound = Outbound::new(0, 5);
        let routes = Routes::new(88, 0);
        let tx = outbound
            .prepare(&frame(StationAddress::new(0, 200), 0x80), &registry(), &routes, &[], &TestEnv::new())
            .unwrap();

        assert_eq!(tx.on_signal(AckSignal { sequence: 0, kind: AckKind::Ack }), SignalOutcome::Stale);
        assert_eq!(
            tx.on_signal(AckSignal { sequence: 4, kind: AckKind::Nack }),
            SignalOutcome::Complete(AckKind::Nack)
        );
    }

    #[test]
    fn unknown_source_is_routing_miss() {
        let mut outbound = Outbound::new(0, 5);
        let mut f = frame(StationAddress::new(0, 200), 0x80);
        f.address.src.station = 11;
        let result = outbound.prepare(&f, &registry(), &Routes::new(88, 0), &[], &TestEnv::new());
        assert_eq!(result.unwrap_err(), BridgeError::UnknownLocalStation(11));
    }

    #[test]
    fn unknown_destination_is_internal_error() {
        let mut outbound = Outbound::new(0, 5);
        let result = outbound.prepare(
            &frame(StationAddress::new(0, 201), 0x80),
            &registry(),
            &Routes::new(88, 0),
            &[],
            &TestEnv::new(),
        );
        assert_eq!(result.unwrap_err(), BridgeError::UnknownRemoteStation(201));
        // A failed lookup does not consume a sequence number.
        let tx = outbound
            .prepare(&frame(StationAddress::new(0, 200), 0), &registry(), &Routes::new(88, 0), &[], &TestEnv::new())
            .unwrap();
        assert_eq!(tx.sequence(), 4);
    }

    #[test]
    fn remote_network_goes_over_trunk_with_full_control() {
        let mut table = TrunkTable::new(88, 1, 10);
        table.apply_control(0, aunbridge_proto::BridgeControl::UPDATE, &[5]);
        let mut outbound = Outbound::new(1, 5);

        let mut tx = outbound
            .prepare(&frame(StationAddress::new(5, 20), 0x85), &registry(), table.routes(), &trunks(), &TestEnv::new())
            .unwrap();
        let datagram = tx.begin_attempt().unwrap();
        assert_eq!(datagram.endpoint, Endpoint::Trunk(0));

        let packet = TrunkPacket::parse(&open(&KEY, &datagram.bytes).unwrap()).unwrap();
        assert_eq!(packet.address.dst, StationAddress::new(5, 20));
        assert_eq!(packet.address.src, StationAddress::new(88, 10));
        assert_eq!(packet.control, 0x85);
        assert_eq!(packet.sequence, 4);
    }

    #[test]
    fn trunk_and_bridge_counters_are_independent() {
        let mut table = TrunkTable::new(88, 1, 10);
        table.apply_control(0, aunbridge_proto::BridgeControl::UPDATE, &[5]);
        let mut outbound = Outbound::new(1, 5);
        let env = TestEnv::new();

        let t1 = outbound.prepare(&frame(StationAddress::new(5, 20), 0), &registry(), table.routes(), &trunks(), &env);
        let s1 = outbound.prepare(&frame(StationAddress::new(0, 200), 0), &registry(), table.routes(), &trunks(), &env);
        let t2 = outbound.prepare(&frame(StationAddress::new(5, 20), 0), &registry(), table.routes(), &trunks(), &env);

        assert_eq!(t1.unwrap().sequence(), 4);
        assert_eq!(s1.unwrap().sequence(), 4);
        assert_eq!(t2.unwrap().sequence(), 8);
    }

    #[test]
    fn broadcast_network_without_trunk_is_local() {
        let routes = Routes::new(88, 0);
        assert_eq!(routes.select_trunk_for(BROADCAST), None);
    }
}
