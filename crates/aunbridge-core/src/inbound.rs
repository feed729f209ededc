//! IP to local bus: translation, duplicate suppression and bridge control.
//!
//! [`Inbound`] is owned by the IP task. It is the only writer of dedup state
//! and of trunk reachability, and it runs the advertisement timer. Each
//! received datagram turns into one [`InboundAction`] for the runtime to
//! carry out.
//!
//! # Flow
//!
//! 1. Trunk datagrams are opened with the trunk's key.
//! 2. Acks and Nacks become an [`AckSignal`] for the local-bus task.
//! 3. Bridge-control traffic on a trunk updates reachability.
//! 4. Data, Broadcast and Immediate packets are resolved to a sender and
//!    checked against its dedup record. New packets become a [`Delivery`];
//!    repeats of an acknowledged packet are answered at once.
//! 5. After the bus answers a delivery, [`Inbound::complete`] records the
//!    result and builds the reply.

use std::{net::SocketAddr, sync::Arc};

use aunbridge_crypto::{open, seal};
use aunbridge_proto::{
    AunPacket, FrameAddress, LocalFrame, StationAddress, TransactionType, TrunkPacket,
    frame::CONTROL_REPLY_BIT,
};
use tracing::{debug, info, warn};

use crate::{
    datagram::{Datagram, Endpoint},
    dedup::{DedupDecision, DedupState, DeliveryResult},
    env::Environment,
    error::BridgeError,
    link::LinkReply,
    outbound::{AckKind, AckSignal},
    registry::{StationLookup, StationRegistry},
    stats::{BridgeStats, Counter},
    trunk::{ControlOutcome, Routes, TrunkInfo, TrunkTable},
};

/// What the runtime should do with a received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// Hand an acknowledgment to the local-bus task
    Signal(AckSignal),
    /// Put a frame on the bus, then call [`Inbound::complete`]
    Deliver(Delivery),
    /// Send this datagram
    Send(Datagram),
    /// Trunk reachability changed; publish the routes and update the link
    /// layer's network filter
    RoutesChanged(Routes),
    /// Nothing to do
    Ignore,
}

/// A frame waiting to go on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Frame to transmit
    pub frame: LocalFrame,
    origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Station { local: usize, remote: usize, request: AunPacket },
    Trunk { trunk: usize, request: TrunkPacket },
}

/// Inbound half of the bridging engine.
#[derive(Debug)]
pub struct Inbound {
    stations: Arc<StationRegistry>,
    trunk_info: Arc<[TrunkInfo]>,
    trunks: TrunkTable,
    station_dedup: Vec<DedupState>,
    stats: Arc<BridgeStats>,
}

impl Inbound {
    /// Fresh state for the given tables.
    pub fn new(
        stations: Arc<StationRegistry>,
        trunk_info: Arc<[TrunkInfo]>,
        our_net: u8,
        advertise_interval: u32,
        stats: Arc<BridgeStats>,
    ) -> Self {
        let trunks = TrunkTable::new(our_net, trunk_info.len(), advertise_interval);
        let station_dedup = vec![DedupState::new(); stations.remotes().len()];
        Self { stations, trunk_info, trunks, station_dedup, stats }
    }

    /// Current routes.
    pub const fn routes(&self) -> &Routes {
        self.trunks.routes()
    }

    /// Process one datagram received on `endpoint` from `from`.
    pub fn handle<E: Environment>(
        &mut self,
        endpoint: Endpoint,
        from: SocketAddr,
        bytes: &[u8],
        env: &E,
    ) -> Result<InboundAction, BridgeError> {
        match endpoint {
            Endpoint::Station(local) => self.handle_station(local, from, bytes),
            Endpoint::Trunk(trunk) => self.handle_trunk(trunk, bytes, env),
        }
    }

    fn handle_station(
        &mut self,
        local: usize,
        from: SocketAddr,
        bytes: &[u8],
    ) -> Result<InboundAction, BridgeError> {
        let packet = AunPacket::parse(bytes)?;
        if let Some(signal) = self.count_and_signal(packet.transaction_type, packet.sequence)? {
            return Ok(InboundAction::Signal(signal));
        }

        // The port picks the station; the host must match as well.
        let (remote_index, remote) = self
            .stations
            .remote_station_by_source_port(from.port())
            .filter(|(_, remote)| remote.endpoint == from)
            .ok_or(BridgeError::UnknownSender(from))?;
        let local_station =
            self.stations.locals().get(local).ok_or(BridgeError::UnknownEndpoint(local))?;
        let dedup =
            self.station_dedup.get(remote_index).ok_or(BridgeError::UnknownEndpoint(remote_index))?;

        if dedup.is_out_of_order(packet.sequence) {
            self.stats.incr(Counter::RxOutOfOrder);
            warn!(sequence = packet.sequence, from = %from, "out-of-order delivery from station");
        }
        if let DedupDecision::Repeat(result) = dedup.check(packet.sequence) {
            debug!(sequence = packet.sequence, from = %from, "re-acknowledging duplicate");
            let reply = self.station_reply(&packet, result, Vec::new());
            return Ok(InboundAction::Send(Datagram {
                endpoint: Endpoint::Station(local),
                target: remote.endpoint,
                bytes: reply.encode(),
            }));
        }

        let broadcast = packet.transaction_type == TransactionType::Broadcast;
        let (dst, control) = if broadcast {
            (StationAddress::BROADCAST, packet.control)
        } else {
            (StationAddress::new(0, local_station.station), packet.control | CONTROL_REPLY_BIT)
        };
        let frame = LocalFrame {
            address: FrameAddress::new(dst, StationAddress::new(remote.network, remote.station)),
            control,
            port: packet.port,
            payload: packet.payload.clone(),
        };

        let mut request = packet;
        request.payload.clear();
        Ok(InboundAction::Deliver(Delivery {
            frame,
            origin: Origin::Station { local, remote: remote_index, request },
        }))
    }

    fn handle_trunk<E: Environment>(
        &mut self,
        trunk: usize,
        bytes: &[u8],
        env: &E,
    ) -> Result<InboundAction, BridgeError> {
        let info = self.trunk_info.get(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
        let plaintext = open(info.key.as_bytes(), bytes)?;
        let packet = TrunkPacket::parse(&plaintext)?;

        if packet.is_bridge_control() {
            self.stats.incr(Counter::RxBridgeControl);
            return Ok(match self.trunks.apply_control(trunk, packet.control, &packet.payload) {
                ControlOutcome::Rebuilt => InboundAction::RoutesChanged(self.trunks.routes().clone()),
                ControlOutcome::Ignored | ControlOutcome::Unhandled(_) => InboundAction::Ignore,
            });
        }

        if let Some(signal) = self.count_and_signal(packet.transaction_type, packet.sequence)? {
            return Ok(InboundAction::Signal(signal));
        }

        let our_net = self.trunks.routes().our_net();
        if !self.trunks.accepts_network(packet.address.dst.net) {
            return Err(BridgeError::NotOurNetwork { dst_net: packet.address.dst.net, our_net });
        }

        let dedup = self.trunks.dedup_mut(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
        if dedup.is_out_of_order(packet.sequence) {
            self.stats.incr(Counter::RxOutOfOrder);
            warn!(sequence = packet.sequence, trunk, "out-of-order delivery from trunk");
        }
        if let DedupDecision::Repeat(result) = dedup.check(packet.sequence) {
            debug!(sequence = packet.sequence, trunk, "re-acknowledging duplicate");
            let datagram = self.trunk_reply(trunk, &packet, result, Vec::new(), env)?;
            return Ok(InboundAction::Send(datagram));
        }

        let frame = LocalFrame {
            address: FrameAddress::new(
                StationAddress::new(0, packet.address.dst.station),
                packet.address.src,
            ),
            control: packet.control,
            port: packet.port,
            payload: packet.payload.clone(),
        };

        let mut request = packet;
        request.payload.clear();
        Ok(InboundAction::Deliver(Delivery { frame, origin: Origin::Trunk { trunk, request } }))
    }

    /// Count the packet by type. Acks and Nacks become a signal; unexpected
    /// types are an error.
    fn count_and_signal(
        &self,
        transaction_type: TransactionType,
        sequence: u32,
    ) -> Result<Option<AckSignal>, BridgeError> {
        let kind = match transaction_type {
            TransactionType::Ack => {
                self.stats.incr(Counter::RxAck);
                AckKind::Ack
            },
            TransactionType::Nack => {
                self.stats.incr(Counter::RxNack);
                AckKind::Nack
            },
            TransactionType::Data => {
                self.stats.incr(Counter::RxData);
                return Ok(None);
            },
            TransactionType::Broadcast => {
                self.stats.incr(Counter::RxBroadcast);
                return Ok(None);
            },
            TransactionType::Immediate => {
                self.stats.incr(Counter::RxImmediate);
                return Ok(None);
            },
            TransactionType::ImmediateReply => {
                self.stats.incr(Counter::RxUnknown);
                return Err(BridgeError::UnexpectedType(transaction_type));
            },
        };
        Ok(Some(AckSignal { sequence, kind }))
    }

    /// Record the bus's answer to `delivery` and build the reply datagram.
    pub fn complete<E: Environment>(
        &mut self,
        delivery: Delivery,
        reply: LinkReply,
        env: &E,
    ) -> Result<Datagram, BridgeError> {
        let result = reply.result();
        let payload = reply.into_payload();

        match delivery.origin {
            Origin::Station { local, remote, request } => {
                let dedup =
                    self.station_dedup.get_mut(remote).ok_or(BridgeError::UnknownEndpoint(remote))?;
                dedup.record(request.sequence, result);

                let target = self
                    .stations
                    .remotes()
                    .get(remote)
                    .ok_or(BridgeError::UnknownEndpoint(remote))?
                    .endpoint;
                info!(
                    sequence = request.sequence,
                    to = %delivery.frame.address.dst,
                    from = %delivery.frame.address.src,
                    ?result,
                    "delivered from station"
                );
                let reply = self.station_reply(&request, result, payload);
                Ok(Datagram { endpoint: Endpoint::Station(local), target, bytes: reply.encode() })
            },
            Origin::Trunk { trunk, request } => {
                let dedup = self.trunks.dedup_mut(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
                dedup.record(request.sequence, result);

                info!(
                    sequence = request.sequence,
                    trunk,
                    to = %delivery.frame.address.dst,
                    from = %delivery.frame.address.src,
                    ?result,
                    "delivered from trunk"
                );
                self.trunk_reply(trunk, &request, result, payload, env)
            },
        }
    }

    /// Advance advertisement timers. Returns sealed advertisements for every
    /// trunk whose countdown fired.
    pub fn tick<E: Environment>(&mut self, env: &E) -> Vec<Datagram> {
        let our_net = self.trunks.routes().our_net();
        let advert = TrunkPacket::advertisement(our_net).encode();

        let mut out = Vec::new();
        for trunk in self.trunks.tick() {
            let Some(info) = self.trunk_info.get(trunk) else {
                continue;
            };
            match seal(info.key.as_bytes(), &env.random_iv(), &advert) {
                Ok(bytes) => {
                    self.stats.incr(Counter::TxBridgeControl);
                    out.push(Datagram { endpoint: Endpoint::Trunk(trunk), target: info.endpoint, bytes });
                },
                Err(e) => self.stats.record_error(&BridgeError::Envelope(e)),
            }
        }
        out
    }

    fn station_reply(
        &self,
        request: &AunPacket,
        result: DeliveryResult,
        payload: Vec<u8>,
    ) -> AunPacket {
        AunPacket::reply_to(request, self.reply_type(result), payload)
    }

    fn trunk_reply<E: Environment>(
        &self,
        trunk: usize,
        request: &TrunkPacket,
        result: DeliveryResult,
        payload: Vec<u8>,
        env: &E,
    ) -> Result<Datagram, BridgeError> {
        let info = self.trunk_info.get(trunk).ok_or(BridgeError::UnknownEndpoint(trunk))?;
        let reply = TrunkPacket::reply_to(request, self.reply_type(result), payload);
        let bytes = seal(info.key.as_bytes(), &env.random_iv(), &reply.encode())?;
        Ok(Datagram { endpoint: Endpoint::Trunk(trunk), target: info.endpoint, bytes })
    }

    fn reply_type(&self, result: DeliveryResult) -> TransactionType {
        match result {
            DeliveryResult::Ack => {
                self.stats.incr(Counter::TxAck);
                TransactionType::Ack
            },
            DeliveryResult::ImmediateReply => {
                self.stats.incr(Counter::TxAck);
                TransactionType::ImmediateReply
            },
            DeliveryResult::Nack => {
                self.stats.incr(Counter::TxNack);
                TransactionType::Nack
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use aunbridge_proto::{BridgeControl, frame::BROADCAST};

    use super::*;
    use crate::{
        config::{BridgeConfig, LocalStationConfig, RemoteStationConfig, TrunkKey},
        test_env::TestEnv,
    };

    const KEY: [u8; 32] = [0x5A; 32];
    const REMOTE: &str = "10.0.0.2:40000";

    fn inbound() -> Inbound {
        let registry = StationRegistry::from_config(&BridgeConfig {
            local_stations: vec![LocalStationConfig { station: 10, listen_port: 32768 }],
            remote_stations: vec![RemoteStationConfig {
                station: 200,
                network: 0,
                address: "10.0.0.2".parse().unwrap(),
                port: 40000,
            }],
            ..BridgeConfig::default()
        });
        let trunks: Arc<[TrunkInfo]> = vec![TrunkInfo {
            endpoint: "198.51.100.1:9000".parse().unwrap(),
            listen_port: Some(9000),
            key: TrunkKey::new(KEY),
        }]
        .into();
        Inbound::new(Arc::new(registry), trunks, 88, 10, Arc::new(BridgeStats::new()))
    }

    fn remote() -> SocketAddr {
        REMOTE.parse().unwrap()
    }

    fn data(sequence: u32) -> Vec<u8> {
        AunPacket::data(0x99, 0x00, sequence, vec![1, 2, 3]).encode()
    }

    fn sealed(packet: &TrunkPacket) -> Vec<u8> {
        seal(&KEY, &[7; 16], &packet.encode()).unwrap()
    }

    fn trunk_data(dst: StationAddress, sequence: u32) -> TrunkPacket {
        TrunkPacket {
            address: FrameAddress::new(dst, StationAddress::new(5, 20)),
            transaction_type: TransactionType::Data,
            port: 0x99,
            control: 0x85,
            sequence,
            payload: vec![9],
        }
    }

    fn expect_delivery(action: InboundAction) -> Delivery {
        match action {
            InboundAction::Deliver(delivery) => delivery,
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn station_data_is_delivered_with_reply_bit() {
        let mut inbound = inbound();
        let action = inbound.handle(Endpoint::Station(0), remote(), &data(4), &TestEnv::new()).unwrap();
        let delivery = expect_delivery(action);

        assert_eq!(delivery.frame.address.dst, StationAddress::new(0, 10));
        assert_eq!(delivery.frame.address.src, StationAddress::new(0, 200));
        assert_eq!(delivery.frame.control, 0x80);
        assert_eq!(delivery.frame.port, 0x99);
        assert_eq!(delivery.frame.payload, vec![1, 2, 3]);
    }

    #[test]
    fn completion_acks_to_configured_endpoint() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let delivery = expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap());

        let reply = inbound.complete(delivery, LinkReply::Ack, &env).unwrap();
        assert_eq!(reply.endpoint, Endpoint::Station(0));
        assert_eq!(reply.target, remote());
        let ack = AunPacket::parse(&reply.bytes).unwrap();
        assert_eq!(ack.transaction_type, TransactionType::Ack);
        assert_eq!(ack.sequence, 4);
        assert!(ack.payload.is_empty());
    }

    #[test]
    fn duplicate_after_ack_is_reacked_without_delivery() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let delivery = expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap());
        inbound.complete(delivery, LinkReply::Ack, &env).unwrap();

        match inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap() {
            InboundAction::Send(datagram) => {
                let ack = AunPacket::parse(&datagram.bytes).unwrap();
                assert_eq!(ack.transaction_type, TransactionType::Ack);
                assert_eq!(ack.sequence, 4);
            },
            other => panic!("expected re-ack, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_after_nack_is_redelivered() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let delivery = expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap());
        let reply = inbound.complete(delivery, LinkReply::Nack, &env).unwrap();
        assert_eq!(AunPacket::parse(&reply.bytes).unwrap().transaction_type, TransactionType::Nack);

        let action = inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap();
        assert!(matches!(action, InboundAction::Deliver(_)));
    }

    #[test]
    fn immediate_reply_carries_payload() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let request = AunPacket {
            transaction_type: TransactionType::Immediate,
            port: 0,
            control: 0x88,
            sequence: 12,
            payload: Vec::new(),
        };
        let delivery =
            expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &request.encode(), &env).unwrap());
        let reply = inbound.complete(delivery, LinkReply::ImmediateReply(vec![0xAB, 0xCD]), &env).unwrap();

        let packet = AunPacket::parse(&reply.bytes).unwrap();
        assert_eq!(packet.transaction_type, TransactionType::ImmediateReply);
        assert_eq!(packet.payload, vec![0xAB, 0xCD]);
        assert_eq!(inbound.stats.snapshot().tx_ack_count, 1);
    }

    #[test]
    fn broadcast_goes_to_everyone_without_reply_bit() {
        let mut inbound = inbound();
        let packet = AunPacket {
            transaction_type: TransactionType::Broadcast,
            port: 0x99,
            control: 0x01,
            sequence: 8,
            payload: vec![1],
        };
        let delivery = expect_delivery(
            inbound.handle(Endpoint::Station(0), remote(), &packet.encode(), &TestEnv::new()).unwrap(),
        );
        assert_eq!(delivery.frame.address.dst, StationAddress::BROADCAST);
        assert_eq!(delivery.frame.control, 0x01);
    }

    #[test]
    fn ack_becomes_signal() {
        let mut inbound = inbound();
        let ack = AunPacket {
            transaction_type: TransactionType::Ack,
            port: 0x99,
            control: 0,
            sequence: 16,
            payload: Vec::new(),
        };
        let action = inbound.handle(Endpoint::Station(0), remote(), &ack.encode(), &TestEnv::new()).unwrap();
        assert_eq!(action, InboundAction::Signal(AckSignal { sequence: 16, kind: AckKind::Ack }));
    }

    #[test]
    fn unknown_sender_port_is_dropped() {
        let mut inbound = inbound();
        let stranger: SocketAddr = "10.0.0.2:40001".parse().unwrap();
        let result = inbound.handle(Endpoint::Station(0), stranger, &data(4), &TestEnv::new());
        assert_eq!(result, Err(BridgeError::UnknownSender(stranger)));
    }

    #[test]
    fn known_port_from_another_host_is_dropped() {
        let mut inbound = inbound();
        let impostor: SocketAddr = "10.0.0.3:40000".parse().unwrap();
        let result = inbound.handle(Endpoint::Station(0), impostor, &data(4), &TestEnv::new());
        assert_eq!(result, Err(BridgeError::UnknownSender(impostor)));
        assert_eq!(inbound.station_dedup[0], DedupState::new());
    }

    #[test]
    fn backwards_sequence_is_reported_and_delivered() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let first = expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &data(8), &env).unwrap());
        inbound.complete(first, LinkReply::Ack, &env).unwrap();
        assert_eq!(inbound.stats.snapshot().rx_out_of_order_count, 0);

        let late = expect_delivery(inbound.handle(Endpoint::Station(0), remote(), &data(4), &env).unwrap());
        assert_eq!(late.frame.payload, vec![1, 2, 3]);
        assert_eq!(inbound.stats.snapshot().rx_out_of_order_count, 1);
    }

    #[test]
    fn backwards_trunk_sequence_is_reported_and_delivered() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let first = sealed(&trunk_data(StationAddress::new(88, 10), 8));
        let delivery = expect_delivery(inbound.handle(Endpoint::Trunk(0), remote(), &first, &env).unwrap());
        inbound.complete(delivery, LinkReply::Ack, &env).unwrap();

        let late = sealed(&trunk_data(StationAddress::new(88, 10), 4));
        expect_delivery(inbound.handle(Endpoint::Trunk(0), remote(), &late, &env).unwrap());
        assert_eq!(inbound.stats.snapshot().rx_out_of_order_count, 1);
    }

    #[test]
    fn immediate_reply_on_station_is_unknown() {
        let mut inbound = inbound();
        let packet = AunPacket {
            transaction_type: TransactionType::ImmediateReply,
            port: 0,
            control: 0,
            sequence: 1,
            payload: Vec::new(),
        };
        let result = inbound.handle(Endpoint::Station(0), remote(), &packet.encode(), &TestEnv::new());
        assert_eq!(result, Err(BridgeError::UnexpectedType(TransactionType::ImmediateReply)));
        assert_eq!(inbound.stats.snapshot().rx_unknown_count, 1);
    }

    #[test]
    fn trunk_data_is_delivered_to_local_station() {
        let mut inbound = inbound();
        let bytes = sealed(&trunk_data(StationAddress::new(88, 10), 4));
        let delivery = expect_delivery(inbound.handle(Endpoint::Trunk(0), remote(), &bytes, &TestEnv::new()).unwrap());

        assert_eq!(delivery.frame.address.dst, StationAddress::new(0, 10));
        assert_eq!(delivery.frame.address.src, StationAddress::new(5, 20));
        assert_eq!(delivery.frame.control, 0x85);
    }

    #[test]
    fn trunk_reply_swaps_addresses_and_is_sealed() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let bytes = sealed(&trunk_data(StationAddress::new(88, 10), 4));
        let delivery = expect_delivery(inbound.handle(Endpoint::Trunk(0), remote(), &bytes, &env).unwrap());

        let reply = inbound.complete(delivery, LinkReply::Ack, &env).unwrap();
        assert_eq!(reply.target, "198.51.100.1:9000".parse::<SocketAddr>().unwrap());
        let packet = TrunkPacket::parse(&open(&KEY, &reply.bytes).unwrap()).unwrap();
        assert_eq!(packet.transaction_type, TransactionType::Ack);
        assert_eq!(packet.address.dst, StationAddress::new(5, 20));
        assert_eq!(packet.address.src, StationAddress::new(88, 10));
        assert_eq!(packet.sequence, 4);
    }

    #[test]
    fn trunk_packet_for_other_network_is_dropped() {
        let mut inbound = inbound();
        let bytes = sealed(&trunk_data(StationAddress::new(7, 10), 4));
        let result = inbound.handle(Endpoint::Trunk(0), remote(), &bytes, &TestEnv::new());
        assert_eq!(result, Err(BridgeError::NotOurNetwork { dst_net: 7, our_net: 88 }));
    }

    #[test]
    fn trunk_broadcast_network_is_accepted() {
        let mut inbound = inbound();
        let bytes = sealed(&trunk_data(StationAddress::new(BROADCAST, 10), 4));
        let action = inbound.handle(Endpoint::Trunk(0), remote(), &bytes, &TestEnv::new()).unwrap();
        assert!(matches!(action, InboundAction::Deliver(_)));
    }

    #[test]
    fn trunk_update_changes_routes() {
        let mut inbound = inbound();
        let mut update = TrunkPacket::advertisement(5);
        update.payload = vec![5, 9, 88];
        let action = inbound.handle(Endpoint::Trunk(0), remote(), &sealed(&update), &TestEnv::new()).unwrap();

        match action {
            InboundAction::RoutesChanged(routes) => {
                assert_eq!(routes.aggregate().iter().collect::<Vec<_>>(), vec![5, 9]);
            },
            other => panic!("expected routes change, got {other:?}"),
        }
        assert_eq!(inbound.routes().select_trunk_for(9), Some(0));
    }

    #[test]
    fn trunk_keepalive_is_ignored() {
        let mut inbound = inbound();
        let mut keepalive = TrunkPacket::advertisement(5);
        keepalive.control = BridgeControl::KEEPALIVE;
        let action =
            inbound.handle(Endpoint::Trunk(0), remote(), &sealed(&keepalive), &TestEnv::new()).unwrap();
        assert_eq!(action, InboundAction::Ignore);
        assert_eq!(inbound.stats.snapshot().rx_bridge_control, 1);
    }

    #[test]
    fn garbage_on_trunk_is_envelope_error() {
        let mut inbound = inbound();
        let result = inbound.handle(Endpoint::Trunk(0), remote(), &[1u8; 48], &TestEnv::new());
        assert!(matches!(result, Err(BridgeError::Envelope(_))));
    }

    #[test]
    fn tick_advertises_our_network() {
        let mut inbound = inbound();
        let env = TestEnv::new();
        let adverts = inbound.tick(&env);
        assert_eq!(adverts.len(), 1);

        let packet = TrunkPacket::parse(&open(&KEY, &adverts[0].bytes).unwrap()).unwrap();
        assert_eq!(packet, TrunkPacket::advertisement(88));
        assert!(inbound.tick(&env).is_empty());
    }
}
