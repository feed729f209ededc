//! Scripted link layer.
//!
//! [`SimLink`] stands in for the bus driver. It records every frame the
//! bridge transmits and answers with scripted replies. A [`SimLinkHandle`]
//! shares the same state, lets a test feed scouts and data frames to the
//! bridge, and inspects what the bridge did.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use aunbridge_core::{LinkEvent, LinkLayer, LinkReply, NetworkSet};
use aunbridge_proto::LocalFrame;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct LinkState {
    transmitted: Vec<LocalFrame>,
    replies: VecDeque<LinkReply>,
    default_reply: Option<LinkReply>,
    accepted_networks: NetworkSet,
    accepted_stations: BTreeSet<u8>,
    station_clears: usize,
    events: Option<mpsc::Sender<LinkEvent>>,
}

/// Link layer half owned by the bridge.
pub struct SimLink {
    state: Arc<Mutex<LinkState>>,
}

/// Test half of the link layer.
#[derive(Clone)]
pub struct SimLinkHandle {
    state: Arc<Mutex<LinkState>>,
}

fn lock(state: &Mutex<LinkState>) -> MutexGuard<'_, LinkState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimLink {
    /// A linked pair. Frames are acknowledged unless scripted otherwise.
    pub fn pair() -> (Self, SimLinkHandle) {
        let state = Arc::new(Mutex::new(LinkState::default()));
        (Self { state: Arc::clone(&state) }, SimLinkHandle { state })
    }
}

#[async_trait]
impl LinkLayer for SimLink {
    async fn transmit(&mut self, frame: &LocalFrame) -> LinkReply {
        let mut state = lock(&self.state);
        state.transmitted.push(frame.clone());
        let reply = state
            .replies
            .pop_front()
            .or_else(|| state.default_reply.clone())
            .unwrap_or(LinkReply::Ack);
        debug!(address = %frame.address, ?reply, "frame put on simulated bus");
        reply
    }

    async fn set_accepted_networks(&mut self, networks: &NetworkSet) {
        lock(&self.state).accepted_networks = *networks;
    }

    async fn accept_station(&mut self, station: u8) {
        lock(&self.state).accepted_stations.insert(station);
    }

    async fn clear_accepted_stations(&mut self) {
        let mut state = lock(&self.state);
        state.accepted_stations.clear();
        state.station_clears += 1;
    }
}

impl SimLinkHandle {
    /// Route bus events into `events`, usually `Bridge::link_events()`.
    pub fn attach(&self, events: mpsc::Sender<LinkEvent>) {
        lock(&self.state).events = Some(events);
    }

    /// Put a scout and its data frame on the bus, as a station sending
    /// `frame` would.
    pub async fn send_frame(&self, frame: &LocalFrame) {
        let Some(events) = lock(&self.state).events.clone() else {
            return;
        };
        let scout = frame.scout().to_bytes().to_vec();
        let mut data = frame.address.to_bytes().to_vec();
        data.extend_from_slice(&frame.payload);

        let _ = events.send(LinkEvent::Scout(scout)).await;
        let _ = events.send(LinkEvent::Data(data)).await;
    }

    /// Put a raw event on the bus.
    pub async fn send_event(&self, event: LinkEvent) {
        let events = lock(&self.state).events.clone();
        if let Some(events) = events {
            let _ = events.send(event).await;
        }
    }

    /// Answer the next transmission with `reply`.
    pub fn push_reply(&self, reply: LinkReply) {
        lock(&self.state).replies.push_back(reply);
    }

    /// Answer unscripted transmissions with `reply` instead of Ack.
    pub fn set_default_reply(&self, reply: LinkReply) {
        lock(&self.state).default_reply = Some(reply);
    }

    /// Frames the bridge put on the bus, oldest first.
    pub fn transmitted(&self) -> Vec<LocalFrame> {
        lock(&self.state).transmitted.clone()
    }

    /// Networks the receiver currently accepts.
    pub fn accepted_networks(&self) -> NetworkSet {
        lock(&self.state).accepted_networks
    }

    /// Stations the receiver currently accepts.
    pub fn accepted_stations(&self) -> Vec<u8> {
        lock(&self.state).accepted_stations.iter().copied().collect()
    }

    /// Times the accepted-station set was cleared.
    pub fn station_clears(&self) -> usize {
        lock(&self.state).station_clears
    }
}
