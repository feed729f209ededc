//! The local-bus link layer.
//!
//! Clock recovery, bit stuffing and CRC handling live outside the bridge.
//! The bridge sees two halves of the link:
//!
//! - A channel of [`LinkEvent`]s carrying frames received from the bus.
//! - A [`LinkLayer`] that puts frames on the bus and tunes which frames the
//!   receiver accepts.

use async_trait::async_trait;
use aunbridge_proto::LocalFrame;

use crate::{dedup::DeliveryResult, networks::NetworkSet};

/// Something that happened on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A scout frame, raw bytes
    Scout(Vec<u8>),
    /// A data frame, raw bytes
    Data(Vec<u8>),
    /// The bus went idle
    Idle,
    /// Stop the local-bus task. Injected by the bridge itself.
    Shutdown,
}

/// How the destination station answered a transmitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkReply {
    /// Accepted
    Ack,
    /// Not accepted, or no answer
    Nack,
    /// Answer to an immediate operation
    ImmediateReply(Vec<u8>),
}

impl LinkReply {
    /// Result recorded for duplicate suppression.
    pub const fn result(&self) -> DeliveryResult {
        match self {
            Self::Ack => DeliveryResult::Ack,
            Self::Nack => DeliveryResult::Nack,
            Self::ImmediateReply(_) => DeliveryResult::ImmediateReply,
        }
    }

    /// Reply payload. Empty unless this is an immediate reply.
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Self::ImmediateReply(payload) => payload,
            Self::Ack | Self::Nack => Vec::new(),
        }
    }
}

/// Transmit side of the bus.
#[async_trait]
pub trait LinkLayer: Send + 'static {
    /// Put a frame on the bus and wait for the destination's answer.
    async fn transmit(&mut self, frame: &LocalFrame) -> LinkReply;

    /// Accept frames addressed to any network in `networks`.
    async fn set_accepted_networks(&mut self, networks: &NetworkSet);

    /// Accept frames addressed to `station` on our network.
    async fn accept_station(&mut self, station: u8);

    /// Stop accepting frames for any station added by
    /// [`LinkLayer::accept_station`].
    async fn clear_accepted_stations(&mut self);
}
