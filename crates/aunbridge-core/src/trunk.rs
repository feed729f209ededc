//! Trunk tables and reachability learning.
//!
//! Three pieces, with three owners:
//!
//! - [`TrunkInfo`]: endpoint and key, fixed at configuration time and shared.
//! - [`TrunkTable`]: reachable networks, inbound dedup state and the
//!   advertisement countdown. Owned by the IP task.
//! - [`Routes`]: an immutable copy of every trunk's reachable networks. The IP
//!   task publishes a fresh one after each change; the local-bus task reads
//!   it to pick a trunk for outbound frames.

use std::net::SocketAddr;

use aunbridge_proto::{BridgeControl, frame::BROADCAST};
use tracing::{info, warn};

use crate::{
    config::{BridgeConfig, MAX_TRUNKS, TrunkKey},
    dedup::DedupState,
    networks::NetworkSet,
};

/// Configured trunk: where it goes and how to encrypt for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkInfo {
    /// Far bridge endpoint
    pub endpoint: SocketAddr,
    /// Local port to bind, ephemeral when `None`
    pub listen_port: Option<u16>,
    /// Pre-shared key
    pub key: TrunkKey,
}

impl TrunkInfo {
    /// Trunks from configuration, dropping entries beyond capacity.
    pub fn from_config(config: &BridgeConfig) -> Vec<Self> {
        if config.trunks.len() > MAX_TRUNKS {
            warn!(configured = config.trunks.len(), max = MAX_TRUNKS, "too many trunks, ignoring the rest");
        }
        config
            .trunks
            .iter()
            .take(MAX_TRUNKS)
            .map(|t| Self { endpoint: t.endpoint(), listen_port: t.listen_port, key: t.key.clone() })
            .collect()
    }
}

/// Snapshot of which networks each trunk reaches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Routes {
    our_net: u8,
    reachable: Vec<NetworkSet>,
}

impl Routes {
    /// No networks reachable through any of `trunk_count` trunks.
    pub fn new(our_net: u8, trunk_count: usize) -> Self {
        Self { our_net, reachable: vec![NetworkSet::new(); trunk_count] }
    }

    /// Our network number.
    pub const fn our_net(&self) -> u8 {
        self.our_net
    }

    /// Trunk to forward a frame for `dst_net` over.
    ///
    /// Network 0 and our own network are always local. Otherwise the first
    /// trunk that reaches `dst_net` wins.
    pub fn select_trunk_for(&self, dst_net: u8) -> Option<usize> {
        if dst_net == 0 || dst_net == self.our_net {
            return None;
        }
        self.reachable.iter().position(|nets| nets.contains(dst_net))
    }

    /// Networks reachable through trunk `trunk`.
    pub fn reachable(&self, trunk: usize) -> Option<&NetworkSet> {
        self.reachable.get(trunk)
    }

    /// Every network reachable through any trunk.
    pub fn aggregate(&self) -> NetworkSet {
        let mut all = NetworkSet::new();
        for nets in &self.reachable {
            all.union_with(nets);
        }
        all
    }
}

/// Effect of a bridge-control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Reachable networks were replaced
    Rebuilt,
    /// Accepted with no effect
    Ignored,
    /// Control code we do not implement
    Unhandled(u8),
}

/// Mutable per-trunk state owned by the IP task.
#[derive(Debug, Clone)]
pub struct TrunkTable {
    routes: Routes,
    dedup: Vec<DedupState>,
    countdowns: Vec<u32>,
    interval: u32,
}

impl TrunkTable {
    /// Fresh table. Every trunk advertises on the first tick.
    pub fn new(our_net: u8, trunk_count: usize, interval: u32) -> Self {
        Self {
            routes: Routes::new(our_net, trunk_count),
            dedup: vec![DedupState::new(); trunk_count],
            countdowns: vec![1; trunk_count],
            interval: interval.max(1),
        }
    }

    /// Number of trunks.
    pub fn len(&self) -> usize {
        self.dedup.len()
    }

    /// Whether there are no trunks.
    pub fn is_empty(&self) -> bool {
        self.dedup.is_empty()
    }

    /// Current routes.
    pub const fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Advance every countdown by one tick. Returns the trunks that should
    /// advertise now.
    pub fn tick(&mut self) -> Vec<usize> {
        let mut due = Vec::new();
        for (index, countdown) in self.countdowns.iter_mut().enumerate() {
            *countdown = countdown.saturating_sub(1);
            if *countdown == 0 {
                *countdown = self.interval;
                due.push(index);
            }
        }
        due
    }

    /// Apply a bridge-control packet received on trunk `trunk`.
    ///
    /// Reset and update replace the trunk's reachable networks with the
    /// payload bytes. Our own network is never added, so a peer echoing our
    /// advertisement back cannot attract our local traffic.
    pub fn apply_control(&mut self, trunk: usize, control: u8, payload: &[u8]) -> ControlOutcome {
        let Some(nets) = self.routes.reachable.get_mut(trunk) else {
            return ControlOutcome::Ignored;
        };

        match BridgeControl::from_u8(control) {
            BridgeControl::Keepalive => ControlOutcome::Ignored,
            code if code.rebuilds_reachability() => {
                nets.clear();
                for &net in payload {
                    if net != self.routes.our_net {
                        nets.insert(net);
                    }
                }
                info!(trunk, networks = ?nets, "trunk reachability updated");
                ControlOutcome::Rebuilt
            },
            _ => {
                warn!(trunk, control, "unhandled bridge control");
                ControlOutcome::Unhandled(control)
            },
        }
    }

    /// Inbound dedup state for trunk `trunk`.
    pub fn dedup_mut(&mut self, trunk: usize) -> Option<&mut DedupState> {
        self.dedup.get_mut(trunk)
    }

    /// Whether `dst_net` is addressed to us: our network or broadcast.
    pub const fn accepts_network(&self, dst_net: u8) -> bool {
        dst_net == self.routes.our_net || dst_net == BROADCAST
    }
}
