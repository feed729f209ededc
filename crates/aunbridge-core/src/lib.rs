//! AUN bridge core logic
//!
//! Bridging engine between an Econet local bus, AUN hosts on UDP and other
//! bridges reached over encrypted trunks, decoupled from sockets, clocks and
//! the bus driver.
//!
//! # Architecture
//!
//! The engine is split along the two I/O tasks that drive it:
//!
//! - [`outbound::Outbound`] belongs to the local-bus task. It routes frames
//!   received from the bus and hands back a [`outbound::Transmission`] whose
//!   retry loop the task drives.
//! - [`inbound::Inbound`] belongs to the IP task. It turns received datagrams
//!   into declarative [`inbound::InboundAction`]s: deliver a frame, send a
//!   reply, signal an acknowledgment or publish new routes.
//!
//! Neither half performs I/O. The runtime executes the actions, which keeps
//! the same code usable in production and under deterministic simulation.
//!
//! # Components
//!
//! - [`config`]: Configuration model and validation
//! - [`registry`]: Station tables behind [`registry::StationLookup`]
//! - [`trunk`]: Trunk tables, routes and reachability learning
//! - [`dedup`]: Per-sender duplicate suppression
//! - [`networks`]: 256-bit network set
//! - [`stats`]: Shared traffic counters
//! - [`link`]: Local-bus link layer abstraction
//! - [`transport`]: UDP socket abstraction
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`error`]: Bridge and configuration errors

pub mod config;
pub mod datagram;
pub mod dedup;
pub mod env;
pub mod error;
pub mod inbound;
pub mod link;
pub mod networks;
pub mod outbound;
pub mod registry;
pub mod stats;
pub mod transport;
pub mod trunk;

#[cfg(test)]
mod test_env;

pub use config::BridgeConfig;
pub use datagram::{Datagram, Endpoint};
pub use env::Environment;
pub use error::{BridgeError, ConfigError, ErrorClass};
pub use inbound::{Delivery, Inbound, InboundAction};
pub use link::{LinkEvent, LinkLayer, LinkReply};
pub use networks::NetworkSet;
pub use outbound::{AckKind, AckSignal, Outbound, SignalOutcome, Transmission};
pub use registry::{StationLookup, StationRegistry};
pub use stats::{BridgeStats, Counter, StatsSnapshot};
pub use trunk::{Routes, TrunkInfo};
