//! Wire formats for the AUN bridge.
//!
//! Three formats meet in the bridge:
//!
//! - Econet frames on the local bus: a 6-byte scout followed by a data frame
//!   that repeats the scout's four address bytes ([`frame`]).
//! - AUN packets over UDP: an 8-byte header carrying transaction type, port,
//!   control and a little-endian sequence number ([`aun`]).
//! - Trunk packets between bridges: the AUN header prefixed with the full
//!   Econet addressing, carried inside an encrypted envelope ([`trunk`]).
//!
//! Reserved bridge-control codes live in [`control`].
//!
//! # Security
//!
//! Fixed headers are parsed with compile-time verified layouts via
//! `zerocopy`. Every parser checks length before touching bytes and rejects
//! unknown transaction types instead of guessing.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aun;
pub mod control;
pub mod errors;
pub mod frame;
pub mod trunk;

pub use aun::{AunHeader, AunPacket, TransactionType};
pub use control::{BRIDGE_PORT, BridgeControl};
pub use errors::{ProtocolError, Result};
pub use frame::{ECONET_MTU, FrameAddress, LocalFrame, Scout, StationAddress};
pub use trunk::{TrunkHeader, TrunkPacket};
