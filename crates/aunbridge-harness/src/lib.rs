//! Deterministic simulation harness for AUN bridge testing.
//!
//! This crate provides Turmoil-based implementations of the `Environment`
//! and `DatagramTransport` traits plus a scripted link layer, so the whole
//! bridge runtime can be exercised with virtual time and simulated UDP.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_env;
pub mod sim_link;
pub mod sim_transport;

pub use sim_env::SimEnv;
pub use sim_link::{SimLink, SimLinkHandle};
pub use sim_transport::{SimSocket, SimTransport};
