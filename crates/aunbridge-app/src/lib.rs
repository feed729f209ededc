//! Runtime for the AUN bridge
//!
//! Drives the sans-IO engine in `aunbridge-core` with two tasks and a
//! controller that owns them.
//!
//! # Components
//!
//! - [`Bridge`]: Controller (start, stop, reconfigure)
//! - Local-bus task: pairs scouts with data frames and runs the outbound
//!   retry loop
//! - IP task: receives on every socket, delivers to the bus, answers,
//!   advertises on trunks
//! - [`RuntimeError`]: Controller errors
//!
//! # Channels
//!
//! - Link events: bus driver (and the controller's shutdown sentinel) to the
//!   local-bus task
//! - Acknowledgments: IP task to local-bus task, bounded, never blocks the
//!   sender
//! - Routes: IP task to local-bus task, latest value wins
//! - Shutdown: controller to IP task, one shot

mod controller;
mod error;
mod ip;
mod local_bus;
mod report;
mod sockets;

pub use controller::{ACK_QUEUE_DEPTH, Bridge, LINK_EVENT_QUEUE_DEPTH};
pub use error::RuntimeError;
