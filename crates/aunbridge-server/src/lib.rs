//! Production shell for the AUN bridge
//!
//! Everything the bridge needs from the outside world, backed by the real
//! thing.
//!
//! # Components
//!
//! - [`SystemEnv`]: System clock, Tokio sleep, OS entropy
//! - [`TokioTransport`]: Tokio UDP sockets
//! - [`UdpLink`]: Link layer reached through a local link-layer daemon
//! - [`config::load`]: JSON configuration file
//! - [`ServerError`]: Startup and signal-handling errors

pub mod config;
mod env;
mod error;
pub mod link;
mod transport;

pub use env::SystemEnv;
pub use error::{LinkMessageError, ServerError};
pub use link::{LinkReader, UdpLink};
pub use transport::{TokioSocket, TokioTransport};
