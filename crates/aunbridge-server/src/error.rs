//! Server errors.

use std::{io, path::PathBuf};

use aunbridge_app::RuntimeError;
use aunbridge_core::ConfigError;
use thiserror::Error;

/// Errors that stop the server or a configuration reload.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration file could not be read
    #[error("cannot read {}: {source}", path.display())]
    ReadConfig {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid JSON for the model
    #[error("cannot parse {}: {source}", path.display())]
    ParseConfig {
        /// File that was parsed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration parsed but was rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Bridge controller failure
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Link daemon socket could not be bound
    #[error("link daemon socket: {0}")]
    Link(#[source] io::Error),

    /// Signal handler could not be installed
    #[error("signal handler: {0}")]
    Signal(#[source] io::Error),
}

/// Malformed message from the link daemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkMessageError {
    /// Zero-length datagram
    #[error("empty message")]
    Empty,

    /// First byte names no known message
    #[error("unknown message tag {0:#04x}")]
    UnknownTag(u8),

    /// Result message without a result byte
    #[error("result message without result code")]
    MissingResult,

    /// Result byte is not Ack, Nack or ImmediateReply
    #[error("unknown result code {0}")]
    UnknownResult(u8),
}
