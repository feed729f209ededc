//! Error types for wire parsing.
//!
//! All errors are structured, testable, and carry the offending sizes or
//! values so that drop logs are actionable.

use thiserror::Error;

use crate::frame::FrameAddress;

/// Errors raised while parsing or building wire packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the fixed header it should contain
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// A scout frame must be exactly six bytes
    #[error("bad scout length: expected 6 bytes, got {0}")]
    BadScoutLength(usize),

    /// Data frame addressing differs from the scout that announced it
    #[error("data frame {data} does not match scout {scout}")]
    AddressMismatch {
        /// Addressing carried by the scout
        scout: FrameAddress,
        /// Addressing carried by the data frame
        data: FrameAddress,
    },

    /// Payload exceeds the Econet MTU
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Transaction type byte is not one of the six AUN types
    #[error("unknown transaction type: {0:#04x}")]
    UnknownTransactionType(u8),
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
