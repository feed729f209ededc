//! Error types for the trunk envelope.

use thiserror::Error;

/// Errors from sealing or opening a trunk envelope.
///
/// Opening failures carry no secret material. Callers log them and drop the
/// datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Envelope shorter than tag, IV and one ciphertext block
    #[error("envelope too short: {actual} bytes, need at least {min}")]
    TooShort {
        /// Bytes received
        actual: usize,
        /// Minimum envelope size
        min: usize,
    },

    /// Leading tag byte names an encryption type we do not speak
    #[error("unknown encryption type {0}")]
    UnknownEncryptionType(u8),

    /// Ciphertext is empty or not a whole number of blocks
    #[error("ciphertext length {0} is not a positive multiple of 16")]
    CiphertextLength(usize),

    /// PKCS#7 padding is malformed
    #[error("invalid padding")]
    BadPadding,

    /// Embedded length prefix disagrees with the decrypted size
    #[error("length prefix {declared} does not match plaintext length {actual}")]
    LengthMismatch {
        /// Length carried in the prefix
        declared: usize,
        /// Length actually recovered
        actual: usize,
    },

    /// Plaintext does not fit the 16-bit length prefix
    #[error("plaintext of {0} bytes is too large to seal")]
    PlaintextTooLarge(usize),
}
