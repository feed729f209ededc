//! Encrypted envelope for traffic between bridges.
//!
//! Trunk packets cross an untrusted wide-area link. Each one is encrypted
//! with AES-256-CBC under the trunk's pre-shared key and a fresh random IV,
//! then framed with a one-byte encryption type and the IV.
//!
//! # Security
//!
//! The envelope provides confidentiality only. Integrity rests on strict
//! PKCS#7 checks plus the embedded length prefix, which reject tampered
//! buffers with overwhelming probability. The IV is supplied by the caller so
//! that production code can draw it from OS entropy and simulations from a
//! seeded generator.
#![forbid(unsafe_code)]

pub mod cipher;
pub mod envelope;
pub mod error;

pub use cipher::{BLOCK_SIZE, IV_SIZE, KEY_SIZE, decrypt, encrypt};
pub use envelope::{ENCRYPTION_AES256_CBC, MIN_ENVELOPE_LEN, open, seal};
pub use error::EnvelopeError;
