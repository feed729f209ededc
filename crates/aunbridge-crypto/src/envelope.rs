//! Trunk envelope framing.
//!
//! ```text
//! 0        1..17   17..
//! [type=1] [IV]    [ciphertext]
//! ```
//!
//! Envelopes shorter than one tag byte, one IV and one ciphertext block are
//! rejected before any decryption is attempted.

use crate::{
    cipher::{self, BLOCK_SIZE, IV_SIZE, KEY_SIZE},
    error::EnvelopeError,
};

/// The only encryption type in use: AES-256-CBC.
pub const ENCRYPTION_AES256_CBC: u8 = 1;

/// Smallest well-formed envelope.
pub const MIN_ENVELOPE_LEN: usize = 1 + IV_SIZE + BLOCK_SIZE;

/// Seal `plaintext` into an envelope using a caller-supplied fresh IV.
pub fn seal(
    key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let ciphertext = cipher::encrypt(key, iv, plaintext)?;

    let mut out = Vec::with_capacity(1 + IV_SIZE + ciphertext.len());
    out.push(ENCRYPTION_AES256_CBC);
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open an envelope and return its plaintext.
pub fn open(key: &[u8; KEY_SIZE], envelope: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(EnvelopeError::TooShort { actual: envelope.len(), min: MIN_ENVELOPE_LEN });
    }

    let (tag, rest) = envelope.split_at(1);
    if tag[0] != ENCRYPTION_AES256_CBC {
        return Err(EnvelopeError::UnknownEncryptionType(tag[0]));
    }

    let (iv, ciphertext) = rest.split_at(IV_SIZE);
    let Ok(iv) = <&[u8; IV_SIZE]>::try_from(iv) else {
        return Err(EnvelopeError::TooShort { actual: envelope.len(), min: MIN_ENVELOPE_LEN });
    };

    cipher::decrypt(key, iv, ciphertext)
}
