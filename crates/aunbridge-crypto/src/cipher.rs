//! AES-256-CBC with a length prefix and strict PKCS#7 padding.
//!
//! The encrypted buffer is:
//!
//! ```text
//! [plaintext length: u16 big-endian][plaintext][PKCS#7 padding]
//! ```
//!
//! The length prefix lets the receiver reject a buffer whose padding happens
//! to look valid after tampering but whose contents were truncated.

use aes::{
    Aes256,
    cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7},
};

use crate::error::EnvelopeError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// CBC initialisation vector size in bytes
pub const IV_SIZE: usize = 16;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

const LENGTH_PREFIX: usize = 2;

/// Encrypt `plaintext` under `key` and `iv`.
///
/// The IV must be fresh for every call. It is the caller's job to draw it
/// from a cryptographically secure source.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let declared = u16::try_from(plaintext.len())
        .map_err(|_| EnvelopeError::PlaintextTooLarge(plaintext.len()))?;

    let mut buffer = Vec::with_capacity(LENGTH_PREFIX + plaintext.len());
    buffer.extend_from_slice(&declared.to_be_bytes());
    buffer.extend_from_slice(plaintext);

    Ok(Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(&buffer))
}

/// Decrypt a buffer produced by [`encrypt`].
///
/// Any malformed padding or length mismatch is a hard failure. Nothing is
/// returned from a buffer that fails either check.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    iv: &[u8; IV_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(EnvelopeError::CiphertextLength(ciphertext.len()));
    }

    let mut buffer = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EnvelopeError::BadPadding)?;

    let Some(prefix) = buffer.first_chunk::<LENGTH_PREFIX>() else {
        return Err(EnvelopeError::LengthMismatch { declared: 0, actual: 0 });
    };
    let declared = usize::from(u16::from_be_bytes(*prefix));
    let actual = buffer.len().saturating_sub(LENGTH_PREFIX);
    if buffer.len() < LENGTH_PREFIX || declared != actual {
        return Err(EnvelopeError::LengthMismatch { declared, actual });
    }

    buffer.drain(..LENGTH_PREFIX);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use aes::cipher::block_padding::NoPadding;
    use hex_literal::hex;

    use super::*;

    fn raw_encrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], blocks: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(blocks)
    }

    fn raw_decrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], blocks: &[u8]) -> Vec<u8> {
        Aes256CbcDec::new(key.into(), iv.into()).decrypt_padded_vec_mut::<NoPadding>(blocks).unwrap()
    }

    // NIST SP 800-38A, F.2.5 CBC-AES256.Encrypt, first two blocks
    const NIST_KEY: [u8; 32] =
        hex!("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4");
    const NIST_IV: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

    #[test]
    fn cbc_matches_nist_vector() {
        let plain = hex!("6bc1bee22e409f96e93d7e117393172a ae2d8a571e03ac9c9eb76fac45af8e51");
        let buffer = raw_encrypt(&NIST_KEY, &NIST_IV, &plain);
        assert_eq!(
            buffer,
            hex!("f58c4c04d6e5f1ba779eabfb5f7bfbd6 9cfc4e967edb808d679f777bc6702c7d").to_vec()
        );

        assert_eq!(raw_decrypt(&NIST_KEY, &NIST_IV, &buffer), plain.to_vec());
    }

    #[test]
    fn empty_plaintext_is_one_block() {
        let ct = encrypt(&[7; 32], &[1; 16], &[]).unwrap();
        assert_eq!(ct.len(), 16);
        assert_eq!(decrypt(&[7; 32], &[1; 16], &ct).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn fourteen_bytes_gets_a_full_padding_block() {
        let ct = encrypt(&[7; 32], &[1; 16], &[0xAB; 14]).unwrap();
        assert_eq!(ct.len(), 32);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let ct = encrypt(&[7; 32], &[1; 16], b"hello trunk").unwrap();
        assert!(decrypt(&[8; 32], &[1; 16], &ct).is_err());
    }

    #[test]
    fn partial_block_is_rejected() {
        assert_eq!(decrypt(&[0; 32], &[0; 16], &[0; 17]), Err(EnvelopeError::CiphertextLength(17)));
        assert_eq!(decrypt(&[0; 32], &[0; 16], &[]), Err(EnvelopeError::CiphertextLength(0)));
    }

    #[test]
    fn padding_with_mixed_bytes_is_rejected() {
        // Encrypt a raw block whose last byte claims 3 bytes of padding but
        // whose preceding pad bytes disagree.
        let mut block = [0u8; 16];
        block[0..2].copy_from_slice(&11u16.to_be_bytes());
        block[13] = 3;
        block[14] = 2;
        block[15] = 3;
        let ct = raw_encrypt(&[5; 32], &[0; 16], &block);
        assert_eq!(decrypt(&[5; 32], &[0; 16], &ct), Err(EnvelopeError::BadPadding));
    }

    #[test]
    fn length_prefix_must_match() {
        let mut block = [1u8; 16];
        block[0..2].copy_from_slice(&10u16.to_be_bytes());
        block[15] = 1;
        let ct = raw_encrypt(&[5; 32], &[0; 16], &block);
        assert_eq!(
            decrypt(&[5; 32], &[0; 16], &ct),
            Err(EnvelopeError::LengthMismatch { declared: 10, actual: 13 })
        );
    }
}
