//! Random envelopes through the trunk decryptor.
//!
//! Opening must fail cleanly on anything that was not sealed with the key,
//! and whatever does open must seal and open again unchanged.

#![no_main]

use aunbridge_crypto::{open, seal};
use libfuzzer_sys::fuzz_target;

const KEY: [u8; 32] = [0x5A; 32];
const IV: [u8; 16] = [0xA5; 16];

fuzz_target!(|data: &[u8]| {
    if let Ok(plaintext) = open(&KEY, data) {
        if let Ok(resealed) = seal(&KEY, &IV, &plaintext) {
            assert_eq!(open(&KEY, &resealed).expect("fresh envelope opens"), plaintext);
        }
    }
});
