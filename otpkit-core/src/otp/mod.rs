//! One-time password module
//!
//! Handles Base32 key encoding, HMAC code generation, counter-based (HOTP)
//! and time-based (TOTP) generators, key generation and the factory that
//! wires them together.

pub mod base32;
pub mod factory;
pub mod hmac;
pub mod hotp;
pub mod keygen;
pub mod totp;

/// Compare two codes in time that depends only on their length
///
/// Every byte position is checked even after a mismatch so the time taken
/// does not reveal how many leading characters were right.
pub fn constant_time_eq(expected: &[u8], candidate: &[u8]) -> bool {
    if expected.len() != candidate.len() {
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(candidate) {
        diff |= a ^ b;
    }
    diff == 0
}
