//! Random key generation
//!
//! Keys are drawn from the operating system's CSPRNG. The standard length of
//! 20 bytes (160 bits, the RFC 4226 recommendation) encodes to exactly 32
//! Base32 characters.

use rand::rngs::OsRng;
use rand::RngCore;

use super::base32;
use crate::error::OtpError;
use crate::types::Key;

/// Recommended key length in bytes
pub const STANDARD_KEY_LENGTH: usize = 20;

/// Generator for random OTP keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenerator {
    length: usize,
}

impl KeyGenerator {
    /// Create a generator for keys of `length` bytes
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfiguration` for a zero length
    pub fn new(length: usize) -> Result<Self, OtpError> {
        if length == 0 {
            return Err(OtpError::invalid_configuration(
                "key length must be at least 1 byte",
            ));
        }
        Ok(Self { length })
    }

    /// Generator for 20-byte keys
    pub const fn standard() -> Self {
        Self {
            length: STANDARD_KEY_LENGTH,
        }
    }

    /// Key length in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate(&self) -> Key {
        let mut bytes = vec![0u8; self.length];
        OsRng.fill_bytes(&mut bytes);
        Key::new(bytes)
    }

    /// Generate a key as unpadded Base32 text
    pub fn generate_base32(&self) -> String {
        base32::encode_unpadded(self.generate().expose())
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::standard()
    }
}
