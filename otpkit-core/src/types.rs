//! Type definitions and wrappers for secure data handling
//!
//! This module provides type-safe wrappers for key material and generated
//! codes using the secrecy crate to prevent accidental exposure in logs or
//! debug output.

use std::fmt;

use secrecy::{ExposeSecret, Secret};

/// Shared OTP key
///
/// Raw key bytes, owned by exactly one OTP generator for its lifetime.
/// The bytes are zeroized on drop and never appear in debug output.
pub struct Key(Secret<Vec<u8>>);

impl Key {
    /// Create a new Key from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Secret::new(bytes))
    }

    /// Expose the key bytes (use with caution!)
    ///
    /// This should only be called when passing the key to the HMAC
    /// primitive or encoding it for display to its owner.
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }

    /// Number of bytes in the key
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Whether the key has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key([REDACTED {} bytes])", self.len())
    }
}

/// Wrapper for generated OTP codes
///
/// Generated codes should also be treated as sensitive data and never
/// logged, even though they have a short lifetime. The code is text, so
/// leading zeros are preserved.
#[derive(Clone, Debug)]
pub struct Code(Secret<String>);

impl Code {
    /// Create a new Code from a generated digit string
    pub fn new(code: String) -> Self {
        Self(Secret::new(code))
    }

    /// Expose the code value (use with caution!)
    ///
    /// This should only be called when showing the code to its owner
    /// or comparing it against client input.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Number of digits in the code
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Whether the code is empty
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<String> for Code {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}
