//! HMAC-based code generation (RFC 4226 dynamic truncation)
//!
//! The HMAC digest of the big-endian 8-byte counter is truncated to a
//! 31-bit integer, reduced modulo 10^digits and rendered as zero-padded
//! decimal text.
//!
//! Reference: https://datatracker.ietf.org/doc/html/rfc4226#section-5.3

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
#[cfg(feature = "sha2")]
use sha2::{Sha256, Sha512};

use crate::error::OtpError;
use crate::types::{Code, Key};

/// Smallest supported code length
pub const MIN_DIGITS: u8 = 1;
/// Largest supported code length (10^10 still exceeds the 31-bit truncation)
pub const MAX_DIGITS: u8 = 10;
/// Code length used by standard authenticator apps
pub const DEFAULT_DIGITS: u8 = 6;

/// Hash algorithm for HMAC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Whether this build can compute HMACs with this algorithm
    pub fn is_available(self) -> bool {
        match self {
            HashAlgorithm::Sha1 => true,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512 => cfg!(feature = "sha2"),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl FromStr for HashAlgorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(OtpError::AlgorithmUnavailable {
                algorithm: s.to_string(),
            }),
        }
    }
}

/// Algorithm for turning a key and a counter into a code
///
/// [`HmacGenerator`] is the standard implementation. Custom generators can
/// be plugged into [`Hotp`](crate::otp::hotp::Hotp),
/// [`Totp`](crate::otp::totp::Totp) and the
/// [`OtpFactory`](crate::otp::factory::OtpFactory).
pub trait CodeGenerator: Send + Sync {
    /// Generate the code for a counter value (or time window, for TOTP)
    fn generate(&self, key: &Key, counter: u64) -> Result<Code, OtpError>;

    /// Number of digits in every generated code
    fn digits(&self) -> u8;
}

/// HMAC-based code generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmacGenerator {
    algorithm: HashAlgorithm,
    digits: u8,
}

impl HmacGenerator {
    /// Create a generator, validating the digit count
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfiguration` unless `1 <= digits <= 10`
    pub fn new(algorithm: HashAlgorithm, digits: u8) -> Result<Self, OtpError> {
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            return Err(OtpError::invalid_configuration(format!(
                "digit count must be between {} and {}, got {}",
                MIN_DIGITS, MAX_DIGITS, digits
            )));
        }

        Ok(Self { algorithm, digits })
    }

    /// The generator used by standard authenticator apps (SHA1, 6 digits)
    pub const fn standard() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha1,
            digits: DEFAULT_DIGITS,
        }
    }

    /// Hash algorithm used by this generator
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl Default for HmacGenerator {
    fn default() -> Self {
        Self::standard()
    }
}

impl CodeGenerator for HmacGenerator {
    fn generate(&self, key: &Key, counter: u64) -> Result<Code, OtpError> {
        let digest = hmac_digest(self.algorithm, key.expose(), &counter.to_be_bytes())?;
        let truncated = truncate(&digest);

        let value = u64::from(truncated) % 10_u64.pow(u32::from(self.digits));
        Ok(Code::new(format!(
            "{:0width$}",
            value,
            width = usize::from(self.digits)
        )))
    }

    fn digits(&self) -> u8 {
        self.digits
    }
}

/// Compute the HMAC of `message` under `key`
///
/// # Errors
///
/// Returns `OtpError::InvalidKey` for an empty key and
/// `OtpError::AlgorithmUnavailable` when the algorithm was compiled out.
pub fn hmac_digest(
    algorithm: HashAlgorithm,
    key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, OtpError> {
    if key.is_empty() {
        return Err(OtpError::InvalidKey);
    }

    match algorithm {
        HashAlgorithm::Sha1 => sign::<Hmac<Sha1>>(key, message),
        #[cfg(feature = "sha2")]
        HashAlgorithm::Sha256 => sign::<Hmac<Sha256>>(key, message),
        #[cfg(feature = "sha2")]
        HashAlgorithm::Sha512 => sign::<Hmac<Sha512>>(key, message),
        #[cfg(not(feature = "sha2"))]
        HashAlgorithm::Sha256 | HashAlgorithm::Sha512 => Err(OtpError::AlgorithmUnavailable {
            algorithm: algorithm.to_string(),
        }),
    }
}

fn sign<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| OtpError::InvalidKey)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Dynamic truncation of an HMAC digest to a 31-bit integer
///
/// The low nibble of the last byte selects a 4-byte window; its top bit is
/// cleared to avoid signed/unsigned ambiguity.
///
/// # Panics
///
/// Panics for digests shorter than 20 bytes. SHA1, SHA256 and SHA512
/// digests are always long enough.
pub fn truncate(digest: &[u8]) -> u32 {
    assert!(digest.len() >= 20, "HMAC digest too short to truncate");

    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ])
}
