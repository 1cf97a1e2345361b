//! HOTP (HMAC-based One-Time Password) generation and verification
//!
//! Implements RFC 4226 counter-based codes. The counter only changes through
//! [`Hotp::increment`] and [`Hotp::sync`]; verification never moves it, so
//! look-ahead windows and resynchronization are left to the caller.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::constant_time_eq;
use super::hmac::CodeGenerator;
use crate::error::OtpError;
use crate::types::{Code, Key};

/// Counter-based one-time password generator
pub struct Hotp {
    generator: Arc<dyn CodeGenerator>,
    key: Key,
    counter: u64,
}

impl Hotp {
    pub fn new(generator: Arc<dyn CodeGenerator>, key: Key, counter: u64) -> Self {
        Self {
            generator,
            key,
            counter,
        }
    }

    /// Current counter value
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Advance the counter by one
    pub fn increment(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    /// Set the counter, e.g. after a client token was pressed several times
    /// without submitting a code
    pub fn sync(&mut self, counter: u64) {
        self.counter = counter;
    }

    /// Code for the current counter; does not advance the counter
    pub fn code(&self) -> Result<Code, OtpError> {
        self.generator.generate(&self.key, self.counter)
    }

    /// Check a client code against the current counter
    ///
    /// Returns `Ok(false)` for a missing or mismatching code. Generation
    /// failures are returned as errors rather than as a mismatch.
    pub fn verify(&self, candidate: Option<&str>) -> Result<bool, OtpError> {
        let Some(candidate) = candidate else {
            return Ok(false);
        };

        let expected = self.code()?;
        let valid = constant_time_eq(expected.expose().as_bytes(), candidate.as_bytes());

        debug!(counter = self.counter, valid, "Verified HOTP code");
        Ok(valid)
    }
}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("digits", &self.generator.digits())
            .field("key", &self.key)
            .field("counter", &self.counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::hmac::HmacGenerator;

    fn rfc4226_hotp(counter: u64) -> Hotp {
        Hotp::new(
            Arc::new(HmacGenerator::standard()),
            Key::from(b"12345678901234567890".as_slice()),
            counter,
        )
    }

    #[test]
    fn test_code_does_not_advance_counter() {
        let hotp = rfc4226_hotp(0);
        assert_eq!(hotp.code().unwrap().expose(), "755224");
        assert_eq!(hotp.code().unwrap().expose(), "755224");
        assert_eq!(hotp.counter(), 0);
    }

    #[test]
    fn test_increment_and_sync() {
        let mut hotp = rfc4226_hotp(0);
        hotp.increment();
        assert_eq!(hotp.counter(), 1);
        assert_eq!(hotp.code().unwrap().expose(), "287082");

        hotp.sync(9);
        assert_eq!(hotp.counter(), 9);
        assert_eq!(hotp.code().unwrap().expose(), "520489");

        hotp.sync(u64::MAX);
        hotp.increment();
        assert_eq!(hotp.counter(), 0);
    }

    #[test]
    fn test_verify_does_not_advance_counter() {
        let hotp = rfc4226_hotp(3);
        assert!(hotp.verify(Some("969429")).unwrap());
        assert!(hotp.verify(Some("969429")).unwrap());
        assert_eq!(hotp.counter(), 3);
    }

    #[test]
    fn test_verify_rejects() {
        let hotp = rfc4226_hotp(0);
        assert!(!hotp.verify(None).unwrap());
        assert!(!hotp.verify(Some("")).unwrap());
        assert!(!hotp.verify(Some("75522")).unwrap());
        assert!(!hotp.verify(Some("7552240")).unwrap());
        // Code of the next counter
        assert!(!hotp.verify(Some("287082")).unwrap());
    }

    #[test]
    fn test_verify_propagates_generation_errors() {
        let hotp = Hotp::new(Arc::new(HmacGenerator::standard()), Key::new(Vec::new()), 0);
        assert_eq!(hotp.verify(Some("123456")), Err(OtpError::InvalidKey));
        assert!(!hotp.verify(None).unwrap());
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", rfc4226_hotp(5));
        assert!(debug.contains("counter: 5"));
        assert!(!debug.contains("1234567890"));
    }
}
