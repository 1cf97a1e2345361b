//! Factory for configured HOTP and TOTP instances
//!
//! Every setter validates its argument immediately, so an invalid
//! parameter is reported where it is applied rather than when the first code
//! is generated.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::base32;
use super::hmac::{CodeGenerator, HashAlgorithm, HmacGenerator};
use super::hotp::Hotp;
use super::totp::{Totp, DEFAULT_PERIOD};
use crate::error::OtpError;
use crate::time::{SystemTimeSource, TimeSource};
use crate::types::Key;

/// Builder for [`Hotp`] and [`Totp`] instances
///
/// Defaults: SHA1, 6 digits, the system clock, 30 second period, a
/// discrepancy equal to the period, and counter 0.
#[derive(Clone)]
pub struct OtpFactory {
    generator: Arc<dyn CodeGenerator>,
    time_source: Arc<dyn TimeSource>,
    period: u64,
    discrepancy: Option<u64>,
    counter: u64,
}

impl OtpFactory {
    pub fn new() -> Self {
        Self {
            generator: Arc::new(HmacGenerator::standard()),
            time_source: Arc::new(SystemTimeSource),
            period: DEFAULT_PERIOD,
            discrepancy: None,
            counter: 0,
        }
    }

    /// Use a custom code generator
    pub fn generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Use an HMAC generator with the given hash and code length
    pub fn algorithm(self, algorithm: HashAlgorithm, digits: u8) -> Result<Self, OtpError> {
        let generator = HmacGenerator::new(algorithm, digits)?;
        Ok(self.generator(Arc::new(generator)))
    }

    /// Time source for TOTP instances
    pub fn time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Seconds each TOTP code stays current; must be at least 1
    pub fn period(mut self, period: u64) -> Result<Self, OtpError> {
        if period < 1 || i64::try_from(period).is_err() {
            return Err(OtpError::invalid_configuration(format!(
                "period must be at least 1 second, got {}",
                period
            )));
        }
        self.period = period;
        Ok(self)
    }

    /// Tolerated client/server clock difference in seconds; zero disables it
    pub fn discrepancy(mut self, discrepancy: i64) -> Result<Self, OtpError> {
        let discrepancy = u64::try_from(discrepancy).map_err(|_| {
            OtpError::invalid_configuration(format!(
                "discrepancy must not be negative, got {}",
                discrepancy
            ))
        })?;
        self.discrepancy = Some(discrepancy);
        Ok(self)
    }

    /// Initial counter for HOTP instances
    pub fn counter(mut self, counter: u64) -> Self {
        self.counter = counter;
        self
    }

    pub fn hotp(&self, key: Key) -> Hotp {
        debug!(
            digits = self.generator.digits(),
            counter = self.counter,
            "Creating HOTP generator"
        );
        Hotp::new(Arc::clone(&self.generator), key, self.counter)
    }

    /// HOTP instance for a Base32-encoded key
    pub fn hotp_base32(&self, key: &str) -> Result<Hotp, OtpError> {
        Ok(self.hotp(Key::new(base32::decode(key)?)))
    }

    pub fn totp(&self, key: Key) -> Result<Totp, OtpError> {
        let discrepancy = self.discrepancy.unwrap_or(self.period);
        debug!(
            digits = self.generator.digits(),
            period = self.period,
            discrepancy,
            "Creating TOTP generator"
        );

        // Both values were range-checked by their setters
        Totp::new(
            Arc::clone(&self.generator),
            key,
            Arc::clone(&self.time_source),
            self.period,
            discrepancy as i64,
        )
    }

    /// TOTP instance for a Base32-encoded key
    pub fn totp_base32(&self, key: &str) -> Result<Totp, OtpError> {
        self.totp(Key::new(base32::decode(key)?))
    }

    /// HOTP instance with default settings
    pub fn standard_hotp(key: Key) -> Hotp {
        Self::new().hotp(key)
    }

    /// TOTP instance with default settings
    pub fn standard_totp(key: Key) -> Result<Totp, OtpError> {
        Self::new().totp(key)
    }
}

impl Default for OtpFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OtpFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpFactory")
            .field("digits", &self.generator.digits())
            .field("period", &self.period)
            .field("discrepancy", &self.discrepancy)
            .field("counter", &self.counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTimeSource;

    const RFC_BASE32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_defaults() {
        let key = Key::from(b"12345678901234567890".as_slice());
        let totp = OtpFactory::standard_totp(key).unwrap();
        assert_eq!(totp.period(), 30);
        assert_eq!(totp.discrepancy(), 30);
        assert_eq!(totp.code().unwrap().len(), 6);

        let hotp = OtpFactory::standard_hotp(Key::from(b"12345678901234567890".as_slice()));
        assert_eq!(hotp.counter(), 0);
        assert_eq!(hotp.code().unwrap().expose(), "755224");
    }

    #[test]
    fn test_discrepancy_follows_period_until_set() {
        let factory = OtpFactory::new().period(60).unwrap();
        assert_eq!(factory.totp_base32(RFC_BASE32).unwrap().discrepancy(), 60);

        let factory = factory.discrepancy(0).unwrap();
        assert_eq!(factory.totp_base32(RFC_BASE32).unwrap().discrepancy(), 0);
    }

    #[test]
    fn test_setters_validate_immediately() {
        assert!(matches!(
            OtpFactory::new().period(0),
            Err(OtpError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            OtpFactory::new().discrepancy(-1),
            Err(OtpError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            OtpFactory::new().algorithm(HashAlgorithm::Sha1, 0),
            Err(OtpError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            OtpFactory::new().algorithm(HashAlgorithm::Sha1, 11),
            Err(OtpError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_configured_instances() {
        let factory = OtpFactory::new()
            .algorithm(HashAlgorithm::Sha1, 8)
            .unwrap()
            .time_source(Arc::new(FixedTimeSource::new(59)))
            .counter(1);

        let totp = factory.totp_base32(RFC_BASE32).unwrap();
        assert_eq!(totp.code().unwrap().expose(), "94287082");

        let hotp = factory.hotp_base32(RFC_BASE32).unwrap();
        assert_eq!(hotp.counter(), 1);
        assert_eq!(hotp.code().unwrap().expose(), "94287082");
    }

    #[test]
    fn test_invalid_base32_key() {
        assert_eq!(
            OtpFactory::new().totp_base32("NOT BASE32!").unwrap_err(),
            OtpError::InvalidEncoding
        );
        assert_eq!(
            OtpFactory::new().hotp_base32("A").unwrap_err(),
            OtpError::InvalidEncoding
        );
    }
}
