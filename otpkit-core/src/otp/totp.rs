//! TOTP (Time-based One-Time Password) generation and verification
//!
//! Implements RFC 6238: the HOTP counter is the index of the current time
//! window, `floor(unix_time / period)`. Verification accepts codes from every
//! window overlapping `[now - discrepancy, now + discrepancy]` to absorb clock
//! skew between client and server.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::debug;

use super::constant_time_eq;
use super::hmac::CodeGenerator;
use crate::error::OtpError;
use crate::time::TimeSource;
use crate::types::{Code, Key};

/// RFC 6238 default time step, in seconds
pub const DEFAULT_PERIOD: u64 = 30;

/// Time-based one-time password generator
pub struct Totp {
    generator: Arc<dyn CodeGenerator>,
    key: Key,
    time_source: Arc<dyn TimeSource>,
    period: u64,
    discrepancy: u64,
}

impl Totp {
    /// Create a TOTP generator
    ///
    /// `discrepancy` is the tolerated clock difference in seconds; zero
    /// disables tolerance.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfiguration` if `period` is zero (or does
    /// not fit in an `i64`) or `discrepancy` is negative.
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        key: Key,
        time_source: Arc<dyn TimeSource>,
        period: u64,
        discrepancy: i64,
    ) -> Result<Self, OtpError> {
        if period < 1 || i64::try_from(period).is_err() {
            return Err(OtpError::invalid_configuration(format!(
                "period must be at least 1 second, got {}",
                period
            )));
        }

        let discrepancy = u64::try_from(discrepancy).map_err(|_| {
            OtpError::invalid_configuration(format!(
                "discrepancy must not be negative, got {}",
                discrepancy
            ))
        })?;

        Ok(Self {
            generator,
            key,
            time_source,
            period,
            discrepancy,
        })
    }

    /// Seconds per code
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Tolerated clock difference, in seconds
    pub fn discrepancy(&self) -> u64 {
        self.discrepancy
    }

    /// Code for the current time as reported by the time source
    pub fn code(&self) -> Result<Code, OtpError> {
        let now = self.time_source.time()?;
        self.code_at(now)
    }

    /// Code that was (or will be) valid at `unix_seconds`
    pub fn code_at(&self, unix_seconds: i64) -> Result<Code, OtpError> {
        let window = unix_seconds.div_euclid(self.period as i64);
        self.generate(window)
    }

    /// Time windows accepted by [`verify`](Self::verify) at `now`
    ///
    /// The range runs from `floor((now - discrepancy) / period)` to
    /// `ceil((now + discrepancy) / period)`, rounding toward negative and
    /// positive infinity respectively.
    pub fn windows(&self, now: i64) -> RangeInclusive<i64> {
        let period = self.period as i64;
        let discrepancy = self.discrepancy as i64;

        let first = now.saturating_sub(discrepancy).div_euclid(period);
        let last = ceil_div(now.saturating_add(discrepancy), period);
        first..=last
    }

    /// Check a client code against every window around the current time
    ///
    /// Returns `Ok(false)` for a missing or mismatching code. Time source
    /// and generation failures are returned as errors.
    pub fn verify(&self, candidate: Option<&str>) -> Result<bool, OtpError> {
        let Some(candidate) = candidate else {
            return Ok(false);
        };

        let now = self.time_source.time()?;
        let windows = self.windows(now);

        // No early exit: a match in the first window costs as much as no match
        let mut valid = false;
        for window in windows.clone() {
            let expected = self.generate(window)?;
            valid |= constant_time_eq(expected.expose().as_bytes(), candidate.as_bytes());
        }

        debug!(
            first_window = windows.start(),
            last_window = windows.end(),
            valid,
            "Verified TOTP code"
        );
        Ok(valid)
    }

    fn generate(&self, window: i64) -> Result<Code, OtpError> {
        // Windows before the epoch keep their two's-complement bit pattern
        self.generator.generate(&self.key, window as u64)
    }
}

impl fmt::Debug for Totp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Totp")
            .field("digits", &self.generator.digits())
            .field("key", &self.key)
            .field("period", &self.period)
            .field("discrepancy", &self.discrepancy)
            .finish()
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::hmac::{HashAlgorithm, HmacGenerator};
    use crate::time::FixedTimeSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHA1_SECRET: &[u8] = b"12345678901234567890";
    #[cfg(feature = "sha2")]
    const SHA256_SECRET: &[u8] = b"12345678901234567890123456789012";
    #[cfg(feature = "sha2")]
    const SHA512_SECRET: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    /// Generator that records how many codes it produced
    struct CountingGenerator {
        inner: HmacGenerator,
        calls: AtomicUsize,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                inner: HmacGenerator::standard(),
                calls: AtomicUsize::new(0),
            }
        }

        fn take_calls(&self) -> usize {
            self.calls.swap(0, Ordering::SeqCst)
        }
    }

    impl CodeGenerator for CountingGenerator {
        fn generate(&self, key: &Key, counter: u64) -> Result<Code, OtpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate(key, counter)
        }

        fn digits(&self) -> u8 {
            self.inner.digits()
        }
    }

    fn totp_at(now: i64, period: u64, discrepancy: i64) -> Totp {
        Totp::new(
            Arc::new(HmacGenerator::standard()),
            Key::from(SHA1_SECRET),
            Arc::new(FixedTimeSource::new(now)),
            period,
            discrepancy,
        )
        .unwrap()
    }

    fn rfc6238(algorithm: HashAlgorithm, secret: &[u8], now: i64) -> String {
        Totp::new(
            Arc::new(HmacGenerator::new(algorithm, 8).unwrap()),
            Key::from(secret),
            Arc::new(FixedTimeSource::new(now)),
            DEFAULT_PERIOD,
            30,
        )
        .unwrap()
        .code()
        .unwrap()
        .expose()
        .to_string()
    }

    #[test]
    fn test_rfc6238_appendix_b_sha1() {
        let cases = [
            (59, "94287082"),
            (1_111_111_109, "07081804"),
            (1_111_111_111, "14050471"),
            (1_234_567_890, "89005924"),
            (2_000_000_000, "69279037"),
            (20_000_000_000, "65353130"),
        ];
        for (time, expected) in cases {
            assert_eq!(rfc6238(HashAlgorithm::Sha1, SHA1_SECRET, time), expected);
        }
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_rfc6238_appendix_b_sha256() {
        let cases = [
            (59, "46119246"),
            (1_111_111_109, "68084774"),
            (1_111_111_111, "67062674"),
            (1_234_567_890, "91819424"),
            (2_000_000_000, "90698825"),
            (20_000_000_000, "77737706"),
        ];
        for (time, expected) in cases {
            assert_eq!(rfc6238(HashAlgorithm::Sha256, SHA256_SECRET, time), expected);
        }
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_rfc6238_appendix_b_sha512() {
        let cases = [
            (59, "90693936"),
            (1_111_111_109, "25091201"),
            (1_111_111_111, "99943326"),
            (1_234_567_890, "93441116"),
            (2_000_000_000, "38618901"),
            (20_000_000_000, "47863826"),
        ];
        for (time, expected) in cases {
            assert_eq!(rfc6238(HashAlgorithm::Sha512, SHA512_SECRET, time), expected);
        }
    }

    #[test]
    fn test_construction_validation() {
        let make = |period, discrepancy| {
            Totp::new(
                Arc::new(HmacGenerator::standard()),
                Key::from(SHA1_SECRET),
                Arc::new(FixedTimeSource::new(0)),
                period,
                discrepancy,
            )
        };

        assert!(matches!(make(0, 30), Err(OtpError::InvalidConfiguration { .. })));
        assert!(matches!(make(30, -1), Err(OtpError::InvalidConfiguration { .. })));
        assert!(matches!(make(u64::MAX, 0), Err(OtpError::InvalidConfiguration { .. })));
        assert!(make(1, 0).is_ok());
    }

    #[test]
    fn test_code_matches_window() {
        let totp = totp_at(1_111_111_109, 30, 30);
        assert_eq!(totp.code().unwrap().expose(), totp.code_at(1_111_111_090).unwrap().expose());
        assert_ne!(totp.code().unwrap().expose(), totp.code_at(1_111_111_110).unwrap().expose());
    }

    #[test]
    fn test_windows_floor_and_ceil() {
        let totp = totp_at(0, 30, 30);
        assert_eq!(totp.windows(90), 2..=4);
        assert_eq!(totp.windows(95), 2..=5);
        assert_eq!(totp.windows(-1), -2..=1);
        assert_eq!(totp.windows(-30), -2..=0);

        let strict = totp_at(0, 30, 0);
        assert_eq!(strict.windows(90), 3..=3);
        assert_eq!(strict.windows(91), 3..=4);
    }

    #[test]
    fn test_verify_own_code() {
        let totp = totp_at(1_700_000_000, 30, 30);
        let code = totp.code().unwrap();
        assert!(totp.verify(Some(code.expose())).unwrap());
    }

    #[test]
    fn test_verify_rejects_missing_and_malformed() {
        let totp = totp_at(1_700_000_000, 30, 30);
        let code = totp.code().unwrap().expose().to_string();

        assert!(!totp.verify(None).unwrap());
        assert!(!totp.verify(Some("")).unwrap());
        assert!(!totp.verify(Some(&code[..5])).unwrap());
        assert!(!totp.verify(Some(&format!("{}0", code))).unwrap());
    }

    #[test]
    fn test_verify_rejects_single_digit_mutations() {
        let totp = totp_at(1_700_000_000, 30, 0);
        let code = totp.code().unwrap().expose().to_string();

        for position in 0..code.len() {
            let mut mutated = code.clone().into_bytes();
            mutated[position] = match mutated[position] {
                b'9' => b'0',
                digit => digit + 1,
            };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(!totp.verify(Some(&mutated)).unwrap(), "{} accepted", mutated);
        }
    }

    #[test]
    fn test_discrepancy_boundaries() {
        // Window-aligned generation time
        let t = 1_111_111_080;
        assert_eq!(t % 30, 0);
        let code = totp_at(t, 30, 30).code().unwrap();

        for (offset, accepted) in [
            (-61, false),
            (-60, false),
            (-59, true),
            (-30, true),
            (0, true),
            (30, true),
            (59, true),
            (60, false),
            (61, false),
        ] {
            let verifier = totp_at(t + offset, 30, 30);
            assert_eq!(
                verifier.verify(Some(code.expose())).unwrap(),
                accepted,
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_zero_discrepancy_on_window_boundary() {
        let t = 1_111_111_080;
        let code = totp_at(t, 30, 0).code().unwrap();

        assert!(totp_at(t + 29, 30, 0).verify(Some(code.expose())).unwrap());
        assert!(!totp_at(t + 30, 30, 0).verify(Some(code.expose())).unwrap());
        assert!(!totp_at(t - 30, 30, 0).verify(Some(code.expose())).unwrap());
    }

    #[test]
    fn test_verify_evaluates_every_window() {
        let generator = Arc::new(CountingGenerator::new());
        let now = 1_111_111_095;
        let totp = Totp::new(
            generator.clone(),
            Key::from(SHA1_SECRET),
            Arc::new(FixedTimeSource::new(now)),
            30,
            30,
        )
        .unwrap();
        let windows = totp.windows(now).count();
        assert_eq!(windows, 4);

        // Match in the first window, the current window, and nowhere
        let first = totp.code_at(now - 30).unwrap();
        let current = totp.code().unwrap();
        generator.take_calls();

        assert!(totp.verify(Some(first.expose())).unwrap());
        assert_eq!(generator.take_calls(), windows);

        assert!(totp.verify(Some(current.expose())).unwrap());
        assert_eq!(generator.take_calls(), windows);

        assert!(!totp.verify(Some("000000x")).unwrap());
        assert_eq!(generator.take_calls(), windows);
    }

    #[test]
    fn test_time_before_epoch() {
        let totp = totp_at(-1, 30, 30);
        let code = totp.code().unwrap();
        assert_eq!(code.len(), 6);
        assert!(totp.verify(Some(code.expose())).unwrap());
        assert_eq!(
            code.expose(),
            HmacGenerator::standard()
                .generate(&Key::from(SHA1_SECRET), u64::MAX)
                .unwrap()
                .expose()
        );
    }

    #[test]
    fn test_time_source_errors_propagate() {
        struct Broken;
        impl TimeSource for Broken {
            fn time(&self) -> Result<i64, OtpError> {
                Err(OtpError::ClosedSource)
            }
        }

        let totp = Totp::new(
            Arc::new(HmacGenerator::standard()),
            Key::from(SHA1_SECRET),
            Arc::new(Broken),
            30,
            30,
        )
        .unwrap();
        assert_eq!(totp.code().unwrap_err(), OtpError::ClosedSource);
        assert_eq!(totp.verify(Some("123456")), Err(OtpError::ClosedSource));
        assert!(!totp.verify(None).unwrap());
    }
}
