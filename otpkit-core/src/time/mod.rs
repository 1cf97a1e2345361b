//! Time sources for TOTP
//!
//! A [`TimeSource`] provides seconds since the Unix epoch. The local system
//! clock is the default; a fixed clock is available for tracing back codes at
//! a known instant, and [`ntp::NtpTimeSource`] synchronizes against a network
//! time server.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::OtpError;

pub mod ntp;

/// A source of time for TOTP generation and verification
pub trait TimeSource: Send + Sync {
    /// Seconds since 1970-01-01T00:00:00Z
    fn time(&self) -> Result<i64, OtpError>;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn time(&self) -> Result<i64, OtpError> {
        (**self).time()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn time(&self) -> Result<i64, OtpError> {
        (**self).time()
    }
}

/// A clock that never advances
///
/// Useful for tracing back the code that was valid at a specific moment.
///
/// **Never use this to authenticate live requests**: a code accepted once
/// stays valid for as long as the clock is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeSource {
    seconds_since_epoch: i64,
}

impl FixedTimeSource {
    pub fn new(seconds_since_epoch: i64) -> Self {
        Self {
            seconds_since_epoch,
        }
    }
}

impl TimeSource for FixedTimeSource {
    fn time(&self) -> Result<i64, OtpError> {
        Ok(self.seconds_since_epoch)
    }
}

/// The local wall clock, in whole seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn time(&self) -> Result<i64, OtpError> {
        Ok(unix_seconds_f64(SystemTime::now()).floor() as i64)
    }
}

/// Fractional seconds since the epoch; negative for instants before it
pub(crate) fn unix_seconds_f64(instant: SystemTime) -> f64 {
    match instant.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}
