//! Configuration module
//!
//! Handles the OTP parameters (hash, digits, period, discrepancy, initial
//! counter and time source) loaded from TOML files. Keys are never part of
//! the configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OtpError;
use crate::otp::factory::OtpFactory;
use crate::otp::hmac::{HashAlgorithm, DEFAULT_DIGITS, MAX_DIGITS, MIN_DIGITS};
use crate::otp::totp::DEFAULT_PERIOD;
use crate::time::ntp::{NtpTimeSource, DEFAULT_TIMEOUT, NTP_PORT};
use crate::time::{FixedTimeSource, SystemTimeSource, TimeSource};

pub mod toml_config;

/// OTP configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// HMAC hash algorithm (sha1, sha256 or sha512)
    pub algorithm: HashAlgorithm,

    /// Digits per code (1-10, default: 6)
    pub digits: u8,

    /// TOTP period in seconds (default: 30)
    pub period: u64,

    /// Tolerated clock difference in seconds (default: same as period)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<i64>,

    /// Initial HOTP counter
    pub counter: u64,

    /// Where TOTP takes the current time from
    pub time_source: TimeSourceConfig,
}

/// Time source selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimeSourceConfig {
    /// Local wall clock
    #[default]
    System,
    /// Fixed instant, for looking up historical codes only
    Fixed {
        /// Seconds since the Unix epoch
        at: i64,
    },
    /// Network Time Protocol server
    Ntp {
        server: String,
        #[serde(default = "default_ntp_port")]
        port: u16,
        #[serde(default = "default_ntp_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_ntp_port() -> u16 {
    NTP_PORT
}

fn default_ntp_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

impl OtpConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return Err(format!(
                "Digits must be between {} and {}",
                MIN_DIGITS, MAX_DIGITS
            ));
        }

        if !self.algorithm.is_available() {
            return Err(format!(
                "Hash algorithm {} is not available in this build",
                self.algorithm
            ));
        }

        if self.period == 0 {
            return Err("Period cannot be zero".to_string());
        }

        if let Some(discrepancy) = self.discrepancy {
            if discrepancy < 0 {
                return Err("Discrepancy cannot be negative".to_string());
            }
        }

        if let TimeSourceConfig::Ntp {
            server,
            port,
            timeout_ms,
        } = &self.time_source
        {
            if server.is_empty() {
                return Err("NTP server cannot be empty".to_string());
            }
            if *port == 0 {
                return Err("NTP port cannot be zero".to_string());
            }
            if *timeout_ms == 0 {
                return Err("NTP timeout cannot be zero".to_string());
            }
        }

        Ok(())
    }

    /// Build a factory from this configuration
    ///
    /// Every parameter is validated as it is applied. An NTP time source is
    /// connected here and stays open for as long as the factory or any TOTP
    /// instance created from it holds it.
    pub fn factory(&self) -> Result<OtpFactory, OtpError> {
        self.factory_with_time_source(self.open_time_source()?)
    }

    /// Build a factory from this configuration around an already opened
    /// time source, ignoring `time_source`
    pub fn factory_with_time_source(
        &self,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<OtpFactory, OtpError> {
        let mut factory = OtpFactory::new()
            .algorithm(self.algorithm, self.digits)?
            .period(self.period)?
            .counter(self.counter)
            .time_source(time_source);

        if let Some(discrepancy) = self.discrepancy {
            factory = factory.discrepancy(discrepancy)?;
        }

        Ok(factory)
    }

    /// Open the configured time source
    pub fn open_time_source(&self) -> Result<Arc<dyn TimeSource>, OtpError> {
        Ok(match &self.time_source {
            TimeSourceConfig::System => Arc::new(SystemTimeSource),
            TimeSourceConfig::Fixed { at } => {
                warn!(at, "Using a fixed time source; codes generated from it never expire");
                Arc::new(FixedTimeSource::new(*at))
            }
            TimeSourceConfig::Ntp {
                server,
                port,
                timeout_ms,
            } => Arc::new(NtpTimeSource::connect_with_port(
                server,
                *port,
                Duration::from_millis(*timeout_ms),
            )?),
        })
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            discrepancy: None,
            counter: 0,
            time_source: TimeSourceConfig::default(),
        }
    }
}
