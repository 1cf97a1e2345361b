//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

use clap::Args;
use otpkit_core::config::toml_config::load_config_or_default;
use otpkit_core::config::OtpConfig;
use otpkit_core::error::OtpkitError;
use tracing::debug;

pub mod code;
pub mod generate_key;
pub mod verify;

/// Counter-based or time-based mode shared by `code` and `verify`
#[derive(Args, Debug)]
pub struct OtpMode {
    /// Use counter-based HOTP instead of TOTP
    #[arg(long)]
    pub hotp: bool,
    /// HOTP counter (defaults to the configured counter)
    #[arg(short, long, requires = "hotp")]
    pub counter: Option<u64>,
}

impl OtpMode {
    /// Load the configuration with the command line counter applied
    fn config(&self) -> Result<OtpConfig, OtpkitError> {
        let mut config = load_config_or_default()?;
        if let Some(counter) = self.counter {
            config.counter = counter;
        }
        debug!(
            algorithm = %config.algorithm,
            digits = config.digits,
            hotp = self.hotp,
            "Using OTP configuration"
        );
        Ok(config)
    }
}

/// Remove whitespace from user-entered keys such as "JBSW Y3DP EHPK 3PXP"
fn clean(key: &str) -> String {
    key.split_whitespace().collect()
}
