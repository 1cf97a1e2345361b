//! Code command implementation
//!
//! Prints the HOTP or TOTP code for a Base32 key using the parameters from
//! the configuration file.

use std::sync::Arc;

use chrono::{DateTime, Local};
use colored::Colorize;
use otpkit_core::error::OtpkitError;
use otpkit_core::time::{FixedTimeSource, SystemTimeSource, TimeSource};

use super::{clean, OtpMode};

/// Run the code command
///
/// The code goes to stdout on its own line. The counter or the expiry time
/// of a TOTP code goes to stderr.
pub fn run_code(key: &str, mode: &OtpMode, at: Option<i64>) -> Result<(), OtpkitError> {
    let config = mode.config()?;
    let key = clean(key);

    if mode.hotp {
        // HOTP never reads the clock; skip opening the configured source
        let hotp = config
            .factory_with_time_source(Arc::new(SystemTimeSource))?
            .hotp_base32(&key)?;
        println!("{}", hotp.code()?.expose());
        eprintln!("{}", format!("counter {}", hotp.counter()).dimmed());
        return Ok(());
    }

    let time_source: Arc<dyn TimeSource> = match at {
        Some(at) => Arc::new(FixedTimeSource::new(at)),
        None => config.open_time_source()?,
    };
    let totp = config
        .factory_with_time_source(time_source.clone())?
        .totp_base32(&key)?;

    let now = time_source.time()?;
    println!("{}", totp.code_at(now)?.expose());

    let period = totp.period() as i64;
    let expires = (now.div_euclid(period) + 1).saturating_mul(period);
    if let Some(expires_at) = DateTime::from_timestamp(expires, 0) {
        eprintln!(
            "{}",
            format!(
                "expires {} ({}s)",
                expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                expires - now
            )
            .dimmed()
        );
    }

    Ok(())
}
