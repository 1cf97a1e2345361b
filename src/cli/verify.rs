//! Verify command implementation

use std::sync::Arc;

use colored::Colorize;
use otpkit_core::error::OtpkitError;
use otpkit_core::time::SystemTimeSource;

use super::{clean, OtpMode};

/// Run the verify command
///
/// Prints `valid` or `invalid` and returns whether the code was accepted.
pub fn run_verify(key: &str, code: &str, mode: &OtpMode) -> Result<bool, OtpkitError> {
    let config = mode.config()?;
    let key = clean(key);
    let code = Some(code.trim());

    let valid = if mode.hotp {
        // HOTP never reads the clock; skip opening the configured source
        config
            .factory_with_time_source(Arc::new(SystemTimeSource))?
            .hotp_base32(&key)?
            .verify(code)?
    } else {
        config.factory()?.totp_base32(&key)?.verify(code)?
    };

    if valid {
        println!("{}", "valid".green());
    } else {
        println!("{}", "invalid".red());
    }

    Ok(valid)
}
