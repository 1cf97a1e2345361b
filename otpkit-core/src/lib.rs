//! Core library for the otpkit OTP toolkit
//!
//! This crate generates and verifies HOTP (RFC 4226) and TOTP (RFC 6238)
//! one-time passwords, encodes keys as Base32, and provides pluggable time
//! sources including a Network Time Protocol client.
//!
//! ```no_run
//! use otpkit_core::otp::factory::OtpFactory;
//!
//! let totp = OtpFactory::new().totp_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")?;
//! let code = totp.code()?;
//! assert!(totp.verify(Some(code.expose()))?);
//! # Ok::<(), otpkit_core::error::OtpError>(())
//! ```

pub mod error;
pub mod types;

pub mod config;
pub mod otp;
pub mod time;

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when running under systemd.
/// Otherwise, logs to stderr with appropriate formatting.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Try to use systemd journal logging if available
    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            // We're running under systemd, use journal logging
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(tracing_subscriber::filter::LevelFilter::INFO)
                .init();
            return Ok(());
        }
    }

    // Fallback to stderr logging; stdout is reserved for codes and keys
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::WARN)
        .init();

    Ok(())
}
