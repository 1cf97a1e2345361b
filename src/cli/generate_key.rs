//! Generate key command implementation
//!
//! Prints a new random key as Base32 text, ready to be shared with an
//! authenticator app.

use otpkit_core::error::OtpkitError;
use otpkit_core::otp::base32;
use otpkit_core::otp::keygen::KeyGenerator;

/// Run the generate-key command
///
/// Outputs only the key to stdout so it can be captured by scripts.
pub fn run_generate_key(length: Option<usize>, padding: bool) -> Result<(), OtpkitError> {
    let generator = match length {
        Some(length) => KeyGenerator::new(length)?,
        None => KeyGenerator::standard(),
    };

    let key = generator.generate();
    println!("{}", base32::encode(key.expose(), padding));

    Ok(())
}
