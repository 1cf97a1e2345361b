//! otpkit - HOTP/TOTP command line tool
//!
//! Generates Base32 keys, prints one-time passwords and verifies codes
//! entered by users, optionally against a network time server.

use clap::{Parser, Subcommand};
use otpkit_core::{
    error::{OtpError, OtpkitError},
    init_logging,
};

mod cli;

#[derive(Parser)]
#[command(name = "otpkit")]
#[command(about = "Generate and verify HOTP/TOTP one-time passwords")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random Base32 key
    GenerateKey {
        /// Key length in bytes
        #[arg(short, long)]
        length: Option<usize>,
        /// Pad the key to a multiple of 8 symbols
        #[arg(short, long)]
        padding: bool,
    },
    /// Print the current code for a Base32 key
    Code {
        /// Base32 key; spaces are ignored
        key: String,
        #[command(flatten)]
        mode: cli::OtpMode,
        /// Generate the TOTP code for this Unix time instead of now
        #[arg(long, conflicts_with = "hotp", allow_negative_numbers = true)]
        at: Option<i64>,
    },
    /// Check a code against a Base32 key
    Verify {
        /// Base32 key; spaces are ignored
        key: String,
        /// Code entered by the user
        code: String,
        #[command(flatten)]
        mode: cli::OtpMode,
    },
}

fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::GenerateKey { length, padding } => {
            cli::generate_key::run_generate_key(length, padding)
        }
        Commands::Code { key, mode, at } => cli::code::run_code(&key, &mode, at),
        Commands::Verify { key, code, mode } => match cli::verify::run_verify(&key, &code, &mode) {
            // A rejected code is a runtime failure, not an error message
            Ok(false) => std::process::exit(1),
            other => other.map(|_| ()),
        },
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                OtpkitError::Config(_) | OtpkitError::Toml(_) | OtpkitError::TomlSerialize(_) => 2,
                // OTP errors - distinguish between time sync vs bad input
                OtpkitError::Otp(ref otp_error) => match otp_error {
                    OtpError::TimeSyncError { .. } => 1,
                    OtpError::ClosedSource => 1,
                    OtpError::InvalidKey => 2,
                    OtpError::AlgorithmUnavailable { .. } => 2,
                    OtpError::InvalidEncoding => 2,
                    OtpError::InvalidConfiguration { .. } => 2,
                },
                // IO errors (exit code 1 - runtime)
                OtpkitError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
