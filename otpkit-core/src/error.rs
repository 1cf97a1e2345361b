//! Error types for the otpkit OTP toolkit
//!
//! This module defines all error types used throughout the library,
//! separating "could not evaluate" failures from plain verification
//! mismatches, which are reported as `Ok(false)` instead.

use thiserror::Error;

/// Main error type for the otpkit application
#[derive(Error, Debug)]
pub enum OtpkitError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to OTP generation, verification or time sources
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// OTP generation, verification and time source errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// The HMAC primitive rejected the key material
    #[error("Invalid key")]
    InvalidKey,

    /// The requested hash primitive is not compiled into this build
    #[error("Hash algorithm unavailable: {algorithm}")]
    AlgorithmUnavailable { algorithm: String },

    /// Malformed Base32 input
    #[error("Invalid Base32 encoding")]
    InvalidEncoding,

    /// A parameter was rejected at construction time
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Requesting time from the network time server failed
    #[error("Time synchronization failed: {reason}")]
    TimeSyncError { reason: String },

    /// The network time source was used after being closed
    #[error("Time source is closed")]
    ClosedSource,
}

impl OtpError {
    pub(crate) fn invalid_configuration(message: impl Into<String>) -> Self {
        OtpError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub(crate) fn time_sync(reason: impl std::fmt::Display) -> Self {
        OtpError::TimeSyncError {
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OtpkitError>;
