//! TOML configuration file I/O
//!
//! Handles loading and saving OTP configuration to/from TOML files
//! in the user's configuration directory.

use crate::config::OtpConfig;
use crate::error::{ConfigError, OtpkitError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/otpkit, or the OTPKIT_CONFIG_DIR environment variable if set
pub fn get_config_dir() -> Result<PathBuf, OtpkitError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var("OTPKIT_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        OtpkitError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("otpkit"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, OtpkitError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load OTP configuration from the default TOML file
pub fn load_config() -> Result<OtpConfig, OtpkitError> {
    let config_path = get_config_path()?;
    load_config_from_path(&config_path)
}

/// Load the default TOML file, falling back to built-in defaults when it
/// does not exist
pub fn load_config_or_default() -> Result<OtpConfig, OtpkitError> {
    if config_exists()? {
        load_config()
    } else {
        debug!("No configuration file found, using defaults");
        Ok(OtpConfig::default())
    }
}

/// Load OTP configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<OtpConfig, OtpkitError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OtpkitError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => OtpkitError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: OtpConfig = toml::from_str(&contents).map_err(|e| {
        OtpkitError::Config(ConfigError::ValidationError {
            message: format!("Failed to parse config file: {}", e),
        })
    })?;

    // Validate the loaded configuration
    config
        .validate()
        .map_err(|e| OtpkitError::Config(ConfigError::ValidationError { message: e }))?;

    debug!(
        algorithm = %config.algorithm,
        digits = config.digits,
        period = config.period,
        "Loaded OTP configuration from {:?}",
        path.as_ref()
    );

    Ok(config)
}

/// Save OTP configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(config: &OtpConfig, path: P) -> Result<(), OtpkitError> {
    // Validate configuration before saving
    config
        .validate()
        .map_err(|e| OtpkitError::Config(ConfigError::ValidationError { message: e }))?;

    // Ensure config directory exists
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OtpkitError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(config)?;

    std::fs::write(&path, contents).map_err(|_e| {
        OtpkitError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved OTP configuration to {:?}", path.as_ref());
    Ok(())
}

/// Check if a configuration file exists
pub fn config_exists() -> Result<bool, OtpkitError> {
    let config_path = get_config_path()?;
    Ok(config_path.exists())
}
