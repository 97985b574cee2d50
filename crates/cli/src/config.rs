//! Settings loading for CLI commands.
//!
//! Settings come from an optional TOML file merged with environment
//! variables prefixed with `BITPAY__`. A key file, when given, replaces
//! `client.encrypted_private_key`.

use std::fs;
use std::path::{Path, PathBuf};

use bitpay_client_common::{BitpayClient, Settings};

use crate::error::CliError;

/// Global options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct SettingsSource {
    pub config: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

/// Reads an encrypted key file, dropping surrounding whitespace.
pub fn read_key_file(path: &Path) -> Result<String, CliError> {
    let key = fs::read_to_string(path)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Config(format!(
            "key file {} is empty",
            path.display()
        )));
    }
    Ok(key.to_string())
}

pub fn load_settings(source: &SettingsSource) -> Result<Settings, CliError> {
    let content = match &source.config {
        Some(file) => {
            log::debug!("Loading config from: {}", file.display());
            fs::read_to_string(file)?
        }
        None => String::new(),
    };

    let settings = match &source.key_file {
        Some(path) => {
            log::debug!("Reading encrypted key from: {}", path.display());
            Settings::from_toml_with_key(&content, &read_key_file(path)?)?
        }
        None => Settings::from_toml(&content)?,
    };

    Ok(settings)
}

pub fn build_client(source: &SettingsSource) -> Result<BitpayClient, CliError> {
    let settings = load_settings(source)?;
    Ok(BitpayClient::from_settings(&settings)?)
}
