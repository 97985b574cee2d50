//! Client configuration.
//!
//! Settings are read from TOML and merged with environment variables
//! prefixed with `BITPAY__`. For example,
//! `BITPAY__CLIENT__PRIVATE_KEY_PASSWORD` overrides
//! `client.private_key_password`.

use std::fmt;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use validator::Validate;

use crate::constants::DEFAULT_BASE_URL;
use crate::error::BitpayError;

pub const ENVIRONMENT_PREFIX: &str = "BITPAY";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Key material and endpoint of one client.
#[derive(Clone, Deserialize, Validate)]
pub struct ClientConfig {
    /// Base58 ciphertext of the hex private key.
    #[validate(length(min = 1))]
    pub encrypted_private_key: String,
    #[serde(default)]
    pub private_key_password: String,
    #[serde(default = "default_base_url")]
    #[validate(url)]
    pub base_url: String,
}

impl ClientConfig {
    #[must_use]
    pub fn new(encrypted_private_key: impl Into<String>) -> Self {
        Self {
            encrypted_private_key: encrypted_private_key.into(),
            private_key_password: String::new(),
            base_url: default_base_url(),
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.private_key_password = password.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("encrypted_private_key", &"<redacted>")
            .field("private_key_password", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct HttpSettings {
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: Option<u64>,
}

impl HttpSettings {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub client: ClientConfig,
    #[serde(default)]
    #[validate(nested)]
    pub http: HttpSettings,
}

impl Settings {
    /// Parses `toml_str`, applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Configuration`] if the TOML is malformed, a
    /// required field is missing, or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<BitpayError>> {
        Self::build(toml_str, None)
    }

    /// Like [`Settings::from_toml`], with `client.encrypted_private_key`
    /// taken from `encrypted_private_key` instead of TOML or environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_toml`].
    pub fn from_toml_with_key(
        toml_str: &str,
        encrypted_private_key: &str,
    ) -> Result<Self, Report<BitpayError>> {
        Self::build(toml_str, Some(encrypted_private_key))
    }

    fn build(
        toml_str: &str,
        encrypted_private_key: Option<&str>,
    ) -> Result<Self, Report<BitpayError>> {
        let environment = Environment::with_prefix(ENVIRONMENT_PREFIX).separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let mut builder = Config::builder().add_source(toml).add_source(environment);
        if let Some(key) = encrypted_private_key {
            builder = builder
                .set_override("client.encrypted_private_key", key.trim())
                .change_context(BitpayError::Configuration {
                    message: "failed to apply key override".into(),
                })?;
        }

        let config = builder.build().change_context(BitpayError::Configuration {
            message: "failed to build configuration".into(),
        })?;

        let settings: Self = config
            .try_deserialize()
            .change_context(BitpayError::Configuration {
                message: "failed to deserialize configuration".into(),
            })?;

        settings
            .validate()
            .change_context(BitpayError::Configuration {
                message: "settings validation failed".into(),
            })?;

        Ok(settings)
    }

    /// Builds settings from environment variables alone.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_toml`].
    pub fn from_env() -> Result<Self, Report<BitpayError>> {
        Self::from_toml("")
    }
}
