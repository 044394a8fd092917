use std::{collections::HashSet, path::Path};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LoggingConfig;

/// Prefix of environment overrides, e.g. `FLEXLINK_BROKER__CHANNEL_CAPACITY`.
pub const ENV_PREFIX: &str = "FLEXLINK";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Buffer of every backing channel.
    pub channel_capacity: usize,
}

/// One messaging destination bound to a backing channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub id: String,
    /// Backing channel; the destination id when absent.
    #[serde(default)]
    pub channel: Option<String>,
    /// Roles accepted by the destination. Empty means open.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub destinations: Vec<DestinationConfig>,
    pub logging: LoggingConfig,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl DestinationConfig {
    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.id)
    }
}

impl Settings {
    /// Defaults, then the file at `path` (format from its extension), then
    /// `FLEXLINK_*` environment variables with `__` between nested keys.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            // Defaults
            .set_default("broker.channel_capacity", 1024)?
            .set_default("logging.level", "info")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.broker.channel_capacity == 0 {
            return Err(SettingsError::Invalid(
                "broker.channel_capacity must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            if destination.id.trim().is_empty() {
                return Err(SettingsError::Invalid(
                    "destination id must not be empty".to_string(),
                ));
            }
            if !seen.insert(destination.id.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "destination '{}' is declared twice",
                    destination.id
                )));
            }
        }

        self.logging
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}
