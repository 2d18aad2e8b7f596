//! Engine configuration.

use crate::core::currency::CurrencyCode;
use crate::core::expense::DEFAULT_SPLIT_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How far explicit splits may miss the total, in minor units,
    /// before an expense is rejected.
    pub split_tolerance_minor_units: u32,

    /// Currency assumed for input that does not name one.
    pub default_currency: String,

    /// Log filter used by the CLI when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            split_tolerance_minor_units: DEFAULT_SPLIT_TOLERANCE,
            default_currency: "USD".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults overridden by `POTSPLIT_SPLIT_TOLERANCE`,
    /// `POTSPLIT_DEFAULT_CURRENCY` and `POTSPLIT_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("POTSPLIT_SPLIT_TOLERANCE") {
            self.split_tolerance_minor_units =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "POTSPLIT_SPLIT_TOLERANCE".to_string(),
                    value: value.clone(),
                })?;
        }
        if let Ok(value) = std::env::var("POTSPLIT_DEFAULT_CURRENCY") {
            self.default_currency = value;
        }
        if let Ok(value) = std::env::var("POTSPLIT_LOG") {
            self.log_level = value;
        }
        Ok(())
    }

    pub fn default_currency(&self) -> CurrencyCode {
        CurrencyCode::new(self.default_currency.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.split_tolerance_minor_units, 1);
        assert_eq!(config.default_currency().as_str(), "USD");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml("default_currency = \"EUR\"").unwrap();
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.split_tolerance_minor_units, 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            EngineConfig::from_toml("split_tolerance_minor_units = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
