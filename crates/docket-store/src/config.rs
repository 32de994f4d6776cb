//! Docket configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default root key holding the catalog
pub const DEFAULT_CATALOG_KEY: &str = "portfolioData";

/// Docket configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocketConfig {
    /// Store key holding `{ portfolios, products }`
    pub catalog_key: String,
    /// Unread notices buffered per subscriber before it lags
    pub bus_capacity: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl DocketConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With catalog key
    #[inline]
    #[must_use]
    pub fn with_catalog_key(mut self, key: impl Into<String>) -> Self {
        self.catalog_key = key.into();
        self
    }

    /// With bus capacity
    #[inline]
    #[must_use]
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`DocketConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check values are usable
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_key.trim().is_empty() {
            return Err(ConfigError::Invalid("catalog_key must not be empty".into()));
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::Invalid("bus_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self {
            catalog_key: DEFAULT_CATALOG_KEY.to_string(),
            bus_capacity: 64,
            log_filter: "info".to_string(),
        }
    }
}
