//! Runtime configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clinic::DEFAULT_UPCOMING_LIMIT;

/// Default postal-code lookup endpoint; `{cep}` is replaced by the 8 digits.
pub const DEFAULT_ADDRESS_LOOKUP_URL: &str = "https://viacep.com.br/ws/{cep}/json/";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Clinic desk settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Entries shown in the home screen's upcoming list
    pub upcoming_limit: usize,
    /// Postal-code lookup URL template
    pub address_lookup_url: String,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("clinic-desk.db"),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            address_lookup_url: DEFAULT_ADDRESS_LOOKUP_URL.to_string(),
        }
    }
}

impl ClinicConfig {
    /// Read a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upcoming_limit == 0 {
            return Err(ConfigError::Invalid(
                "upcoming_limit must be at least 1".to_string(),
            ));
        }
        if !self.address_lookup_url.contains("{cep}") {
            return Err(ConfigError::Invalid(
                "address_lookup_url must contain {cep}".to_string(),
            ));
        }
        Ok(())
    }
}
