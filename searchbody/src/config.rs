//! Builder configuration
//!
//! Every field has a default, so an empty TOML file is a valid config:
//!
//! ```toml
//! from = 0
//! size = 15
//! global_name = "all"
//! filtered_kind = "terms"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BuilderConfig {
    /// Default pagination offset
    #[serde(default)]
    pub from: u64,
    /// Default page size
    #[serde(default = "default_size")]
    pub size: u64,
    /// Name of the `global` aggregation wrapping a filtered aggregation
    #[serde(default = "default_global_name")]
    pub global_name: String,
    /// Aggregation kind of the bucket inside a filtered aggregation
    #[serde(default = "default_filtered_kind")]
    pub filtered_kind: String,
}

fn default_size() -> u64 {
    15
}

fn default_global_name() -> String {
    "all".to_string()
}

fn default_filtered_kind() -> String {
    "terms".to_string()
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            from: 0,
            size: default_size(),
            global_name: default_global_name(),
            filtered_kind: default_filtered_kind(),
        }
    }
}

impl BuilderConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: BuilderConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.global_name.is_empty() {
            return Err(Error::Config("global_name must not be empty".to_string()));
        }
        if self.filtered_kind.is_empty() {
            return Err(Error::Config("filtered_kind must not be empty".to_string()));
        }
        Ok(())
    }
}
