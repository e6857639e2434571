//! Engine configuration
//!
//! This module handles loading configuration from:
//! - Default values
//! - Configuration files (YAML/TOML/JSON)
//! - Builders, for configurations assembled in code

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Name of the scratch key results accumulate under before the final rename
pub const VIRTUAL_PACK: &str = "virtual_pack";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Top-level key the transformed data is packed under
    pub pack: String,

    /// Extra data merged into every response
    pub additional: Map<String, Value>,

    /// Top-level key pagination metadata is packed under
    pub pagination_pack: String,

    /// Field names used in the pagination metadata block
    pub pagination_info: PaginationInfo,
}

/// Output field names for the four pagination values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationInfo {
    pub current_page: String,
    pub last_page: String,
    pub per_page: String,
    pub total: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pack: "data".to_string(),
            additional: Map::new(),
            pagination_pack: "meta".to_string(),
            pagination_info: PaginationInfo::default(),
        }
    }
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            current_page: "current_page".to_string(),
            last_page: "last_page".to_string(),
            per_page: "per_page".to_string(),
            total: "total".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// The format follows the extension: `.yaml`/`.yml` for YAML, `.toml`
    /// for TOML, JSON otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to load config");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            Self::from_file(path)
        } else {
            Self::load()
        }
    }

    fn default_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("respack.yaml"),
            PathBuf::from("respack.json"),
            PathBuf::from(".respack.toml"),
        ]
    }

    /// Check that the pack keys are usable
    pub fn validate(&self) -> Result<()> {
        if self.pack.is_empty() {
            return Err(Error::configuration("pack must not be empty"));
        }
        if self.pagination_pack.is_empty() {
            return Err(Error::configuration("pagination_pack must not be empty"));
        }
        if self.pack == VIRTUAL_PACK {
            return Err(Error::configuration(format!(
                "pack must not be the reserved key \"{}\"",
                VIRTUAL_PACK
            )));
        }
        if self.pagination_pack == VIRTUAL_PACK {
            return Err(Error::configuration(format!(
                "pagination_pack must not be the reserved key \"{}\"",
                VIRTUAL_PACK
            )));
        }
        if self.pagination_pack == self.pack {
            return Err(Error::configuration(format!(
                "pack and pagination_pack must differ, both are \"{}\"",
                self.pack
            )));
        }
        if self.additional.contains_key(VIRTUAL_PACK) {
            return Err(Error::configuration(format!(
                "additional data must not contain the reserved key \"{}\"",
                VIRTUAL_PACK
            )));
        }
        self.pagination_info.validate()
    }
}

impl PaginationInfo {
    fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("current_page", self.current_page.as_str()),
            ("last_page", self.last_page.as_str()),
            ("per_page", self.per_page.as_str()),
            ("total", self.total.as_str()),
        ]
    }

    /// Check that the four field names are non-empty and distinct
    pub fn validate(&self) -> Result<()> {
        let fields = self.fields();
        for (index, (field, name)) in fields.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::configuration(format!(
                    "pagination_info.{} must not be empty",
                    field
                )));
            }
            if let Some((other, _)) = fields[..index].iter().find(|(_, n)| n == name) {
                return Err(Error::configuration(format!(
                    "pagination_info.{} and pagination_info.{} share the name \"{}\"",
                    other, field, name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for creating configurations programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pack(mut self, pack: impl Into<String>) -> Self {
        self.config.pack = pack.into();
        self
    }

    pub fn pagination_pack(mut self, pagination_pack: impl Into<String>) -> Self {
        self.config.pagination_pack = pagination_pack.into();
        self
    }

    pub fn pagination_info(mut self, info: PaginationInfo) -> Self {
        self.config.pagination_info = info;
        self
    }

    /// Add one entry to the additional data
    pub fn additional(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.additional.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
