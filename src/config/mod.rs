// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{CacheError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or the per-user default location)
    /// 3. Defaults (lowest)
    ///
    /// The loaded cache table is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // Override with environment variables (e.g. GLYPHCACHE__SERVER__PORT)
            .add_source(Environment::with_prefix("GLYPHCACHE").separator("__"))
            .build()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        app_config.cache.validate()?;
        Ok(app_config)
    }

    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".glyphcache")
            .join("config.toml")
    }
}
