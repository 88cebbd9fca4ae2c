//! Configuration data structures for the glyphcache daemon.
//!
//! This module defines the schema for the application settings: the admin
//! HTTP server, logging, and the per-generation cache table.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Admin HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generational cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8790`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes. Asset payloads are stored
    /// verbatim, so this bounds the size of a single cached image.
    /// Default: `32 MiB`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Capacity and lifetime of one generation's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of entries kept before LRU eviction.
    pub capacity: usize,

    /// TTL applied when a store does not supply its own.
    pub default_ttl_seconds: i64,
}

/// Settings for the generational cache registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Pair used for generation names missing from `generations`.
    #[serde(default = "default_generation")]
    pub default: GenerationConfig,

    /// Known asset generations and their cache sizing.
    #[serde(default = "default_generations")]
    pub generations: HashMap<String, GenerationConfig>,

    /// Collapse concurrent misses for the same key into one producer call.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub dedupe_in_flight: bool,

    /// Upper bound on unconfigured generations created from the fallback pair.
    /// Default: `16`
    #[serde(default = "default_max_fallback_generations")]
    pub max_fallback_generations: usize,

    /// Period of the background expiry sweep; `0` disables it.
    /// Default: `60`
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

/// Names that collide with fixed admin routes (`/cache/stats`).
pub const RESERVED_GENERATION_NAMES: &[&str] = &["stats"];

pub fn is_reserved_generation(name: &str) -> bool {
    RESERVED_GENERATION_NAMES.contains(&name)
}

impl GenerationConfig {
    pub const fn new(capacity: usize, default_ttl_seconds: i64) -> Self {
        Self {
            capacity,
            default_ttl_seconds,
        }
    }

    /// Rejects pairs that can never be valid for an explicitly configured generation.
    pub fn validate(&self, generation: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::Config(format!(
                "generation '{}': capacity must be greater than 0",
                generation
            )));
        }
        if self.default_ttl_seconds < 0 {
            return Err(CacheError::Config(format!(
                "generation '{}': default_ttl_seconds must not be negative (got {})",
                generation, self.default_ttl_seconds
            )));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(0) as u64)
    }
}

impl CacheSettings {
    /// Validates the fallback pair and every configured generation.
    pub fn validate(&self) -> Result<()> {
        self.default.validate("<default>")?;
        for (name, generation) in &self.generations {
            if name.trim().is_empty() {
                return Err(CacheError::Config(
                    "generation names must not be empty".to_string(),
                ));
            }
            if is_reserved_generation(name) {
                return Err(CacheError::Config(format!(
                    "generation name '{}' is reserved",
                    name
                )));
            }
            generation.validate(name)?;
        }
        Ok(())
    }

    /// Configuration for `generation`, or `None` when it falls back to the default pair.
    pub fn lookup(&self, generation: &str) -> Option<GenerationConfig> {
        self.generations.get(generation).copied()
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default: default_generation(),
            generations: default_generations(),
            dedupe_in_flight: true,
            max_fallback_generations: default_max_fallback_generations(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8790
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_fallback_generations() -> usize {
    16
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_generation() -> GenerationConfig {
    GenerationConfig::new(64, 900)
}

// Near-static textures keep fewer entries for longer; directed output is
// highly parameterized, so it gets more slots with a short lifetime.
fn default_generations() -> HashMap<String, GenerationConfig> {
    [
        ("parchment", GenerationConfig::new(32, 3600)),
        ("enso", GenerationConfig::new(128, 1800)),
        ("sigil", GenerationConfig::new(128, 1800)),
        ("directed_enso", GenerationConfig::new(256, 600)),
    ]
    .into_iter()
    .map(|(name, config)| (name.to_string(), config))
    .collect()
}
