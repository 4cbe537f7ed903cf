//! Application configuration management.
//!
//! This module handles loading and saving the configuration: API base URL,
//! retry settings, the app origin the offline agent controls, and the cache
//! version stem.
//!
//! Configuration is stored at `~/.config/parva/config.json`. Any field can
//! be overridden by a `PARVA_*` environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::client::{DEFAULT_BACKOFF_MS, DEFAULT_BASE_URL, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::cache::CacheVersion;
use crate::offline::agent::DEFAULT_PRECACHE_PATHS;
use crate::offline::AgentConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "parva";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_CACHE_PREFIX: &str = "parva";
const DEFAULT_CACHE_VERSION: &str = "v5";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    /// Origin served by the app shell; the offline agent's scope.
    pub origin: String,
    pub retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
    pub cache_prefix: String,
    pub cache_version: String,
    pub precache_paths: Vec<String>,
    pub strategy_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_BASE_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            retries: DEFAULT_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            precache_paths: DEFAULT_PRECACHE_PATHS.iter().map(|p| p.to_string()).collect(),
            strategy_timeout_ms: None,
        }
    }
}

impl Config {
    /// Load from the config file (defaults if missing), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Write to the default config path and return where it went.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `PARVA_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("PARVA_API_BASE") {
            self.api_base = value;
        }
        if let Some(value) = lookup("PARVA_ORIGIN") {
            self.origin = value;
        }
        if let Some(value) = lookup("PARVA_RETRIES") {
            self.retries = value.parse().context("PARVA_RETRIES must be an integer")?;
        }
        if let Some(value) = lookup("PARVA_BACKOFF_MS") {
            self.backoff_ms = value.parse().context("PARVA_BACKOFF_MS must be an integer")?;
        }
        if let Some(value) = lookup("PARVA_TIMEOUT_SECS") {
            self.timeout_secs = value
                .parse()
                .context("PARVA_TIMEOUT_SECS must be an integer")?;
        }
        if let Some(value) = lookup("PARVA_STRATEGY_TIMEOUT_MS") {
            self.strategy_timeout_ms = Some(
                value
                    .parse()
                    .context("PARVA_STRATEGY_TIMEOUT_MS must be an integer")?,
            );
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_version(&self) -> CacheVersion {
        CacheVersion::new(&self.cache_prefix, &self.cache_version)
    }

    pub fn agent_config(&self) -> Result<AgentConfig> {
        let scope = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin: {}", self.origin))?;
        let mut config = AgentConfig::new(scope, self.cache_version());
        config.precache_paths = self.precache_paths.clone();
        config.strategy_timeout = self.strategy_timeout_ms.map(Duration::from_millis);
        Ok(config)
    }
}
