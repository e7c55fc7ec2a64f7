//! Application configuration management.
//!
//! Configuration holds the application origin, the release version that
//! names the cache compartments, the last known API host and an optional
//! platform request timeout.
//!
//! Configuration is stored at `~/.config/pitchcache/config.json`; any
//! `PITCHCACHE_*` environment variable overrides the stored value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Url;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pitchcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ORIGIN: &str = "http://localhost:8080";

const ENV_ORIGIN: &str = "PITCHCACHE_ORIGIN";
const ENV_RELEASE: &str = "PITCHCACHE_RELEASE";
const ENV_API_HOST: &str = "PITCHCACHE_API_HOST";

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_release() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_release")]
    pub release_version: String,
    #[serde(default)]
    pub api_host: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            release_version: default_release(),
            api_host: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load the config at `path` (default location when `None`), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
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

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(origin) = lookup(ENV_ORIGIN) {
            self.origin = origin;
        }
        if let Some(release) = lookup(ENV_RELEASE) {
            self.release_version = release;
        }
        if let Some(host) = lookup(ENV_API_HOST) {
            self.api_host = Some(host);
        }
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
