//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, the last login email and the preload step timeout.
//!
//! Configuration is stored at `~/.config/shopcache/config.json`. The API
//! URL can be overridden with `SHOPCACHE_API_URL`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cache::{StoreConfig, DEFAULT_STEP_TIMEOUT_SECS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "shopcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured API URL
pub const API_URL_ENV: &str = "SHOPCACHE_API_URL";

/// Used when neither the config nor the environment names an API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_username: Option<String>,
    /// Per-step preload timeout in seconds; 0 disables it
    pub step_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Session, marker and log files live here. Independent of the loaded
    /// config so logging can start before anything is read.
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Environment first, then config, then the local default
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn store_config(&self) -> StoreConfig {
        let secs = self.step_timeout_secs.unwrap_or(DEFAULT_STEP_TIMEOUT_SECS);
        StoreConfig {
            step_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}
