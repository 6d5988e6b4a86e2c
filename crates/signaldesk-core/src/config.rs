//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds the
//! service location, list sizes, and the last used username.
//!
//! Configuration is stored at `~/.config/signaldesk/config.json`; the
//! durable session storage lives under the local data directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::pager::DEFAULT_PAGE_SIZE;

/// Application name used for config/data directory paths
const APP_NAME: &str = "signaldesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Durable key-value storage file name
const STORAGE_FILE: &str = "storage.json";

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/";
const DEFAULT_API_VERSION: &str = "v4";

/// How many signals a listing asks for by default
const DEFAULT_SIGNALS_LIMIT: u32 = 100;

/// Environment overrides
pub const ENV_SERVER_URL: &str = "SIGNALDESK_SERVER_URL";
pub const ENV_API_VERSION: &str = "SIGNALDESK_API_VERSION";
pub const ENV_USERNAME: &str = "SIGNALDESK_USERNAME";
pub const ENV_PASSWORD: &str = "SIGNALDESK_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub api_version: String,
    pub signals_limit: u32,
    pub page_size: usize,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            signals_limit: DEFAULT_SIGNALS_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents).context("Failed to parse config file")?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
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

    /// Apply overrides from the environment on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(version) = get(ENV_API_VERSION) {
            self.api_version = version;
        }
        if let Some(username) = get(ENV_USERNAME) {
            self.last_username = Some(username);
        }
    }

    /// Root of the versioned API, always ending in `/`
    pub fn api_base_url(&self) -> String {
        let server = self.server_url.trim_end_matches('/');
        let version = self.api_version.trim_matches('/');
        if version.is_empty() {
            format!("{}/", server)
        } else {
            format!("{}/{}/", server, version)
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn storage_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(STORAGE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_api_base_url_joins_cleanly() {
        let mut config = Config::default();
        assert_eq!(config.api_base_url(), "http://127.0.0.1:5000/v4/");

        config.server_url = "https://signals.example.com".into();
        config.api_version = "/v3/".into();
        assert_eq!(config.api_base_url(), "https://signals.example.com/v3/");

        config.api_version = String::new();
        assert_eq!(config.api_base_url(), "https://signals.example.com/");
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"server_url": "http://10.0.0.2:8080/"}"#).unwrap();
        assert_eq!(config.server_url, "http://10.0.0.2:8080/");
        assert_eq!(config.api_version, "v4");
        assert_eq!(config.signals_limit, 100);
        assert_eq!(config.page_size, 15);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVER_URL, "http://override:5000"),
            (ENV_API_VERSION, ""),
            (ENV_USERNAME, "ada"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server_url, "http://override:5000");
        // blank values are ignored
        assert_eq!(config.api_version, "v4");
        assert_eq!(config.last_username.as_deref(), Some("ada"));
    }
}
