use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::period::{LookbackWindow, DEFAULT_LOOKBACK_DAYS};

pub const DEFAULT_API_BASE_URL: &str = "https://api.freeagent.com/v2";
pub const DEFAULT_TOKEN_ENV: &str = "FREEAGENT_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for the accounting API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Upper bound on pages fetched per account; unbounded when absent.
    pub max_pages: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            request_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_pages: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub lookback_days: u64,
    /// SQLite ledger file; the platform data directory is used when absent.
    pub database_path: Option<PathBuf>,
    /// CSV rule table, re-read on every sync pass.
    pub rules_path: PathBuf,
    pub api: ApiConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            database_path: None,
            rules_path: PathBuf::from("mapping.csv"),
            api: ApiConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn lookback(&self) -> LookbackWindow {
        LookbackWindow::new(self.lookback_days)
    }
}
