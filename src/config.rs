//! Configuration management

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::player::{RetryPolicy, DEFAULT_RETRY_DELAY};

pub const DEFAULT_USER_AGENT: &str = "IPTVPlayer/1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Prefix prepended to every stream url (empty = no proxy)
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Last playlist source loaded
    #[serde(default)]
    pub playlist_url: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    // Retry after playback errors
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// 0 = retry forever
    #[serde(default)]
    pub retry_max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub retry_backoff: f64,
    /// Drop history older than this many days on startup (0 = keep)
    #[serde(default)]
    pub history_retention_days: u32,
}

fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_volume() -> f32 { 1.0 }
fn default_retry_delay_ms() -> u64 { DEFAULT_RETRY_DELAY.as_millis() as u64 }
fn default_backoff() -> f64 { 1.0 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_url: String::new(),
            user_agent: default_user_agent(),
            playlist_url: String::new(),
            volume: 1.0,
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_attempts: 0,
            retry_backoff: 1.0,
            history_retention_days: 0,
        }
    }
}

/// Directory holding config.json and catalog.json
pub fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("iptv_player");
    path
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        app_dir().join("config.json")
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Invalid config {}: {}", path.display(), e),
                },
                Err(e) => warn!("Cannot read config {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Proxy prefix, if one is configured
    pub fn proxy_prefix(&self) -> Option<&str> {
        Some(self.proxy_url.as_str()).filter(|p| !p.is_empty())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::fixed(Duration::from_millis(self.retry_delay_ms))
            .with_backoff(self.retry_backoff);
        if self.retry_max_attempts > 0 {
            policy = policy.with_max_attempts(self.retry_max_attempts);
        }
        policy
    }

    /// Cutoff for history retention, if enabled
    pub fn history_cutoff(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if self.history_retention_days == 0 {
            return None;
        }
        Some(chrono::Utc::now() - chrono::Duration::days(self.history_retention_days as i64))
    }
}
