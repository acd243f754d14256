//! Application configuration management.
//!
//! Configuration is stored at `~/.config/campusdesk/config.json`. Missing
//! fields take their defaults, so older files keep loading as settings are
//! added.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "campusdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// A refresh must land at least this long before the access token lapses.
const REFRESH_SAFETY_MARGIN_SECS: u64 = 30;

pub const ENV_API_URL: &str = "CAMPUSDESK_API_URL";
pub const ENV_REFRESH_SECS: &str = "CAMPUSDESK_REFRESH_SECS";
pub const ENV_ENROLLMENT: &str = "CAMPUSDESK_ENROLLMENT";
pub const ENV_PASSWORD: &str = "CAMPUSDESK_PASSWORD";

/// Where the token pair is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub refresh_interval_secs: u64,
    /// Documented access token lifetime; only used to sanity-check the interval.
    pub access_token_lifetime_secs: u64,
    pub notification_poll_secs: u64,
    pub request_timeout_secs: u64,
    pub token_storage: TokenStorage,
    pub last_enrollment_number: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            refresh_interval_secs: 4 * 60,
            access_token_lifetime_secs: 5 * 60,
            notification_poll_secs: 30,
            request_timeout_secs: 30,
            token_storage: TokenStorage::File,
            last_enrollment_number: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?)
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

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Holds cached API data, the file token store and the log file.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_REFRESH_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.refresh_interval_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring unparseable {}", ENV_REFRESH_SECS),
            }
        }
    }

    /// API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn notification_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Problems worth telling the user about. None of them stop the app.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.refresh_interval_secs == 0 {
            warnings.push("refresh_interval_secs is 0; tokens would be refreshed continuously".to_string());
        }

        let deadline = self
            .access_token_lifetime_secs
            .saturating_sub(REFRESH_SAFETY_MARGIN_SECS);
        if self.refresh_interval_secs >= deadline {
            warnings.push(format!(
                "refresh_interval_secs ({}) should be below the access token lifetime ({}s) minus {}s",
                self.refresh_interval_secs, self.access_token_lifetime_secs, REFRESH_SAFETY_MARGIN_SECS
            ));
        }

        if self.notification_poll_secs == 0 {
            warnings.push("notification_poll_secs is 0; using 1 second".to_string());
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            warnings.push(format!("api_base_url '{}' is not an http(s) URL", self.api_base_url));
        }

        warnings
    }
}
