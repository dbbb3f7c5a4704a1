/// Client configuration. Loaded from `leoverse.ron` at startup; the API
/// base URL can be overridden with `LEOVERSE_API_URL`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "leoverse.ron";
pub const API_URL_ENV: &str = "LEOVERSE_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the leaderboard/mission service.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the session snapshot is written.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_api_base_url() -> String {
    "http://localhost/leo".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("leoverse-storage.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_timeout_secs(),
            storage_path: default_storage_path(),
        }
    }
}

impl ClientConfig {
    /// Load from `leoverse.ron` in the working directory, then apply the
    /// environment override. Missing or invalid files fall back to defaults.
    pub fn load() -> Self {
        let path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_FILE);
        let mut config = Self::load_from(&path);
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        config
    }

    /// Load from a specific file without looking at the environment
    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Write the config back out. Logs on error.
    pub fn save_to(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not encode config: {}", e),
        }
    }

    fn apply_env_override(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
