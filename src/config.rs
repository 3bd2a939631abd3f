use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_toast_duration_ms() -> u64 {
    4000
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("planner")
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("planner")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlannerConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub is_signup_disabled: bool,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            is_signup_disabled: false,
            debug_logging: false,
            request_timeout_secs: default_request_timeout_secs(),
            toast_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl PlannerConfig {
    pub fn config_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    pub fn storage_path(&self) -> PathBuf {
        default_data_dir().join("storage.json")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    /// Base URL of the planner endpoints, without a trailing slash.
    pub fn planner_url(&self) -> String {
        format!("{}/planner", self.api_base_url.trim_end_matches('/'))
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth", self.api_base_url.trim_end_matches('/'))
    }

    /// Load the config from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load the config, falling back to defaults when the file is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Error loading config from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Error parsing config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
