//! Application configuration storage
//!
//! Handles persistent storage of the backend connection and editor settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use workflow_graph::constants::defaults as engine_defaults;
use workflow_graph::EditorOptions;

use crate::constants::{defaults, paths};

/// Full application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Base URL of the workflow backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Per-request timeout; requests never time out when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub editor: EditorOptions,
    /// File name used when exporting without an explicit path
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,
}

fn default_backend_url() -> String {
    defaults::BACKEND_URL.to_string()
}

fn default_export_file_name() -> String {
    engine_defaults::EXPORT_FILE_NAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: None,
            editor: EditorOptions::default(),
            export_file_name: default_export_file_name(),
        }
    }
}

impl AppConfig {
    /// Platform config directory for the app, if the platform has one
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR))
    }

    /// Load configuration from disk, falling back to defaults
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(paths::CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("No config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await?;

        let config_path = config_dir.join(paths::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("No configuration directory available; pass --config-dir")]
    NoConfigDir,
}
