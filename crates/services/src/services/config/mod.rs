use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Server settings read from `config.json` in the asset directory.
/// Missing keys take their default value.
#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` uses the database file inside the asset directory.
    pub database_url: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub notifications: NotificationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Buffered messages per live notification stream.
    pub stream_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            database_url: None,
            cors_origins: Vec::new(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            stream_capacity: 256,
        }
    }
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid config file, using defaults: {}", e);
                Config::default()
            }
        }
    }
}

impl Config {
    /// Applies `HOST`, `BACKEND_PORT` (or `PORT`) and `DATABASE_URL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("HOST").filter(|h| !h.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(port) = var("BACKEND_PORT").or_else(|| var("PORT")) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!("Ignoring invalid port value '{}': {}", port.trim(), e),
            }
        }
        if let Some(url) = var("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.database_url = Some(url);
        }
    }
}

/// Will always return config, falling back to defaults
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from(raw_config),
        Err(_) => {
            tracing::info!("No config file found at {}, using defaults", config_path.display());
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let raw_config = serde_json::to_string_pretty(config)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}
