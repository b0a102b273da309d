//! Dashboard configuration
//!
//! Loaded from YAML, then `.env`, then the process environment. The
//! realtime and API endpoints can be supplied entirely from the environment.

use realtime::RealtimeSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Overrides `realtime.url`
pub const REALTIME_WS_URL_ENV: &str = "REALTIME_WS_URL";

/// Overrides `api.base_url`
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_realtime")]
    pub realtime: RealtimeSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub toasts: ToastSettings,
    /// How often the binary logs a feed summary
    #[serde(default = "default_summary_interval")]
    pub summary_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    /// Initial bearer token, usually supplied through `API_TOKEN`
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
        }
    }
}

/// Which subsystems may raise toasts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToastSettings {
    /// Toast when the realtime client gives up reconnecting
    #[serde(default = "enabled")]
    pub connection_alerts: bool,
    /// Toast on failed REST calls
    #[serde(default = "enabled")]
    pub request_alerts: bool,
    /// Toast on new notifications and filled orders
    #[serde(default = "enabled")]
    pub feed_alerts: bool,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            connection_alerts: true,
            request_alerts: true,
            feed_alerts: true,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            realtime: default_realtime(),
            api: ApiSettings::default(),
            toasts: ToastSettings::default(),
            summary_interval_secs: default_summary_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_realtime() -> RealtimeSettings {
    RealtimeSettings::new("ws://localhost:8080/ws")
}

fn default_summary_interval() -> u64 {
    30
}

fn enabled() -> bool {
    true
}

impl DashboardConfig {
    /// Load configuration from a YAML file and the environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: DashboardConfig = serde_yaml::from_str(&yaml_content)?;

        dotenv::dotenv().ok();
        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Defaults plus environment, for running without a file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Like [`from_env`](Self::from_env) but the realtime URL must come from the environment
    pub fn from_env_strict() -> Result<Self> {
        dotenv::dotenv().ok();

        if std::env::var(REALTIME_WS_URL_ENV).is_err() {
            return Err(ConfigError::EnvVarMissing(REALTIME_WS_URL_ENV.to_string()));
        }
        Self::from_env()
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(REALTIME_WS_URL_ENV) {
            info!("Overriding realtime URL from environment variable");
            self.realtime.url = url;
        }

        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            info!("Overriding API base URL from environment variable");
            self.api.base_url = url;
        }

        if let Ok(token) = std::env::var("API_TOKEN") {
            self.api.token = Some(token);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = self.realtime.url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "realtime.url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "realtime.url must start with ws:// or wss://, got '{}'",
                url
            )));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url cannot be empty".to_string(),
            ));
        }

        if self.summary_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "summary_interval_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Realtime URL: {}", self.realtime.url);
        if !self.realtime.protocols.is_empty() {
            info!("  Sub-protocols: {}", self.realtime.protocols.join(", "));
        }
        info!(
            "  Reconnect: every {} ms, at most {} attempts",
            self.realtime.reconnect_interval_ms, self.realtime.max_reconnect_attempts
        );
        match self.realtime.heartbeat_interval() {
            Some(interval) => info!("  Heartbeat: every {:?}", interval),
            None => info!("  Heartbeat: disabled"),
        }
        info!("  API base URL: {}", self.api.base_url);
        info!("  Log level: {}", self.log_level);
    }
}
