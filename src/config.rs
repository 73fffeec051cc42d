//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub locations: LocationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted tables API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Project API key, sent as both `apikey` and bearer token
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Durable session storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_storage_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("voting-admin").to_string_lossy().to_string())
        .unwrap_or_else(|| "./voting_admin_data".to_string())
}

fn default_storage_key() -> String {
    "user".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
        }
    }
}

/// Dashboard screen configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_page_size() -> u64 {
    10
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// Locations map configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LocationsConfig {
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    #[serde(default = "default_tile_url")]
    pub tile_url: String,
}

// Surabaya
fn default_latitude() -> f64 {
    -7.2575
}

fn default_longitude() -> f64 {
    112.7521
}

fn default_zoom() -> u8 {
    13
}

fn default_tile_url() -> String {
    "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            zoom: default_zoom(),
            tile_url: default_tile_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, the default locations, or the environment
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("voting-admin").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Backend overrides
        if let Ok(url) = std::env::var("VOTING_ADMIN_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("VOTING_ADMIN_API_KEY") {
            self.backend.api_key = key;
        }

        // Session overrides
        if let Ok(dir) = std::env::var("VOTING_ADMIN_SESSION_DIR") {
            self.session.storage_dir = dir;
        }

        // Dashboard overrides
        if let Ok(secs) = std::env::var("VOTING_ADMIN_REFRESH_SECS") {
            if let Ok(s) = secs.parse() {
                self.dashboard.refresh_interval_secs = s;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("VOTING_ADMIN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VOTING_ADMIN_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Voting Admin Configuration
#
# Environment variables override these settings:
# - VOTING_ADMIN_BACKEND_URL
# - VOTING_ADMIN_API_KEY
# - VOTING_ADMIN_SESSION_DIR
# - VOTING_ADMIN_REFRESH_SECS
# - VOTING_ADMIN_LOG_LEVEL
# - VOTING_ADMIN_LOG_FORMAT

[backend]
# Base URL of the hosted project (the REST API lives under /rest/v1)
url = "http://localhost:54321"

# Project API key
api_key = ""

# Request timeout in seconds
request_timeout_secs = 30

[session]
# Directory holding the durable session record
storage_dir = "~/.local/share/voting-admin"

# Key the current user is stored under
storage_key = "user"

[dashboard]
# Users per page
page_size = 10

# Refresh interval for `dashboard --watch` (seconds)
refresh_interval_secs = 30

[locations]
# Map center used when there are no locations
default_latitude = -7.2575
default_longitude = 112.7521

# Map zoom level
zoom = 13

# Slippy map tile URL template
tile_url = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dashboard.page_size, 10);
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
        assert_eq!(config.session.storage_key, "user");
        assert_eq!(config.locations.zoom, 13);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.backend.url, "http://localhost:54321");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.locations.default_latitude, -7.2575);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [backend]
            url = "https://project.example.co"
            api_key = "anon"

            [dashboard]
            page_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "https://project.example.co");
        assert_eq!(config.backend.api_key, "anon");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.dashboard.page_size, 25);
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\nurl = 1").unwrap();

        let err = Config::load(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/voting-admin.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
