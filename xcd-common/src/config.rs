//! Bootstrap configuration for the XC Draft services
//!
//! A small TOML file carries everything a service needs before it can open
//! the database. Sources, highest priority first:
//!
//! 1. Command-line arguments (`--config`, `--port`, `--database`)
//! 2. Environment variables (`XCD_CONFIG`, `ADMIN_PASSWORD`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Nothing here changes while a service is running.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "XCD_CONFIG";

/// Environment variable overriding the admin password
pub const ADMIN_PASSWORD_ENV_VAR: &str = "ADMIN_PASSWORD";

/// Directory name used under the platform config and data dirs
const APP_DIR: &str = "xcdraft";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    ///
    /// Default: 3001
    #[serde(default = "default_port")]
    pub port: u16,

    /// Password required on mutating admin routes; empty disables the check
    #[serde(default)]
    pub admin_password: String,

    #[serde(default)]
    pub live_race: LiveRaceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Live race tracking settings
#[derive(Debug, Clone, Deserialize)]
pub struct LiveRaceConfig {
    /// Upper bound on a single feed fetch
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Base URL of the timing feed's JSON store
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    /// Poll interval advertised to snapshot consumers
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("xcdraft.db"))
        .unwrap_or_else(|| PathBuf::from("./xcdraft.db"))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_feed_base_url() -> String {
    "https://ptt-franklin.firebaseio.com".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: default_host(),
            port: default_port(),
            admin_password: String::new(),
            live_race: LiveRaceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LiveRaceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            feed_base_url: default_feed_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LiveRaceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
}

impl TomlConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from every source, applying priority order.
    ///
    /// An explicitly named file (CLI or `XCD_CONFIG`) must exist. The
    /// platform default file is optional.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match resolve_config_path(overrides.config_path.as_deref())? {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                let config = Self::from_toml_str(&content)?;
                info!("Loaded TOML configuration from {:?}", path);
                config
            }
            None => {
                info!("No config file found, using built-in defaults");
                Self::default()
            }
        };

        if let Ok(password) = std::env::var(ADMIN_PASSWORD_ENV_VAR) {
            config.admin_password = password;
        }
        if let Some(path) = &overrides.database_path {
            config.database_path = path.clone();
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }

        Ok(config)
    }

    /// `host:port` for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pick the config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf()).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return require_exists(PathBuf::from(path)).map(Some);
        }
    }

    // Priority 3: platform config dir
    Ok(dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .filter(|p| p.exists()))
}

fn require_exists(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        assert_eq!(default_port(), 3001);
        assert_eq!(default_log_level(), "info");

        let config = TomlConfig::default();
        assert_eq!(config.live_race.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.live_race.poll_interval_secs, 10);
        assert!(config.admin_password.is_empty());
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 4100
            admin_password = "hunter2"

            [live_race]
            fetch_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 4100);
        assert_eq!(config.admin_password, "hunter2");
        assert_eq!(config.live_race.fetch_timeout_ms, 2500);
        assert_eq!(config.live_race.feed_base_url, "https://ptt-franklin.firebaseio.com");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[serial]
    fn test_cli_path_beats_env_and_overrides_apply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 5000\ndatabase_path = \"/tmp/from-file.db\"").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, "/definitely/missing/config.toml");
        std::env::remove_var(ADMIN_PASSWORD_ENV_VAR);

        let overrides = ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            database_path: None,
            port: Some(6000),
        };
        let config = TomlConfig::load(&overrides).unwrap();

        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.port, 6000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/from-file.db"));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        std::env::set_var(CONFIG_ENV_VAR, "/definitely/missing/config.toml");
        let result = TomlConfig::load(&ConfigOverrides::default());
        std::env::remove_var(CONFIG_ENV_VAR);

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_admin_password_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "admin_password = \"from-file\"").unwrap();

        std::env::set_var(ADMIN_PASSWORD_ENV_VAR, "from-env");
        let overrides = ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = TomlConfig::load(&overrides).unwrap();
        std::env::remove_var(ADMIN_PASSWORD_ENV_VAR);

        assert_eq!(config.admin_password, "from-env");
    }
}
