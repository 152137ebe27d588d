//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Home name used when a command is issued without a target.
pub const DEFAULT_HOME: &str = "default";

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_secs: default_connection_timeout_secs(),
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Name of this server; stamped onto every location saved here.
    #[serde(default)]
    pub server_name: String,
    /// Home used when no target is given.
    #[serde(default = "default_home")]
    pub default_home: String,
    /// Lifetime of cached homes, indices and identities.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Lifetime of a pending invitation.
    #[serde(default = "default_invitation_ttl_secs")]
    pub invitation_ttl_secs: u64,
    /// Delay before a non-instant teleport fires.
    #[serde(default = "default_teleport_delay_ms")]
    pub teleport_delay_ms: u64,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_home() -> String {
    DEFAULT_HOME.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_invitation_ttl_secs() -> u64 {
    120
}

fn default_teleport_delay_ms() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server_name: String::new(),
            default_home: default_home(),
            cache_ttl_secs: default_cache_ttl_secs(),
            invitation_ttl_secs: default_invitation_ttl_secs(),
            teleport_delay_ms: default_teleport_delay_ms(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject values that would make the runtime misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_home.is_empty() {
            return Err(CoreError::Config("default_home must not be empty".into()));
        }
        if self.default_home.contains(':') || self.default_home.starts_with('@') {
            return Err(CoreError::Config(format!(
                "default_home '{}' must be a plain home name",
                self.default_home
            )));
        }
        if self.cache_ttl_secs == 0 {
            return Err(CoreError::Config("cache_ttl_secs must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(CoreError::Config(
                "database.max_connections must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("HOMES_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(server_name) = std::env::var("HOMES_SERVER_NAME") {
            self.server_name = server_name;
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn invitation_ttl(&self) -> Duration {
        Duration::from_secs(self.invitation_ttl_secs)
    }

    pub fn teleport_delay(&self) -> Duration {
        Duration::from_millis(self.teleport_delay_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connection_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.default_home, DEFAULT_HOME);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.invitation_ttl(), Duration::from_secs(120));
        assert_eq!(config.teleport_delay(), Duration::from_secs(5));
        assert_eq!(config.database.max_connections, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "server_name": "survival"
        }"#;

        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server_name, "survival");
        assert_eq!(config.default_home, DEFAULT_HOME);
        assert_eq!(config.invitation_ttl_secs, 120);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.default_home = "bed".to_string();
        config.teleport_delay_ms = 250;
        config.database.max_connections = 4;

        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.default_home, "bed");
        assert_eq!(loaded.teleport_delay(), Duration::from_millis(250));
        assert_eq!(loaded.database.max_connections, 4);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.default_home, DEFAULT_HOME);
        assert_eq!(config.cache_ttl_secs, 300);
    }

    #[test]
    fn test_config_invalid_json() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn test_validate_rejects_target_like_default_home() {
        let mut config = Config::default();
        config.default_home = "Steve:base".to_string();
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        config.default_home = "@3".to_string();
        assert!(config.validate().is_err());

        config.default_home = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ttl_and_pool() {
        let mut config = Config::default();
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
