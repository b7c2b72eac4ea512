//! # Configuration
//!
//! Settings for the database and the report engine.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`QUILATE_*`)
//! 2. Config file (`quilate.toml`; `QUILATE_CONFIG` names another path)
//! 3. Defaults (this file)
//!
//! ## Example `quilate.toml`
//! ```toml
//! tenant_id = "joyeria-centro"
//!
//! [database]
//! path = "/var/lib/quilate/quilate.db"
//! max_connections = 5
//!
//! [engine]
//! card_fee_bps = 300
//! utc_offset_minutes = -360
//! overdue_days = 75
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::pool::DbConfig;
use quilate_core::EngineSettings;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not read config file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Malformed config file: {0}")]
    Malformed(#[from] toml::de::Error),

    #[error("Could not determine the data directory")]
    NoDataDir,

    #[error("Invalid engine settings: {0}")]
    Engine(#[from] quilate_core::CoreError),
}

/// Database section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file. Empty means the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 30,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Whole configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuilateConfig {
    /// Tenant the command-line tools act on when none is given.
    pub tenant_id: Option<String>,
    pub database: DatabaseSettings,
    pub engine: EngineSettings,
}

impl QuilateConfig {
    /// Loads defaults → file → process environment, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable variable lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = match env("QUILATE_CONFIG") {
            Some(explicit) => Some(PathBuf::from(explicit)),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => QuilateConfig::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading config file");
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `QUILATE_*` overrides.
    ///
    /// ## Environment Variables
    /// - `QUILATE_DB_PATH`: SQLite file
    /// - `QUILATE_DB_MAX_CONNECTIONS`: pool size
    /// - `QUILATE_CARD_FEE_BPS`: card fee (300 = 3%)
    /// - `QUILATE_UTC_OFFSET_MINUTES`: store offset (-360 = UTC−06)
    /// - `QUILATE_OVERDUE_DAYS`: overdue sweep threshold
    /// - `QUILATE_TENANT_ID`: default tenant
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = env("QUILATE_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = env("QUILATE_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("QUILATE_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = env("QUILATE_CARD_FEE_BPS") {
            self.engine.card_fee_bps = parse_var("QUILATE_CARD_FEE_BPS", &raw)?;
        }
        if let Some(raw) = env("QUILATE_UTC_OFFSET_MINUTES") {
            self.engine.utc_offset_minutes = parse_var("QUILATE_UTC_OFFSET_MINUTES", &raw)?;
        }
        if let Some(raw) = env("QUILATE_OVERDUE_DAYS") {
            self.engine.overdue_days = parse_var("QUILATE_OVERDUE_DAYS", &raw)?;
        }
        if let Some(tenant) = env("QUILATE_TENANT_ID") {
            self.tenant_id = Some(tenant);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue("database.min_connections".to_string()));
        }
        Ok(())
    }

    /// Pool configuration for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };
        info!(path = %path.display(), "Database path resolved");

        Ok(DbConfig::new(path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms)))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("mx", "quilate", "quilate")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("quilate.toml"))
}

/// `quilate.db` in the platform data directory, created if missing.
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::Unreadable {
        path: data_dir.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(data_dir.join("quilate.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = QuilateConfig::from_toml(
            r#"
            [engine]
            card_fee_bps = 350
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.card_fee_bps, 350);
        assert_eq!(config.engine.overdue_days, 75);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.tenant_id.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = QuilateConfig::from_toml("tenant_id = \"a\"\n[engine]\noverdue_days = 30\n").unwrap();
        let env = vars(&[
            ("QUILATE_TENANT_ID", "b"),
            ("QUILATE_OVERDUE_DAYS", "60"),
            ("QUILATE_DB_PATH", "/tmp/q.db"),
        ]);
        config.apply_env(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.tenant_id.as_deref(), Some("b"));
        assert_eq!(config.engine.overdue_days, 60);
        assert_eq!(config.db_config().unwrap().database_path, PathBuf::from("/tmp/q.db"));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let env = vars(&[("QUILATE_CARD_FEE_BPS", "tres")]);
        let err = QuilateConfig::default().apply_env(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "QUILATE_CARD_FEE_BPS"));

        let env = vars(&[("QUILATE_CONFIG", "/nonexistent/quilate.toml")]);
        assert!(matches!(
            QuilateConfig::load_with(|k| env.get(k).cloned()),
            Err(ConfigError::Unreadable { .. })
        ));

        let mut config = QuilateConfig::default();
        config.engine.utc_offset_minutes = 24 * 60;
        assert!(matches!(config.validate(), Err(ConfigError::Engine(_))));
    }
}
