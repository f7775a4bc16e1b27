//! Process configuration.
//!
//! # Responsibility
//! - Load directory settings from TOML once at process start.
//! - Apply environment overrides through an injected lookup.
//!
//! # Invariants
//! - A returned config has passed `validate()`.
//! - Core modules receive config values explicitly; nothing below the entry
//!   point reads the environment.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "ORGDIR_API_KEY";
pub const ENV_DB_PATH: &str = "ORGDIR_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "ORGDIR_LOG_LEVEL";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
            Self::Validation(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Value expected in the `X-API-Key` header.
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_level_string")]
    pub level: String,
    /// Absolute directory for rotated log files. `None` disables file logging.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Mirror log lines to stderr.
    #[serde(default)]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level_string(),
            dir: None,
            stderr: false,
        }
    }
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

impl DirectoryConfig {
    /// Minimal config pointing at one database file.
    pub fn for_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig { path: path.into() },
            access: AccessConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parses TOML text, normalizes and validates it.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let mut cfg: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse {
            path: None,
            source: err,
        })?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `ORGDIR_*` overrides read through `lookup`, then re-validates.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.access.api_key = Some(key);
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        self.normalize();
        self.validate()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "database.path must be non-empty.".to_string(),
            ));
        }
        if let Some(key) = &self.access.api_key {
            if key.is_empty() {
                return Err(ConfigError::Validation(
                    "access.api_key must be non-empty when set.".to_string(),
                ));
            }
        }
        normalize_level(&self.logging.level).map_err(ConfigError::Validation)?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "logging.dir must be an absolute path, got `{}`.",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.access.api_key = self
            .access
            .api_key
            .take()
            .map(|key| key.trim().to_string());
        self.logging.level = self.logging.level.trim().to_ascii_lowercase();
    }
}

/// Reads and validates a TOML config file.
pub fn load(path: &Path) -> ConfigResult<DirectoryConfig> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.to_path_buf(),
        source: err,
    })?;

    DirectoryConfig::from_toml_str(&raw).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })
}
