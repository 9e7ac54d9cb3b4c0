//! TOML-based configuration.
//!
//! Supports a config file (slicer.toml) with environment variable expansion
//! in paths.
//!
//! Example configuration:
//! ```toml
//! [store]
//! backend = "sqlite"
//! path = "${SLICER_HOME}/catalog.db"
//!
//! [ledger]
//! strict_versioning = true
//! verify_chain_on_propose = true
//!
//! [planner]
//! plan_cache_capacity = 256
//!
//! [logging]
//! filter = "slicer=debug"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub ledger: LedgerSettings,
    pub planner: PlannerSettings,
    pub logging: LoggingSettings,
}

/// Which catalog store backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Catalog store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// Database path (supports ${ENV_VAR} expansion). Defaults to
    /// `~/.slicer/catalog.db` for the sqlite backend.
    pub path: Option<String>,
}

impl StoreSettings {
    /// The configured path with environment variables expanded.
    ///
    /// A path whose variables cannot be expanded is treated as unset.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        expand_env_vars(path).ok().map(PathBuf::from)
    }
}

/// Table definition ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Reject proposals when more definitions exist than the latest
    /// version number accounts for, instead of skipping ahead.
    pub strict_versioning: bool,

    /// Walk the previous-chain of the active definition before each proposal.
    pub verify_chain_on_propose: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            strict_versioning: true,
            verify_chain_on_propose: true,
        }
    }
}

/// Query plan compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Maximum number of cached plans; 0 disables caching.
    pub plan_cache_capacity: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            plan_cache_capacity: 256,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing-subscriber` filter directive, e.g. `info` or `slicer=debug`.
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SLICER_CONFIG`
    /// 2. `./slicer.toml`
    /// 3. `~/.config/slicer/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SLICER_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("slicer.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("slicer").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.logging.filter.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "logging.filter must not be empty".to_string(),
            ));
        }
        if let Some(path) = &self.store.path {
            if path.trim().is_empty() {
                return Err(SettingsError::InvalidConfig(
                    "store.path must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Settings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // lone '$'
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
