//! Configuration module.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, LedgerSettings, LoggingSettings, PlannerSettings, Settings, SettingsError,
    StoreBackend, StoreSettings,
};
