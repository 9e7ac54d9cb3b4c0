//! `tracing` subscriber bootstrap for applications embedding the crate.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "SLICER_LOG";

/// Build the filter: `SLICER_LOG` if set and valid, otherwise the configured one.
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn try_init(settings: &LoggingSettings) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(settings));
    let result = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}
