//! `tracing-subscriber` setup.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter, using
/// `EnvFilter` directive syntax (e.g. `taskweave=debug`).
pub const LOG_ENV_VAR: &str = "TASKWEAVE_LOG";

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `TASKWEAVE_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Include the record's target (module path).
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Sets the default filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Toggles target output.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Filter built from `TASKWEAVE_LOG`, falling back to `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if `level` is not a valid filter directive.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_env(LOG_ENV_VAR) {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|err| anyhow!("invalid log level '{}': {err}", self.level)),
        }
    }
}

/// Builds a fmt subscriber for `config` without installing it.
///
/// # Errors
///
/// Returns an error if the filter is invalid.
pub fn build_subscriber(
    config: &LoggingConfig,
) -> anyhow::Result<Box<dyn Subscriber + Send + Sync>> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.with_target);

    Ok(match config.format {
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    })
}

/// Installs a global fmt subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(build_subscriber(config)?)
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
