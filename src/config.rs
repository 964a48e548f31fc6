use std::path::{Path, PathBuf};

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File consulted for configuration overrides, if it exists.
pub const CONFIG_FILE: &str = "Survey.toml";

/// Prefix of environment variables overriding configuration, e.g. `SURVEY_LOG_LEVEL`.
pub const ENV_PREFIX: &str = "SURVEY_";

/// Most decimal places a percentage may be rounded to.
pub const MAX_PERCENTAGE_PRECISION: u32 = 10;

/// Engine configuration, derived from defaults, `Survey.toml`, and `SURVEY_*`
/// environment variables, in increasing order of precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    recent_window_hours: u32,
    weekly_window_days: u32,
    percentage_precision: u32,
    log_level: LevelFilter,
    log_config: PathBuf,
}

impl Config {
    /// Load the configuration from the standard sources.
    pub fn load() -> Result<Self> {
        Self::figment(CONFIG_FILE).extract::<Self>()?.validated()
    }

    /// Refuse values the engine cannot work with.
    pub fn validated(self) -> Result<Self> {
        if self.percentage_precision > MAX_PERCENTAGE_PRECISION {
            return Err(Error::InvalidConfig(format!(
                "percentage_precision must be at most {MAX_PERCENTAGE_PRECISION}, got {}",
                self.percentage_precision
            )));
        }
        Ok(self)
    }

    /// The layered configuration sources, reading overrides from `file`.
    pub fn figment(file: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Window for the "last 24 hours" submission count.
    /// Configured via `recent_window_hours`.
    pub fn recent_window(&self) -> Duration {
        Duration::hours(self.recent_window_hours.into())
    }

    /// Window for the "last 7 days" submission count.
    /// Configured via `weekly_window_days`.
    pub fn weekly_window(&self) -> Duration {
        Duration::days(self.weekly_window_days.into())
    }

    /// Decimal places kept in option percentages.
    /// Configured via `percentage_precision`, at most [`MAX_PERCENTAGE_PRECISION`].
    pub fn percentage_precision(&self) -> u32 {
        self.percentage_precision
    }

    /// Root log level used when no log4rs file is present.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Path of the log4rs configuration file.
    pub fn log_config(&self) -> &Path {
        &self.log_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recent_window_hours: 24,
            weekly_window_days: 7,
            percentage_precision: 2,
            log_level: LevelFilter::Info,
            log_config: PathBuf::from("log4rs.yaml"),
        }
    }
}
