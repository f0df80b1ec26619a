//! Runtime settings read from `CRUDSCOPE_*` environment variables.
//!
//! | Variable                     | Default                  |
//! |------------------------------|--------------------------|
//! | `CRUDSCOPE_DATABASE_URL`     | `sqlite::memory:`        |
//! | `CRUDSCOPE_MAX_CONNECTIONS`  | `10`                     |
//! | `CRUDSCOPE_SQLX_LOGGING`     | `false`                  |
//! | `CRUDSCOPE_LOG_LEVEL`        | `info`                   |
//! | `CRUDSCOPE_LOG_FORMAT`       | `pretty` (`compact`, `json`) |

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid("CRUDSCOPE_LOG_FORMAT", s)),
        }
    }
}

/// A variable was set to something unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl ConfigError {
    fn invalid(variable: &'static str, value: &str) -> Self {
        Self {
            variable,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value '{}' for {}", self.value, self.variable)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    /// Forward sqlx statement logs to `tracing`
    pub sqlx_logging: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sqlx_logging: false,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// # Errors
    /// When a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or blank keys take defaults.
    ///
    /// # Errors
    /// When a variable is set but cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_connections = match get("CRUDSCOPE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::invalid("CRUDSCOPE_MAX_CONNECTIONS", &raw))?,
            None => defaults.max_connections,
        };
        let sqlx_logging = match get("CRUDSCOPE_SQLX_LOGGING") {
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| ConfigError::invalid("CRUDSCOPE_SQLX_LOGGING", &raw))?,
            None => defaults.sqlx_logging,
        };
        let log_format = match get("CRUDSCOPE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            database_url: get("CRUDSCOPE_DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections,
            sqlx_logging,
            log_level: get("CRUDSCOPE_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
