//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use domain::{CutoffPolicy, DeliveryScheduler, RetryPolicy, ServiceConfig};
use thiserror::Error;

/// A variable was set to something we can't use.
#[derive(Debug, Error)]
#[error("Invalid value for {name}: {value:?} ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL store when set, in-memory otherwise
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `OPERATION_TIMEOUT_MS`: per-operation timeout (default: `5000`)
/// - `MAX_CONFLICT_RETRIES`: attempts per write before giving up (default: `3`)
/// - `BUSINESS_UTC_OFFSET_MINUTES`: business timezone offset (default: `0`)
/// - `THURSDAY_CUTOFF` / `FRIDAY_CUTOFF`: `HH:MM` (default: `18:00` / `12:00`)
/// - `SEED_FILE`: customers and dishes for the in-memory mode (default: bundled demo data)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub operation_timeout: Duration,
    pub max_conflict_retries: u32,
    pub utc_offset: FixedOffset,
    pub cutoffs: CutoffPolicy,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let offset_minutes: i32 = parse(&var, "BUSINESS_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError {
                name: "BUSINESS_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "offset must be within ±24h".to_string(),
            })?;

        let max_conflict_retries =
            parse(&var, "MAX_CONFLICT_RETRIES", defaults.max_conflict_retries)?;
        if max_conflict_retries == 0 {
            return Err(ConfigError {
                name: "MAX_CONFLICT_RETRIES",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(&var, "PORT", defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse(&var, "LOG_FORMAT", defaults.log_format)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse(
                &var,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            operation_timeout: Duration::from_millis(parse(
                &var,
                "OPERATION_TIMEOUT_MS",
                defaults.operation_timeout.as_millis() as u64,
            )?),
            max_conflict_retries,
            utc_offset,
            cutoffs: CutoffPolicy::new(
                cutoff(&var, "THURSDAY_CUTOFF", defaults.cutoffs.thursday)?,
                cutoff(&var, "FRIDAY_CUTOFF", defaults.cutoffs.friday)?,
            ),
            seed_file: var("SEED_FILE").map(PathBuf::from),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout and retry settings for the order services.
    pub fn service_config(&self) -> ServiceConfig {
        let retry = RetryPolicy {
            max_attempts: self.max_conflict_retries,
            ..RetryPolicy::default()
        };
        ServiceConfig::default()
            .with_timeout(self.operation_timeout)
            .with_retry(retry)
    }

    /// Delivery scheduler for the configured cutoffs and timezone.
    pub fn scheduler(&self) -> DeliveryScheduler {
        DeliveryScheduler::new(self.cutoffs, self.utc_offset)
    }
}

impl Default for Config {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            operation_timeout: service.operation_timeout,
            max_conflict_retries: service.retry.max_attempts,
            utc_offset: Utc.fix(),
            cutoffs: CutoffPolicy::default(),
            seed_file: None,
        }
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn cutoff(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: NaiveTime,
) -> Result<NaiveTime, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => CutoffPolicy::parse_time(raw.trim()).map_err(|e| ConfigError {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
