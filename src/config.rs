use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

use crate::matcher::MatchStrategy;
use crate::scheduler::{BackoffMode, SchedulerConfig};

/// Process configuration, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Wait between fulfillment cycles, seconds
    pub poll_interval_secs: u64,
    pub backoff: BackoffMode,
    pub strategy: MatchStrategy,
    /// Batch results are written here when set
    pub export_dir: Option<PathBuf>,
    pub bot_api_url: String,
    pub bot_token: String,
    pub remote_store_url: String,
    /// Chat id receiving delivery notifications
    pub operator_id: i64,
    /// Pending payments older than this are expired by the janitor
    pub request_expiry_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let strategy_raw =
            std::env::var("MATCH_STRATEGY").unwrap_or_else(|_| "recent".to_string());
        let strategy = MatchStrategy::parse(&strategy_raw).ok_or_else(|| {
            ConfigError::Message(format!(
                "MATCH_STRATEGY must be one of recent|keyword|popular|round-robin, got '{}'",
                strategy_raw
            ))
        })?;

        let backoff_raw = std::env::var("BACKOFF_MODE").unwrap_or_else(|_| "fixed".to_string());
        let backoff = BackoffMode::parse(&backoff_raw).ok_or_else(|| {
            ConfigError::Message(format!(
                "BACKOFF_MODE must be fixed|exponential, got '{}'",
                backoff_raw
            ))
        })?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Message("DATABASE_URL must be set".to_string()))?,
            poll_interval_secs: parse_env("POLL_INTERVAL_SECS", 300)?,
            backoff,
            strategy,
            export_dir: std::env::var("EXPORT_DIR").ok().map(PathBuf::from),
            bot_api_url: std::env::var("BOT_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            bot_token: std::env::var("BOT_TOKEN")
                .map_err(|_| ConfigError::Message("BOT_TOKEN must be set".to_string()))?,
            remote_store_url: std::env::var("REMOTE_STORE_URL")
                .map_err(|_| ConfigError::Message("REMOTE_STORE_URL must be set".to_string()))?,
            operator_id: std::env::var("OPERATOR_ID")
                .map_err(|_| ConfigError::Message("OPERATOR_ID must be set".to_string()))?
                .parse()
                .map_err(|_| {
                    ConfigError::Message("OPERATOR_ID must be a chat id (i64)".to_string())
                })?,
            request_expiry_hours: parse_env("REQUEST_EXPIRY_HOURS", 24)?,
        })
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            backoff: self.backoff,
            export_dir: self.export_dir.clone(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Message(format!("{} has an invalid value: '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
