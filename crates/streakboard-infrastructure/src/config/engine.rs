use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use streakboard_domain::streak::{ActivityCalendar, MAX_UTC_OFFSET_MINUTES};

pub const ENV_DATABASE_PATH: &str = "STREAKBOARD_DB";
pub const ENV_UTC_OFFSET_MINUTES: &str = "STREAKBOARD_UTC_OFFSET_MINUTES";

/// Log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

}

/// Engine configuration, persisted as JSON.
///
/// Missing fields fall back to their defaults so old files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub log_level: LogLevel,
    /// Offset of the reference calendar that decides day boundaries.
    pub utc_offset_minutes: i32,
    pub max_write_retries: u32,
    pub retry_backoff_ms: u64,
    pub record_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub max_leaderboard_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("streakboard.db"),
            log_level: LogLevel::Info,
            utc_offset_minutes: 0,
            max_write_retries: 5,
            retry_backoff_ms: 10,
            record_timeout_ms: 5_000,
            query_timeout_ms: 5_000,
            max_leaderboard_limit: 100,
        }
    }
}

/// Platform data directory for streakboard, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streakboard")
}

impl EngineConfig {
    /// Load config from `path`, or defaults when the file is absent, then apply
    /// environment overrides. A file that does not parse is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            EngineConfig::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        info!(
            path = %path.display(),
            database = %config.database_path.display(),
            utc_offset_minutes = config.utc_offset_minutes,
            "Config loaded"
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DATABASE_PATH).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(raw) = lookup(ENV_UTC_OFFSET_MINUTES) {
            self.utc_offset_minutes = raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("{} must be an integer, got {:?}", ENV_UTC_OFFSET_MINUTES, raw)
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            anyhow::bail!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES,
                self.utc_offset_minutes
            );
        }
        if self.max_leaderboard_limit == 0 {
            anyhow::bail!("max_leaderboard_limit must be positive");
        }
        Ok(())
    }

    pub fn calendar(&self) -> Result<ActivityCalendar> {
        Ok(ActivityCalendar::from_offset_minutes(self.utc_offset_minutes)?)
    }

    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
