//! # Configuration
//!
//! Environment-driven settings for the reminder server. `.env` files are
//! loaded by the binary through `dotenvy` before `Config::from_env` runs.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Context, Result};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3333";

/// Default delay when a request omits `delay_minutes`
pub const DEFAULT_DELAY_MINUTES: u64 = 30;

/// Which persistence backend records reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Append-only text log, one record per line
    Log,
    /// Tabular workbook with current/history/analysis regions
    Sheet,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(StoreBackend::Log),
            "sheet" | "excel" | "workbook" => Ok(StoreBackend::Sheet),
            _ => Err(anyhow!("Invalid store backend: {}", s)),
        }
    }
}

/// How notifications reach the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    /// Native desktop notification via the platform's notifier command
    Desktop,
    /// Write the notification to the log only
    Log,
}

impl std::str::FromStr for NotifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(NotifierKind::Desktop),
            "log" => Ok(NotifierKind::Log),
            _ => Err(anyhow!("Invalid notifier: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub log_path: String,
    pub sheet_path: String,
    pub notifier: NotifierKind,
    pub default_delay_minutes: u64,
    pub log_level: String,
}

impl Config {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_backend = get("REMINDER_STORE", "sheet").parse()?;
        let notifier = get("REMINDER_NOTIFIER", "desktop").parse()?;
        let default_delay_minutes = match lookup("REMINDER_DEFAULT_DELAY_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid REMINDER_DEFAULT_DELAY_MINUTES: {raw}"))?,
            None => DEFAULT_DELAY_MINUTES,
        };

        Ok(Config {
            bind_addr: get("REMINDER_BIND_ADDR", DEFAULT_BIND_ADDR),
            store_backend,
            log_path: get("REMINDER_LOG_PATH", "reminders.log"),
            sheet_path: get("REMINDER_SHEET_PATH", "plan.xlsx"),
            notifier,
            default_delay_minutes,
            log_level: get("LOG_LEVEL", "info"),
        })
    }
}
