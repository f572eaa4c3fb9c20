//! # Feature: Reminder Storage
//!
//! Durable record of each reminder: start time, scheduled end time, task text
//! and delay. Two interchangeable backends sit behind [`ReminderStore`]:
//! an append-only text log and a tabular workbook.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Workbook backend writes real `.xlsx` files; delays outside the
//!   calendar range are rejected instead of overflowing
//! - 1.1.0: Added `records` read-back for both backends
//! - 1.0.0: Initial release with log and sheet backends

pub mod log_store;
pub mod sheet_store;

pub use log_store::LogStore;
pub use sheet_store::SheetStore;

use crate::core::{Config, StoreBackend};
use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// One persisted reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderRecord {
    pub start_time: String,
    /// Provisional until the reminder fires, then the actual firing time
    pub end_time: Option<String>,
    pub task_text: String,
    /// Not kept by the log backend
    pub delay_minutes: Option<u64>,
}

/// Formatted start and provisional end returned by `write_reminder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledWindow {
    pub start_time: String,
    pub end_time: String,
}

/// `start + delay_minutes`, or an error when the sum leaves chrono's range
pub fn provisional_end(start: NaiveDateTime, delay_minutes: u64) -> Result<NaiveDateTime> {
    i64::try_from(delay_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|delay| start.checked_add_signed(delay))
        .ok_or_else(|| anyhow!("delay of {delay_minutes} minute(s) is out of range"))
}

/// Persistence backend for reminders.
///
/// Implementations do no internal locking: callers must not run two methods
/// concurrently against the same backing file.
pub trait ReminderStore: Send {
    /// Append a new open record; never touches earlier records
    fn write_reminder(&mut self, text: &str, delay_minutes: u64) -> Result<ScheduledWindow>;

    /// Overwrite the end time of the most recently written record with now.
    /// An empty or unreadable backend is a no-op.
    fn update_completion(&mut self, text: &str) -> Result<()>;

    /// All records in write order
    fn records(&mut self) -> Result<Vec<ReminderRecord>>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Construct the backend selected in the configuration
pub fn open_store(config: &Config) -> Box<dyn ReminderStore> {
    match config.store_backend {
        StoreBackend::Log => Box::new(LogStore::new(&config.log_path)),
        StoreBackend::Sheet => Box::new(SheetStore::new(&config.sheet_path)),
    }
}
