//! Time source and timestamp formats shared by the stores and the service.

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;

/// Format used for `start_time`/`end_time` in API responses and the workbook
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used inside the append-only log; contains no spaces so every line
/// splits into exactly `<start> <end> <task>`
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Injectable source of "now" for the stores
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Wall clock in local time
pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Local time rendered as ISO-8601 with microseconds
pub fn iso_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
