//! Append-only text log backend.
//!
//! Each record is one UTF-8 line: `<start> <end> <task>`. Timestamps use
//! [`LOG_TIME_FORMAT`] so the first two fields never contain spaces and the
//! task text keeps any spaces it has.

use super::{provisional_end, ReminderRecord, ReminderStore, ScheduledWindow};
use crate::core::{system_clock, Clock, DISPLAY_TIME_FORMAT, LOG_TIME_FORMAT};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct LogStore {
    path: PathBuf,
    clock: Clock,
}

impl LogStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock: system_clock(),
        }
    }

    /// Replace the time source (tests pin it)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

/// Split a line into `(start, end, task)`; at most three fields
fn split_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ' ');
    let start = parts.next()?;
    let end = parts.next()?;
    let task = parts.next()?;
    Some((start, end, task))
}

/// Newlines would break the one-record-per-line layout
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Log timestamps are shown in display format when read back
fn to_display(log_stamp: &str) -> String {
    NaiveDateTime::parse_from_str(log_stamp, LOG_TIME_FORMAT)
        .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
        .unwrap_or_else(|_| log_stamp.to_string())
}

impl ReminderStore for LogStore {
    fn write_reminder(&mut self, text: &str, delay_minutes: u64) -> Result<ScheduledWindow> {
        let start = (self.clock)();
        let end = provisional_end(start, delay_minutes)?;
        let line = format!(
            "{} {} {}\n",
            start.format(LOG_TIME_FORMAT),
            end.format(LOG_TIME_FORMAT),
            single_line(text)
        );

        self.ensure_parent_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()?;

        debug!("Appended reminder to {}", self.path.display());

        Ok(ScheduledWindow {
            start_time: start.format(DISPLAY_TIME_FORMAT).to_string(),
            end_time: end.format(DISPLAY_TIME_FORMAT).to_string(),
        })
    }

    fn update_completion(&mut self, _text: &str) -> Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(
                    "No completion update, {} unreadable: {}",
                    self.path.display(),
                    e
                );
                return Ok(());
            }
        };

        let mut lines: Vec<String> = contents.lines().map(str::to_owned).collect();
        let Some(last) = lines.iter().rposition(|l| !l.trim().is_empty()) else {
            return Ok(());
        };

        let completion = (self.clock)().format(LOG_TIME_FORMAT).to_string();
        let patched = match split_line(&lines[last]) {
            Some((start, _, task)) => format!("{start} {completion} {task}"),
            None => {
                warn!("Last log line is not a reminder record, leaving it as is");
                return Ok(());
            }
        };
        lines[last] = patched;

        let mut out = lines.join("\n");
        out.push('\n');
        fs::write(&self.path, out)
            .with_context(|| format!("Failed to rewrite {}", self.path.display()))?;
        Ok(())
    }

    fn records(&mut self) -> Result<Vec<ReminderRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        Ok(contents
            .lines()
            .filter_map(split_line)
            .map(|(start, end, task)| ReminderRecord {
                start_time: to_display(start),
                end_time: Some(to_display(end)),
                task_text: task.to_string(),
                delay_minutes: None,
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    /// Clock that moves forward by `offset` seconds on demand
    fn stepping_clock() -> (Clock, Arc<AtomicI64>) {
        let offset = Arc::new(AtomicI64::new(0));
        let handle = offset.clone();
        let clock: Clock =
            Arc::new(move || base_time() + Duration::seconds(handle.load(Ordering::SeqCst)));
        (clock, offset)
    }

    #[test]
    fn test_write_returns_window() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, _) = stepping_clock();
        let mut store = LogStore::new(dir.path().join("reminders.log")).with_clock(clock);

        let window = store.write_reminder("drink water", 1).unwrap();
        assert_eq!(window.start_time, "2024-03-01 09:00:00");
        assert_eq!(window.end_time, "2024-03-01 09:01:00");

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "2024-03-01T09:00:00 2024-03-01T09:01:00 drink water\n");
    }

    #[test]
    fn test_round_trip_keeps_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::new(dir.path().join("reminders.log"));

        store.write_reminder("call  mom about the   trip", 10).unwrap();
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task_text, "call  mom about the   trip");
    }

    #[test]
    fn test_update_patches_only_last_record() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, offset) = stepping_clock();
        let mut store = LogStore::new(dir.path().join("reminders.log")).with_clock(clock);

        store.write_reminder("first task", 5).unwrap();
        offset.store(60, Ordering::SeqCst);
        store.write_reminder("second task", 5).unwrap();
        offset.store(120, Ordering::SeqCst);
        store.update_completion("second task").unwrap();

        let records = store.records().unwrap();
        assert_eq!(records[0].end_time.as_deref(), Some("2024-03-01 09:05:00"));
        assert_eq!(records[1].start_time, "2024-03-01 09:01:00");
        assert_eq!(records[1].end_time.as_deref(), Some("2024-03-01 09:02:00"));
        assert_eq!(records[1].task_text, "second task");
    }

    #[test]
    fn test_update_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, offset) = stepping_clock();
        let mut store = LogStore::new(dir.path().join("reminders.log")).with_clock(clock);

        store.write_reminder("stretch", 30).unwrap();
        offset.store(90, Ordering::SeqCst);
        store.update_completion("stretch").unwrap();
        let after_first = fs::read_to_string(store.path()).unwrap();
        store.update_completion("stretch").unwrap();
        let after_second = fs::read_to_string(store.path()).unwrap();

        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_update_on_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::new(dir.path().join("absent.log"));

        assert!(store.update_completion("anything").is_ok());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_update_on_empty_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        fs::write(&path, "").unwrap();
        let mut store = LogStore::new(&path);

        store.update_completion("anything").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_update_on_non_utf8_log_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let bytes = vec![0xff, 0xfe, 0x20, 0x80, 0x0a];
        fs::write(&path, &bytes).unwrap();
        let mut store = LogStore::new(&path);

        store.update_completion("anything").unwrap();
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_out_of_range_delay_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::new(dir.path().join("reminders.log"));

        assert!(store.write_reminder("never", i64::MAX as u64).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_update_skips_trailing_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        fs::write(&path, "2024-03-01T08:00:00 2024-03-01T08:30:00 read\n\n").unwrap();
        let (clock, _) = stepping_clock();
        let mut store = LogStore::new(&path).with_clock(clock);

        store.update_completion("read").unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("2024-03-01T08:00:00 2024-03-01T09:00:00 read\n"));
    }

    #[test]
    fn test_newlines_in_text_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::new(dir.path().join("reminders.log"));

        store.write_reminder("line one\nline two", 1).unwrap();
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task_text, "line one line two");
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::new(dir.path().join("nested/deeper/reminders.log"));

        store.write_reminder("nap", 20).unwrap();
        assert!(store.path().exists());
    }
}
