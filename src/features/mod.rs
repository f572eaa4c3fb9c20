//! # Features
//!
//! Feature modules of the reminder server.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod notification;
pub mod reminders;
pub mod storage;

pub use notification::{build_notifier, DesktopNotifier, LogNotifier, Notification, NotificationSink};
pub use reminders::{DelayedTaskScheduler, ReminderService, SchedulerStatus};
pub use storage::{open_store, LogStore, ReminderRecord, ReminderStore, SheetStore};
