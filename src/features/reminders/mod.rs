//! # Reminders Feature
//!
//! Single-flight delayed reminders: a request is recorded in the store, then
//! a timer is armed that notifies the user and marks the record complete.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod scheduler;
pub mod service;

pub use scheduler::{DelayedTaskScheduler, PendingSnapshot, SchedulerStatus};
pub use service::{ReminderAccepted, ReminderRequest, ReminderService, StatusReport};
