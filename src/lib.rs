// Core layer - shared types, configuration and errors
pub mod core;

// Features layer - scheduler, storage backends, notification delivery
pub mod features;

// HTTP layer - JSON API in front of the reminder service
pub mod http;

// Re-export core config for convenience
pub use core::Config;

// Re-export feature items
pub use features::{
    // Notification
    build_notifier, DesktopNotifier, LogNotifier, Notification, NotificationSink,
    // Reminders
    DelayedTaskScheduler, ReminderService, SchedulerStatus,
    // Storage
    open_store, LogStore, ReminderRecord, ReminderStore, SheetStore,
};
