//! # Core Module
//!
//! Core domain types, configuration, and error handling for the reminder server.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add clock module with injectable time source and timestamp formats
//! - 1.0.0: Initial creation with config and error modules

pub mod clock;
pub mod config;
pub mod error;

// Re-export commonly used items
pub use clock::{iso_now, system_clock, Clock, DISPLAY_TIME_FORMAT, LOG_TIME_FORMAT};
pub use config::{Config, NotifierKind, StoreBackend};
pub use error::{ErrorBody, ReminderError};
