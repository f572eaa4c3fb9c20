//! # Feature: Notification Delivery
//!
//! User-visible alert emitted when a reminder fires. Delivery is a fallible
//! external call; the firing path logs and swallows failures.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Linux support through notify-send
//! - 1.0.0: Initial release with macOS osascript delivery and log-only sink

use crate::core::NotifierKind;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::process::Command;

/// Title shown on every reminder notification
pub const NOTIFICATION_TITLE: &str = "Local Reminder";

/// A notification ready to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub sound: Option<String>,
}

impl Notification {
    /// Standard reminder notification for a task requested at `timestamp`
    pub fn reminder(text: &str, timestamp: &str) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            subtitle: format!("Time: {timestamp}"),
            body: text.to_string(),
            sound: Some("default".to_string()),
        }
    }
}

/// Capability to show a notification to the user
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, notification: &Notification) -> Result<()>;
}

/// Shows notifications through the desktop's native notifier
/// (`osascript` on macOS, `notify-send` elsewhere)
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn command_for(notification: &Notification) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(applescript_for(notification));
            cmd
        } else {
            let mut cmd = Command::new("notify-send");
            cmd.arg("--app-name")
                .arg(&notification.title)
                .arg(&notification.title)
                .arg(format!("{}\n{}", notification.subtitle, notification.body));
            cmd
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    async fn emit(&self, notification: &Notification) -> Result<()> {
        let output = Self::command_for(notification)
            .output()
            .await
            .context("Failed to run desktop notifier")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Desktop notifier exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        debug!("Desktop notification shown: {}", notification.body);
        Ok(())
    }
}

/// Writes notifications to the log instead of the desktop
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn emit(&self, notification: &Notification) -> Result<()> {
        info!(
            "🔔 {} | {} | {}",
            notification.title, notification.subtitle, notification.body
        );
        Ok(())
    }
}

/// Construct the sink selected in the configuration
pub fn build_notifier(kind: NotifierKind) -> Arc<dyn NotificationSink> {
    match kind {
        NotifierKind::Desktop => Arc::new(DesktopNotifier),
        NotifierKind::Log => Arc::new(LogNotifier),
    }
}

/// Quote a value as an AppleScript string literal
fn applescript_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `display notification` script for osascript
fn applescript_for(notification: &Notification) -> String {
    let mut script = format!(
        "display notification {} with title {} subtitle {}",
        applescript_quote(&notification.body),
        applescript_quote(&notification.title),
        applescript_quote(&notification.subtitle)
    );
    if let Some(ref sound) = notification.sound {
        script.push_str(&format!(" sound name {}", applescript_quote(sound)));
    }
    script
}
