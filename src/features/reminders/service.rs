//! # Reminder Service
//!
//! Validates reminder requests and orchestrates store write, then scheduler
//! arm. Requests are handled one at a time; the store is only ever touched
//! under its mutex, on the blocking pool.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Reject delays past the calendar range; status read from one snapshot
//! - 1.1.0: Notification failures no longer skip completion bookkeeping
//! - 1.0.0: Initial release

use crate::core::{iso_now, ReminderError};
use crate::features::notification::{Notification, NotificationSink};
use crate::features::reminders::scheduler::{DelayedTaskScheduler, SchedulerStatus};
use crate::features::storage::{provisional_end, ReminderStore};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Message returned when `text` is missing or blank
pub const MISSING_TEXT: &str = "Missing text content";

/// Message returned when the body is not a JSON reminder request
pub const INVALID_JSON: &str = "Invalid JSON format";

const INVALID_DELAY: &str = "delay_minutes must be a non-negative integer";

const DELAY_OUT_OF_RANGE: &str = "delay_minutes is too large";

type SharedStore = Arc<Mutex<Box<dyn ReminderStore>>>;

/// Incoming `POST /api/reminders` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderRequest {
    pub text: Option<String>,
    /// ISO-8601; defaults to now
    pub timestamp: Option<String>,
    pub delay_minutes: Option<i64>,
}

/// Successful response to a reminder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderAccepted {
    pub success: bool,
    pub message: String,
    pub text: String,
    pub timestamp: String,
    pub delay_minutes: u64,
    pub start_time: String,
    pub end_time: String,
}

/// `GET /status` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: SchedulerStatus,
    pub message: String,
    pub timestamp: String,
}

pub struct ReminderService {
    store: SharedStore,
    scheduler: DelayedTaskScheduler,
    notifier: Arc<dyn NotificationSink>,
    request_gate: AsyncMutex<()>,
    default_delay_minutes: u64,
}

impl ReminderService {
    pub fn new(store: Box<dyn ReminderStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        info!("Reminder service using {} store", store.backend());
        Self {
            store: Arc::new(Mutex::new(store)),
            scheduler: DelayedTaskScheduler::new(),
            notifier,
            request_gate: AsyncMutex::new(()),
            default_delay_minutes: crate::core::config::DEFAULT_DELAY_MINUTES,
        }
    }

    /// Delay applied when a request omits `delay_minutes`
    pub fn with_default_delay(mut self, minutes: u64) -> Self {
        self.default_delay_minutes = minutes;
        self
    }

    /// Parse a raw request body
    pub fn decode_request(body: &[u8]) -> Result<ReminderRequest, ReminderError> {
        serde_json::from_slice(body).map_err(|e| {
            warn!("Rejected reminder body: {}", e);
            ReminderError::Decode(INVALID_JSON.to_string())
        })
    }

    /// Record a reminder and arm its timer, superseding any pending one
    pub async fn process_reminder_request(
        &self,
        request: ReminderRequest,
    ) -> Result<ReminderAccepted, ReminderError> {
        let _gate = self.request_gate.lock().await;

        let text = match request.text {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(ReminderError::Validation(MISSING_TEXT.to_string())),
        };
        let delay_minutes = match request.delay_minutes {
            Some(minutes) => u64::try_from(minutes)
                .map_err(|_| ReminderError::Validation(INVALID_DELAY.to_string()))?,
            None => self.default_delay_minutes,
        };
        if provisional_end(chrono::Local::now().naive_local(), delay_minutes).is_err() {
            return Err(ReminderError::Validation(DELAY_OUT_OF_RANGE.to_string()));
        }
        let timestamp = request.timestamp.unwrap_or_else(iso_now);

        let record_text = text.clone();
        let window = run_store(self.store.clone(), move |store| {
            store.write_reminder(&record_text, delay_minutes)
        })
        .await
        .map_err(|e| {
            error!("Failed to record reminder '{}': {}", text, e);
            e
        })?;

        info!("Recorded reminder: {} ({} minute delay)", text, delay_minutes);

        let notifier = Arc::clone(&self.notifier);
        let store = Arc::clone(&self.store);
        self.scheduler
            .arm(&text, &timestamp, delay_minutes, move |text, timestamp| {
                deliver(notifier, store, text, timestamp)
            });

        Ok(ReminderAccepted {
            success: true,
            message: format!("Reminder set, notifying in {delay_minutes} minute(s)"),
            text,
            timestamp,
            delay_minutes,
            start_time: window.start_time,
            end_time: window.end_time,
        })
    }

    pub fn get_status(&self) -> StatusReport {
        let (status, message) = match self.scheduler.pending() {
            Some(pending) => (
                SchedulerStatus::Active,
                format!("A reminder is scheduled: {}", pending.text),
            ),
            None => (SchedulerStatus::Idle, "No reminder scheduled".to_string()),
        };
        StatusReport {
            status,
            message,
            timestamp: iso_now(),
        }
    }

    /// Cancel the pending reminder on shutdown. A fire already in progress
    /// cannot be retracted.
    pub fn cleanup(&self) -> bool {
        let cancelled = self.scheduler.cancel();
        if cancelled {
            info!("Cleaned up pending reminder");
        }
        cancelled
    }
}

/// Run a store operation on the blocking pool under the store mutex
async fn run_store<T, F>(store: SharedStore, op: F) -> Result<T, ReminderError>
where
    F: FnOnce(&mut dyn ReminderStore) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut **guard)
    })
    .await
    .map_err(|e| ReminderError::Internal(format!("store task failed: {e}")))?;

    outcome.map_err(|e| ReminderError::Store(format!("{e:#}")))
}

/// Fire path: notify, then mark the record complete. Notification failures
/// are logged and do not stop the completion update.
async fn deliver(
    notifier: Arc<dyn NotificationSink>,
    store: SharedStore,
    text: String,
    timestamp: String,
) -> anyhow::Result<()> {
    let notification = Notification::reminder(&text, &timestamp);
    match notifier.emit(&notification).await {
        Ok(()) => info!("Sent reminder notification: {}", text),
        Err(e) => warn!("Failed to send notification for '{}': {:#}", text, e),
    }

    run_store(store, move |store| store.update_completion(&text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Clock;
    use crate::features::storage::LogStore;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn bodies(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|n| n.body.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn emit(&self, notification: &Notification) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl NotificationSink for FailingNotifier {
        async fn emit(&self, _notification: &Notification) -> anyhow::Result<()> {
            anyhow::bail!("notification center unavailable")
        }
    }

    /// Clock that advances one minute per reading
    fn ticking_clock() -> Clock {
        let ticks = Arc::new(AtomicI64::new(0));
        let base = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Arc::new(move || base + ChronoDuration::minutes(ticks.fetch_add(1, Ordering::SeqCst)))
    }

    fn log_service(
        path: &Path,
        notifier: Arc<dyn NotificationSink>,
    ) -> ReminderService {
        let store = LogStore::new(path).with_clock(ticking_clock());
        ReminderService::new(Box::new(store), notifier)
    }

    fn request(text: &str, delay: Option<i64>) -> ReminderRequest {
        ReminderRequest {
            text: Some(text.to_string()),
            timestamp: None,
            delay_minutes: delay,
        }
    }

    fn read_lines(path: &PathBuf) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_missing_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let service = log_service(&path, Arc::new(RecordingNotifier::default()));

        let err = service
            .process_reminder_request(ReminderRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, ReminderError::Validation(MISSING_TEXT.to_string()));
        assert_eq!(err.status_code(), 400);
        assert!(!path.exists());
        assert_eq!(service.get_status().status, SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        );

        for text in ["", "   "] {
            let err = service
                .process_reminder_request(request(text, Some(1)))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
    }

    #[tokio::test]
    async fn test_negative_delay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        );

        let err = service
            .process_reminder_request(request("back in time", Some(-5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oversized_delay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let service = log_service(&path, Arc::new(RecordingNotifier::default()));

        for delay in [i64::MAX, 10_000_000_000_000] {
            let err = service
                .process_reminder_request(request("some day", Some(delay)))
                .await
                .unwrap_err();
            assert_eq!(err, ReminderError::Validation(DELAY_OUT_OF_RANGE.to_string()));
            assert_eq!(err.status_code(), 400);
        }
        assert!(!path.exists());
        assert_eq!(service.get_status().status, SchedulerStatus::Idle);

        // The store is still usable afterwards
        let accepted = service
            .process_reminder_request(request("soon", Some(1)))
            .await
            .unwrap();
        assert_eq!(accepted.delay_minutes, 1);
        service.cleanup();
    }

    #[tokio::test]
    async fn test_status_and_message_agree_through_fire() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        );

        service
            .process_reminder_request(request("quick one", Some(0)))
            .await
            .unwrap();
        for _ in 0..200 {
            let report = service.get_status();
            match report.status {
                SchedulerStatus::Active => {
                    assert_eq!(report.message, "A reminder is scheduled: quick one")
                }
                SchedulerStatus::Idle => {
                    assert_eq!(report.message, "No reminder scheduled");
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("reminder never completed");
    }

    #[test]
    fn test_decode_request() {
        let parsed = ReminderService::decode_request(br#"{"text":"tea","delay_minutes":3}"#)
            .unwrap();
        assert_eq!(parsed.text.as_deref(), Some("tea"));
        assert_eq!(parsed.delay_minutes, Some(3));
        assert!(parsed.timestamp.is_none());

        let bad_bodies: [&[u8]; 4] = [
            b"{not json",
            b"",
            br#"{"text": 5}"#,
            br#"{"text":"x","delay_minutes":"ten"}"#,
        ];
        for bad in bad_bodies {
            let err = ReminderService::decode_request(bad).unwrap_err();
            assert_eq!(err, ReminderError::Decode(INVALID_JSON.to_string()));
        }
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        );

        let accepted = service
            .process_reminder_request(request("write report", None))
            .await
            .unwrap();
        assert!(accepted.success);
        assert_eq!(accepted.delay_minutes, 30);
        assert!(!accepted.timestamp.is_empty());
        assert_eq!(accepted.start_time, "2024-03-01 09:00:00");
        assert_eq!(accepted.end_time, "2024-03-01 09:30:00");

        assert_eq!(service.get_status().status, SchedulerStatus::Active);
        assert!(service.cleanup());
        assert_eq!(service.get_status().status, SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn test_configured_default_delay() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        )
        .with_default_delay(5);

        let accepted = service
            .process_reminder_request(request("short break", None))
            .await
            .unwrap();
        assert_eq!(accepted.delay_minutes, 5);
        service.cleanup();
    }

    #[tokio::test]
    async fn test_fire_notifies_and_marks_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let notifier = Arc::new(RecordingNotifier::default());
        let service = log_service(&path, notifier.clone());

        service
            .process_reminder_request(ReminderRequest {
                text: Some("drink water".into()),
                timestamp: Some("2024-03-01T09:00:00".into()),
                delay_minutes: Some(0),
            })
            .await
            .unwrap();

        wait_until(|| {
            notifier.bodies().len() == 1 && service.get_status().status == SchedulerStatus::Idle
        })
        .await;

        let sent = notifier.sent.lock().unwrap()[0].clone();
        assert_eq!(sent, Notification::reminder("drink water", "2024-03-01T09:00:00"));
        // start read at tick 0, completion at tick 1
        assert_eq!(
            read_lines(&path),
            vec!["2024-03-01T09:00:00 2024-03-01T09:01:00 drink water"]
        );
    }

    #[tokio::test]
    async fn test_notification_failure_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let service = log_service(&path, Arc::new(FailingNotifier));

        service
            .process_reminder_request(request("stretch", Some(0)))
            .await
            .unwrap();

        let check = path.clone();
        wait_until(move || {
            read_lines(&check)
                == vec!["2024-03-01T09:00:00 2024-03-01T09:01:00 stretch".to_string()]
        })
        .await;
        wait_until(|| service.get_status().status == SchedulerStatus::Idle).await;
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        let notifier = Arc::new(RecordingNotifier::default());
        let service = log_service(&path, notifier.clone());

        service
            .process_reminder_request(request("first", Some(1)))
            .await
            .unwrap();
        service
            .process_reminder_request(request("second", Some(0)))
            .await
            .unwrap();

        wait_until(|| service.get_status().status == SchedulerStatus::Idle).await;
        assert_eq!(notifier.bodies(), vec!["second"]);

        let lines = read_lines(&path);
        // first keeps its provisional end (tick 0 + 1 minute)
        assert_eq!(lines[0], "2024-03-01T09:00:00 2024-03-01T09:01:00 first");
        // second: start at tick 1, completion at tick 2
        assert_eq!(lines[1], "2024-03-01T09:01:00 2024-03-01T09:02:00 second");
    }

    #[tokio::test]
    async fn test_store_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append
        let service = log_service(dir.path(), Arc::new(RecordingNotifier::default()));

        let err = service
            .process_reminder_request(request("unwritable", Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Store(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(service.get_status().status, SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn test_status_message_names_pending_task() {
        let dir = tempfile::tempdir().unwrap();
        let service = log_service(
            &dir.path().join("reminders.log"),
            Arc::new(RecordingNotifier::default()),
        );
        assert_eq!(service.get_status().message, "No reminder scheduled");

        service
            .process_reminder_request(request("call the dentist", Some(10)))
            .await
            .unwrap();
        let report = service.get_status();
        assert_eq!(report.status, SchedulerStatus::Active);
        assert!(report.message.contains("call the dentist"));
        service.cleanup();
    }
}
