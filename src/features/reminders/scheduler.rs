//! # Delayed Task Scheduler
//!
//! Single-slot scheduler: at most one delayed task is pending at any time.
//! Arming a new task supersedes the pending one instead of queueing behind it.
//!
//! Every arm gets a fresh generation id. When its timer elapses the task
//! re-takes the slot lock and only proceeds if the slot still holds that id,
//! so a superseded or cancelled task never reaches its callback. Once a task
//! has claimed the slot for firing it runs to completion; a cancel at that
//! point only forgets it.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Whether a task currently occupies the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerStatus {
    Active,
    Idle,
}

impl std::fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerStatus::Active => write!(f, "active"),
            SchedulerStatus::Idle => write!(f, "idle"),
        }
    }
}

/// Read-only view of the pending task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub text: String,
    pub timestamp: String,
    pub delay_minutes: u64,
    pub firing: bool,
}

struct PendingTask {
    id: u64,
    text: String,
    timestamp: String,
    delay_minutes: u64,
    /// Set once the timer has claimed the slot and started the callback
    firing: bool,
    handle: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<PendingTask>>>;

pub struct DelayedTaskScheduler {
    slot: Slot,
    next_id: AtomicU64,
}

impl DelayedTaskScheduler {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(slot: &Mutex<Option<PendingTask>>) -> MutexGuard<'_, Option<PendingTask>> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop a task from the slot, aborting its timer unless it is already firing
    fn retire(task: PendingTask) {
        if task.firing {
            debug!("Task '{}' already firing, letting it finish", task.text);
        } else {
            task.handle.abort();
        }
    }

    /// Schedule `on_fire(text, timestamp)` after `delay_minutes`, replacing any
    /// pending task. Returns immediately; must be called inside a tokio runtime.
    pub fn arm<F, Fut>(&self, text: &str, timestamp: &str, delay_minutes: u64, on_fire: F)
    where
        F: FnOnce(String, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let delay = Duration::from_secs(delay_minutes.saturating_mul(60));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        let mut slot = Self::lock(&self.slot);
        if let Some(previous) = slot.take() {
            info!("Cancelled previous pending reminder: {}", previous.text);
            Self::retire(previous);
        }

        let timer_slot = Arc::clone(&self.slot);
        let fire_text = text.to_string();
        let fire_timestamp = timestamp.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::fire(timer_slot, id, fire_text, fire_timestamp, on_fire).await;
        });

        *slot = Some(PendingTask {
            id,
            text: text.to_string(),
            timestamp: timestamp.to_string(),
            delay_minutes,
            firing: false,
            handle,
        });

        let fires_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| chrono::Local::now().checked_add_signed(delay))
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "an unreachable time".to_string());
        info!(
            "Armed reminder '{}' to fire in {} minute(s) at {}",
            text, delay_minutes, fires_at
        );
    }

    async fn fire<F, Fut>(slot: Slot, id: u64, text: String, timestamp: String, on_fire: F)
    where
        F: FnOnce(String, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        {
            let mut guard = Self::lock(&slot);
            match guard.as_mut() {
                Some(task) if task.id == id => task.firing = true,
                _ => {
                    debug!("Reminder '{}' was superseded before firing", text);
                    return;
                }
            }
        }

        debug!("Firing reminder '{}'", text);
        let label = text.clone();
        // Own task so a panicking callback cannot take the slot bookkeeping with it
        let outcome = tokio::spawn(async move { on_fire(text, timestamp).await }).await;
        match outcome {
            Ok(Ok(())) => info!("Reminder '{}' completed", label),
            Ok(Err(e)) => error!("Reminder '{}' failed while firing: {:#}", label, e),
            Err(e) => error!("Reminder '{}' callback panicked: {}", label, e),
        }

        let mut guard = Self::lock(&slot);
        if guard.as_ref().is_some_and(|task| task.id == id) {
            *guard = None;
        }
    }

    /// Cancel the pending task, if any. Returns whether one was removed.
    pub fn cancel(&self) -> bool {
        match Self::lock(&self.slot).take() {
            Some(task) => {
                info!("Cancelled pending reminder: {}", task.text);
                Self::retire(task);
                true
            }
            None => false,
        }
    }

    /// Best-effort snapshot of the slot
    pub fn status(&self) -> SchedulerStatus {
        if Self::lock(&self.slot).is_some() {
            SchedulerStatus::Active
        } else {
            SchedulerStatus::Idle
        }
    }

    pub fn pending(&self) -> Option<PendingSnapshot> {
        Self::lock(&self.slot).as_ref().map(|task| PendingSnapshot {
            text: task.text.clone(),
            timestamp: task.timestamp.clone(),
            delay_minutes: task.delay_minutes,
            firing: task.firing,
        })
    }
}

impl Default for DelayedTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DelayedTaskScheduler {
    fn drop(&mut self) {
        if let Some(task) = Self::lock(&self.slot).take() {
            warn!("Scheduler dropped with pending reminder '{}'", task.text);
            Self::retire(task);
        }
    }
}
