//! Periodic purge of expired notifications.
//!
//! The scheduler runs one pass per interval on a Tokio task: it purges
//! expired records from the store and drops idle rate-limit windows.
//! Passes never overlap, and a failed pass is logged without stopping the task.

use crate::application::limiter::RateLimiter;
use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::application::store::NotificationStore;
use chrono::{DateTime, Utc};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

/// Error returned when cleanup configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupConfigError {
    /// Cleanup interval must be greater than zero
    ZeroCleanupInterval,
}

impl std::fmt::Display for CleanupConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanupConfigError::ZeroCleanupInterval => {
                write!(f, "cleanup interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for CleanupConfigError {}

/// Error returned when the cleanup task does not stop cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The task panicked outside a cleanup pass
    TaskPanicked(String),
    /// The task was cancelled by the runtime before it could stop
    TaskCancelled,
}

impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownError::TaskPanicked(msg) => write!(f, "cleanup task panicked: {}", msg),
            ShutdownError::TaskCancelled => write!(f, "cleanup task was cancelled"),
        }
    }
}

impl std::error::Error for ShutdownError {}

/// Configuration for the cleanup scheduler.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to run a cleanup pass
    pub interval: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CleanupConfig {
    /// Create a new cleanup config with the specified interval.
    ///
    /// # Errors
    /// Returns `CleanupConfigError::ZeroCleanupInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, CleanupConfigError> {
        if interval.is_zero() {
            return Err(CleanupConfigError::ZeroCleanupInterval);
        }
        Ok(Self { interval })
    }
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Clock reading the pass used
    pub at: DateTime<Utc>,
    /// Expired notifications removed
    pub purged: usize,
    /// Idle rate-limit windows dropped
    pub components_pruned: usize,
}

/// Runs cleanup passes against a store and rate limiter.
///
/// Clones share the in-flight guard, so a manual pass and the background
/// task never overlap.
#[derive(Clone)]
pub struct CleanupScheduler {
    store: Arc<NotificationStore>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    config: CleanupConfig,
    running: Arc<AtomicBool>,
}

impl CleanupScheduler {
    pub fn new(
        store: Arc<NotificationStore>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        config: CleanupConfig,
    ) -> Self {
        Self {
            store,
            limiter,
            clock,
            metrics,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run a single pass now.
    ///
    /// Returns `None` if another pass is still in flight or if this pass
    /// failed; failures are logged and counted, never propagated.
    pub fn run_once(&self) -> Option<CleanupReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("cleanup pass already in progress, skipping");
            return None;
        }

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let now = self.clock.now();
            CleanupReport {
                at: now,
                purged: self.store.purge_expired(now),
                components_pruned: self.limiter.prune(now),
            }
        }));
        self.running.store(false, Ordering::Release);

        match result {
            Ok(report) => {
                self.metrics.record_cleanup_pass();
                self.metrics.record_expired(report.purged);
                if report.purged > 0 || report.components_pruned > 0 {
                    debug!(
                        purged = report.purged,
                        components_pruned = report.components_pruned,
                        remaining = self.store.len(),
                        "cleanup pass completed"
                    );
                }
                Some(report)
            }
            Err(payload) => {
                self.metrics.record_cleanup_failure();
                error!(
                    reason = panic_message(payload.as_ref()),
                    "cleanup pass failed; retrying on next tick"
                );
                None
            }
        }
    }

    /// Start running passes periodically on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime; use [`start_on`](Self::start_on)
    /// to pick a runtime explicitly.
    pub fn start(self) -> CleanupHandle {
        self.start_on(&Handle::current())
    }

    /// Start running passes periodically on `runtime`.
    ///
    /// The first pass runs one interval after start. Ticks that fall due
    /// while a pass is still running are skipped, not queued.
    pub fn start_on(self, runtime: &Handle) -> CleanupHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(interval = ?period, "cleanup scheduler started");

            loop {
                tokio::select! {
                    biased;
                    // Fires on explicit shutdown and when the handle is dropped
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                }
            }

            debug!("cleanup scheduler stopped");
        });

        CleanupHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Get the scheduler configuration.
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }
}

impl std::fmt::Debug for CleanupScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScheduler")
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to a running cleanup task.
///
/// Dropping the handle signals the task to stop without waiting for it;
/// call [`shutdown`](Self::shutdown) to stop and join it.
#[derive(Debug)]
pub struct CleanupHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Stop the task and wait for it to finish.
    ///
    /// # Errors
    /// Returns an error if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                if e.is_panic() {
                    ShutdownError::TaskPanicked(panic_message(e.into_panic().as_ref()))
                } else {
                    ShutdownError::TaskCancelled
                }
            }),
            None => Ok(()),
        }
    }

    /// Whether the task has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
