mod sampler;

pub use sampler::{CpuSampler, Sampler};

use crate::models::JobSchedule;
use crate::repo::MetricStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Recorded,
    /// The sampler could not read the host; nothing was stored.
    Skipped,
    /// The sample was taken but the store refused it.
    StoreFailed,
}

#[derive(Debug, Default)]
struct TickCounters {
    recorded: AtomicU64,
    skipped: AtomicU64,
    store_failed: AtomicU64,
}

impl TickCounters {
    fn record(&self, outcome: TickOutcome) {
        let counter = match outcome {
            TickOutcome::Recorded => &self.recorded,
            TickOutcome::Skipped => &self.skipped,
            TickOutcome::StoreFailed => &self.store_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub recorded: u64,
    pub skipped: u64,
    pub store_failed: u64,
}

/// Drives one [`Sampler`] into one [`MetricStore`] on a fixed cadence.
///
/// Ticks run on a dedicated task. Missed ticks are dropped rather than
/// replayed, and a failed tick never stops the schedule.
pub struct MetricsScheduler {
    sampler: Arc<dyn Sampler>,
    store: Arc<dyn MetricStore>,
    schedule: JobSchedule,
    shutdown_grace: Duration,
    is_running: Arc<AtomicBool>,
    counters: Arc<TickCounters>,
    task: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MetricsScheduler {
    pub fn new(
        sampler: Arc<dyn Sampler>,
        store: Arc<dyn MetricStore>,
        schedule: JobSchedule,
    ) -> Self {
        Self {
            sampler,
            store,
            schedule,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            is_running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(TickCounters::default()),
            task: Mutex::new(None),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Runs a single tick immediately, outside the schedule.
    pub async fn tick_once(&self) -> TickOutcome {
        let outcome = run_tick(self.sampler.as_ref(), self.store.as_ref()).await;
        self.counters.record(outcome);
        outcome
    }

    pub async fn start(&self) {
        // Held until the task is stored so a concurrent stop always finds it.
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("Metrics scheduler is already running");
            return;
        }

        let interval = self.schedule.interval();
        info!(
            kind = %self.schedule.kind,
            schedule = %self.schedule.cron,
            interval_secs = interval.as_secs(),
            "Starting metrics scheduler"
        );

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let sampler = Arc::clone(&self.sampler);
        let store = Arc::clone(&self.store);
        let counters = Arc::clone(&self.counters);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately; sampling starts one interval in.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let outcome = run_tick(sampler.as_ref(), store.as_ref()).await;
                        counters.record(outcome);
                    }
                }
            }

            info!("Metrics scheduler task stopped");
        });

        *task = Some(RunningTask {
            shutdown_tx,
            handle,
        });
        self.is_running.store(true, Ordering::SeqCst);
    }

    /// Stops accepting ticks and waits, up to the grace period, for a tick
    /// that is already running.
    pub async fn stop(&self) {
        let Some(RunningTask {
            shutdown_tx,
            mut handle,
        }) = self.task.lock().await.take()
        else {
            warn!("Metrics scheduler is not running");
            return;
        };
        self.is_running.store(false, Ordering::SeqCst);

        info!("Stopping metrics scheduler...");
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Metrics scheduler task failed"),
            Err(_) => {
                warn!(
                    grace_secs = self.shutdown_grace.as_secs(),
                    "In-flight tick exceeded the shutdown grace period; aborting"
                );
                handle.abort();
            }
        }

        info!("Metrics scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> TickStats {
        TickStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            store_failed: self.counters.store_failed.load(Ordering::Relaxed),
        }
    }

    pub fn schedule(&self) -> &JobSchedule {
        &self.schedule
    }
}

impl Drop for MetricsScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

async fn run_tick(sampler: &dyn Sampler, store: &dyn MetricStore) -> TickOutcome {
    let sample = match sampler.sample().await {
        Ok(sample) => sample,
        Err(e) => {
            warn!(
                kind = %sampler.kind(),
                error_code = e.error_code(),
                error = %e,
                "Sample unavailable, skipping tick"
            );
            return TickOutcome::Skipped;
        }
    };

    match store.create(&sample).await {
        Ok(()) => {
            debug!(
                kind = %sampler.kind(),
                value = sample.value,
                time = sample.time,
                "Scheduled sample recorded"
            );
            TickOutcome::Recorded
        }
        Err(e) => {
            error!(kind = %sampler.kind(), error = %e, "Failed to store scheduled sample");
            TickOutcome::StoreFailed
        }
    }
}
