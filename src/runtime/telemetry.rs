use crate::runtime::progress::ProgressTracker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the progress reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Rolling counters for one sequencer.
#[derive(Default, Debug)]
pub struct Telemetry {
    cases_executed: AtomicU64,
    cases_passed: AtomicU64,
    cases_failed: AtomicU64,
    cases_skipped: AtomicU64,
    hooks_invoked: AtomicU64,
    hook_failures: AtomicU64,
    hook_timeouts: AtomicU64,
    requests_issued: AtomicU64,
    unresolved_reads: AtomicU64,
}

impl Telemetry {
    pub fn record_case_passed(&self) {
        self.cases_executed.fetch_add(1, Ordering::Relaxed);
        self.cases_passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_case_failed(&self) {
        self.cases_executed.fetch_add(1, Ordering::Relaxed);
        self.cases_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_case_skipped(&self) {
        self.cases_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hook_invoked(&self) {
        self.hooks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hook_failure(&self) {
        self.hook_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hook_timeout(&self) {
        self.hook_timeouts.fetch_add(1, Ordering::Relaxed);
        self.hook_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_issued(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unresolved_read(&self) {
        self.unresolved_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            cases_executed: self.cases_executed.load(Ordering::Relaxed),
            cases_passed: self.cases_passed.load(Ordering::Relaxed),
            cases_failed: self.cases_failed.load(Ordering::Relaxed),
            cases_skipped: self.cases_skipped.load(Ordering::Relaxed),
            hooks_invoked: self.hooks_invoked.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            hook_timeouts: self.hook_timeouts.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            unresolved_reads: self.unresolved_reads.load(Ordering::Relaxed),
        }
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued.load(Ordering::Relaxed)
    }

    pub fn hook_timeouts(&self) -> u64 {
        self.hook_timeouts.load(Ordering::Relaxed)
    }

    pub fn unresolved_reads(&self) -> u64 {
        self.unresolved_reads.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub cases_executed: u64,
    pub cases_passed: u64,
    pub cases_failed: u64,
    pub cases_skipped: u64,
    pub hooks_invoked: u64,
    pub hook_failures: u64,
    pub hook_timeouts: u64,
    pub requests_issued: u64,
    pub unresolved_reads: u64,
}

/// Spawns a background task that periodically logs case progress, throughput, and failures.
pub fn spawn_progress_reporter(
    telemetry: Arc<Telemetry>,
    progress: Arc<ProgressTracker>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "hookline::metrics", "progress reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let executed_delta = current_snapshot
                        .cases_executed
                        .saturating_sub(last_snapshot.cases_executed);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        executed_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "hookline::metrics",
                        completed = progress.completed(),
                        total = progress.total(),
                        throughput = format!("{throughput:.2}"),
                        passed = current_snapshot.cases_passed,
                        failed = current_snapshot.cases_failed,
                        skipped = current_snapshot.cases_skipped,
                        hook_failures = current_snapshot.hook_failures,
                        hook_timeouts = current_snapshot.hook_timeouts,
                        unresolved_reads = current_snapshot.unresolved_reads,
                        "contract run progress"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
