// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! The poll loop.
//!
//! The loop alternates between two states:
//!
//! ```text
//!          interval elapsed
//!   Idle ───────────────────▶ Processing
//!    ▲                            │
//!    └────── batch drained ───────┘
//! ```
//!
//! In `Processing` the pending runs are handled one at a time in store order.
//! The loop only stops when its cancellation token fires; cancellation is
//! honoured while waiting and between runs, never in the middle of a write.

use crate::clock::{Clock, TokioClock};
use bench_analysis_core::{BenchmarkRun, Result};
use bench_analysis_notebook::{assemble, Notebook};
use bench_analysis_storage::RunStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next cycle.
    Idle,
    /// Draining the pending batch.
    Processing,
}

/// What to do when a single run cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, leave the run pending and continue with the next run.
    #[default]
    SkipAndRetry,
    /// Stop the loop with the error.
    Abort,
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pending runs returned by the store.
    pub fetched: usize,
    /// Runs whose report was written.
    pub generated: usize,
    /// Runs that failed and stay pending.
    pub failed: usize,
    /// Runs that already had a report and were left untouched.
    pub skipped: usize,
}

/// Periodically generates notebooks for pending benchmark runs.
pub struct Poller {
    store: Arc<dyn RunStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    policy: FailurePolicy,
    state: PollState,
}

impl Poller {
    /// Create a poller using the wall clock and the skip-and-retry policy.
    pub fn new(store: Arc<dyn RunStore>, interval: Duration) -> Self {
        Self {
            store,
            clock: Arc::new(TokioClock),
            interval,
            policy: FailurePolicy::default(),
            state: PollState::Idle,
        }
    }

    /// Replace the timer.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the per-run failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current state.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns an error when a fatal error occurs, or on any error under
    /// [`FailurePolicy::Abort`].
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            policy = ?self.policy,
            "Poll loop started"
        );

        loop {
            match self.state {
                PollState::Idle => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {
                            info!("Poll loop stopped");
                            return Ok(());
                        }
                        _ = self.clock.sleep(self.interval) => {
                            self.state = PollState::Processing;
                        }
                    }
                }
                PollState::Processing => {
                    let outcome = self.run_cycle(&shutdown).await;
                    self.state = PollState::Idle;

                    match outcome {
                        Ok(report) => {
                            if report.fetched > 0 {
                                info!(
                                    fetched = report.fetched,
                                    generated = report.generated,
                                    failed = report.failed,
                                    skipped = report.skipped,
                                    "Poll cycle finished"
                                );
                            }
                        }
                        Err(e) if self.policy == FailurePolicy::SkipAndRetry && !e.is_fatal() => {
                            error!(error = %e, "Poll cycle failed, retrying next cycle");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Fetch the pending batch and process it run by run.
    ///
    /// Stops early, leaving the remaining runs pending, once `shutdown` is
    /// cancelled.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<CycleReport> {
        let runs = self.store.fetch_pending_runs().await?;
        let mut report = CycleReport {
            fetched: runs.len(),
            ..CycleReport::default()
        };

        if runs.is_empty() {
            debug!("No pending benchmark runs");
            return Ok(report);
        }
        info!(pending = runs.len(), "Processing pending benchmark runs");

        for (index, run) in runs.iter().enumerate() {
            if shutdown.is_cancelled() {
                info!(
                    remaining = runs.len() - index,
                    "Shutdown requested, leaving remaining runs pending"
                );
                break;
            }

            if !run.is_pending() {
                debug!(run_id = run.id, "Run already has a report, skipping");
                report.skipped += 1;
                continue;
            }

            match self.process_run(run).await {
                Ok(()) => report.generated += 1,
                Err(e) if self.policy == FailurePolicy::SkipAndRetry => {
                    error!(run_id = run.id, error = %e, "Report generation failed, run left pending");
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Generate and store the notebook for one run.
    #[instrument(skip(self, run), fields(run_id = run.id, series = run.series.len()))]
    pub async fn process_run(&self, run: &BenchmarkRun) -> Result<()> {
        for series in run.degenerate_series() {
            warn!(
                parameter = %series.parameter,
                "Series has no usable measurements, mean reference line omitted"
            );
        }

        let cells = assemble(run);
        let json = Notebook::from_cells(run.id, &cells).to_json_string()?;
        self.store.mark_generated(run.id, &json).await?;

        info!(cells = cells.len(), bytes = json.len(), "Generated analysis notebook");
        Ok(())
    }
}
