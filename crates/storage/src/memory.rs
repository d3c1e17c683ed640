// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process run store.
//!
//! Each operation runs under one lock acquisition, which gives it the same
//! all-or-nothing visibility as a database transaction.

use crate::RunStore;
use async_trait::async_trait;
use bench_analysis_core::{
    BenchmarkRun, Error, MeasurementSeries, NewBenchmarkRun, Result, RunId, RunSummary,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    runs: BTreeMap<RunId, BenchmarkRun>,
    next_run_id: RunId,
    next_series_id: i32,
    report_writes: usize,
}

/// Run store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    state: Mutex<MemoryState>,
}

impl MemoryRunStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `mark_generated` calls so far.
    pub async fn report_writes(&self) -> usize {
        self.state.lock().await.report_writes
    }

    /// Number of stored runs.
    pub async fn len(&self) -> usize {
        self.state.lock().await.runs.len()
    }

    /// Whether the store holds no runs.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.runs.is_empty()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_pending_runs(&self) -> Result<Vec<BenchmarkRun>> {
        let state = self.state.lock().await;
        Ok(state
            .runs
            .values()
            .filter(|run| run.is_pending())
            .cloned()
            .collect())
    }

    async fn count_pending(&self) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.runs.values().filter(|run| run.is_pending()).count())
    }

    async fn mark_generated(&self, run_id: RunId, report: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or(Error::RunNotFound(run_id))?;
        if !run.is_pending() {
            return Err(Error::RunNotPending(run_id));
        }
        run.generated_report = Some(report.to_string());
        state.report_writes += 1;
        Ok(())
    }

    async fn insert_run(&self, run: NewBenchmarkRun) -> Result<RunId> {
        let mut state = self.state.lock().await;
        state.next_run_id += 1;
        let run_id = state.next_run_id;

        let mut series = Vec::with_capacity(run.series.len());
        for new_series in run.series {
            state.next_series_id += 1;
            series.push(MeasurementSeries {
                id: state.next_series_id,
                run_id,
                parameter: new_series.parameter,
                data_unit: new_series.data_unit,
                measurement_name: new_series.measurement_name,
                measurements: new_series.measurements,
            });
        }

        state.runs.insert(
            run_id,
            BenchmarkRun {
                id: run_id,
                name: run.name,
                description: run.description,
                raw_data: run.raw_data,
                timestamp: Utc::now(),
                generated_report: None,
                series,
            },
        );
        Ok(run_id)
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let state = self.state.lock().await;
        Ok(state.runs.values().map(RunSummary::from).collect())
    }

    async fn fetch_run(&self, run_id: RunId) -> Result<Option<BenchmarkRun>> {
        Ok(self.state.lock().await.runs.get(&run_id).cloned())
    }

    async fn delete_run(&self, run_id: RunId) -> Result<bool> {
        Ok(self.state.lock().await.runs.remove(&run_id).is_some())
    }
}
