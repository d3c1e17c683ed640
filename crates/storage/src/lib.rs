// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Storage gateway for benchmark runs.
//!
//! The [`RunStore`] trait is the only way the analysis runner touches
//! persistent state. Two implementations are provided:
//!
//! - [`PgRunStore`] - PostgreSQL via `sqlx`, sharing its tables with the
//!   benchmark producers
//! - [`MemoryRunStore`] - an in-process store for tests and previews
//!
//! Every mutation happens inside a single transaction (or a single lock
//! acquisition for the memory store), so a reader never observes a
//! half-applied write.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryRunStore;
pub use postgres::PgRunStore;

use async_trait::async_trait;
use bench_analysis_core::{BenchmarkRun, NewBenchmarkRun, Result, RunId, RunSummary};

/// Gateway over the persistent store of benchmark runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create the store and its tables if they do not exist yet.
    ///
    /// Safe to call on every startup. Fails with
    /// [`Error::StoreUnavailable`](bench_analysis_core::Error::StoreUnavailable)
    /// when the store cannot be reached or the schema is rejected.
    async fn ensure_schema(&self) -> Result<()>;

    /// Runs without a generated report, each with its series loaded in
    /// insertion order. Runs are ordered by id.
    async fn fetch_pending_runs(&self) -> Result<Vec<BenchmarkRun>>;

    /// Number of runs without a generated report.
    async fn count_pending(&self) -> Result<usize>;

    /// Store the generated report of a pending run, atomically.
    ///
    /// Fails with `RunNotFound` if the run is gone and `RunNotPending` if it
    /// already has a report.
    async fn mark_generated(&self, run_id: RunId, report: &str) -> Result<()>;

    /// Insert a pending run and all its series in one transaction.
    async fn insert_run(&self, run: NewBenchmarkRun) -> Result<RunId>;

    /// Every stored run, ordered by id, without series or payloads.
    async fn list_runs(&self) -> Result<Vec<RunSummary>>;

    /// Load one run with its series.
    async fn fetch_run(&self, run_id: RunId) -> Result<Option<BenchmarkRun>>;

    /// Delete a run and its series in one transaction. Returns whether a
    /// run was removed.
    async fn delete_run(&self, run_id: RunId) -> Result<bool>;
}
