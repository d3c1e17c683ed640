// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL run store.

use crate::schema::SCHEMA_SQL;
use crate::RunStore;
use async_trait::async_trait;
use bench_analysis_core::{
    BenchmarkRun, Error, MeasurementSeries, NewBenchmarkRun, Result, RunId, RunSummary,
};
use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, FromRow)]
struct RunRow {
    id: i32,
    name: String,
    description: String,
    raw_data: String,
    timestamp: DateTime<Utc>,
    generated_jupyter: Option<String>,
}

#[derive(Debug, FromRow)]
struct SeriesRow {
    id: i32,
    benchmark_results_id: i32,
    parameter: String,
    data_unit: String,
    measurement_name: String,
    measurements: Vec<f64>,
}

impl From<SeriesRow> for MeasurementSeries {
    fn from(row: SeriesRow) -> Self {
        Self {
            id: row.id,
            run_id: row.benchmark_results_id,
            parameter: row.parameter,
            data_unit: row.data_unit,
            measurement_name: row.measurement_name,
            measurements: row.measurements,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: i32,
    name: String,
    timestamp: DateTime<Utc>,
    has_report: bool,
}

impl From<SummaryRow> for RunSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            timestamp: row.timestamp,
            has_report: row.has_report,
        }
    }
}

impl RunRow {
    fn into_run(self, series: Vec<MeasurementSeries>) -> BenchmarkRun {
        BenchmarkRun {
            id: self.id,
            name: self.name,
            description: self.description,
            raw_data: self.raw_data,
            timestamp: self.timestamp,
            generated_report: self.generated_jupyter,
            series,
        }
    }
}

const RUN_COLUMNS: &str = "id, name, description, raw_data, timestamp, generated_jupyter";

const SERIES_COLUMNS: &str =
    "id, benchmark_results_id, parameter, data_unit, measurement_name, measurements";

/// Run store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgRunStore {
    pool: PgPool,
    database_url: String,
}

impl PgRunStore {
    /// Create a store with a lazily connecting pool.
    ///
    /// No connection is made until the first query, so the database itself
    /// may still be created by [`RunStore::ensure_schema`].
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .map_err(Error::store_unavailable)?;

        Ok(Self {
            pool,
            database_url: database_url.to_string(),
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, database_url: impl Into<String>) -> Self {
        Self {
            pool,
            database_url: database_url.into(),
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_series(&self, run_ids: &[i32]) -> Result<HashMap<i32, Vec<MeasurementSeries>>> {
        let mut by_run: HashMap<i32, Vec<MeasurementSeries>> = HashMap::new();
        if run_ids.is_empty() {
            return Ok(by_run);
        }

        let rows = sqlx::query_as::<_, SeriesRow>(&format!(
            "SELECT {SERIES_COLUMNS} FROM benchmark_data \
             WHERE benchmark_results_id = ANY($1) \
             ORDER BY benchmark_results_id, id"
        ))
        .bind(run_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::persistence)?;

        for row in rows {
            by_run
                .entry(row.benchmark_results_id)
                .or_default()
                .push(row.into());
        }
        Ok(by_run)
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn ensure_schema(&self) -> Result<()> {
        let exists = Postgres::database_exists(&self.database_url)
            .await
            .map_err(Error::store_unavailable)?;
        if !exists {
            info!("Database does not exist, creating it");
            Postgres::create_database(&self.database_url)
                .await
                .map_err(Error::store_unavailable)?;
        }

        let mut tx = self.pool.begin().await.map_err(Error::store_unavailable)?;
        // An unbound query string goes over the simple protocol, which accepts
        // several statements.
        sqlx::Executor::execute(&mut *tx, SCHEMA_SQL)
            .await
            .map_err(Error::store_unavailable)?;
        tx.commit().await.map_err(Error::store_unavailable)?;

        debug!("Schema ensured");
        Ok(())
    }

    async fn fetch_pending_runs(&self) -> Result<Vec<BenchmarkRun>> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM benchmark_results \
             WHERE generated_jupyter IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::persistence)?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut series = self.load_series(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let owned = series.remove(&row.id).unwrap_or_default();
                row.into_run(owned)
            })
            .collect())
    }

    async fn count_pending(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM benchmark_results WHERE generated_jupyter IS NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::persistence)?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn mark_generated(&self, run_id: RunId, report: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::persistence)?;

        let updated = sqlx::query(
            "UPDATE benchmark_results SET generated_jupyter = $2 \
             WHERE id = $1 AND generated_jupyter IS NULL",
        )
        .bind(run_id)
        .bind(report)
        .execute(&mut *tx)
        .await
        .map_err(Error::persistence)?
        .rows_affected();

        if updated == 0 {
            let exists: Option<i32> =
                sqlx::query_scalar("SELECT id FROM benchmark_results WHERE id = $1")
                    .bind(run_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(Error::persistence)?;
            tx.rollback().await.map_err(Error::persistence)?;

            return Err(match exists {
                Some(_) => Error::RunNotPending(run_id),
                None => Error::RunNotFound(run_id),
            });
        }

        tx.commit().await.map_err(Error::persistence)?;
        Ok(())
    }

    async fn insert_run(&self, run: NewBenchmarkRun) -> Result<RunId> {
        let mut tx = self.pool.begin().await.map_err(Error::persistence)?;

        let run_id: i32 = sqlx::query_scalar(
            "INSERT INTO benchmark_results (name, description, raw_data) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&run.name)
        .bind(&run.description)
        .bind(&run.raw_data)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::persistence)?;

        for series in &run.series {
            sqlx::query(
                "INSERT INTO benchmark_data \
                 (benchmark_results_id, parameter, data_unit, measurement_name, measurements) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(run_id)
            .bind(&series.parameter)
            .bind(&series.data_unit)
            .bind(&series.measurement_name)
            .bind(&series.measurements)
            .execute(&mut *tx)
            .await
            .map_err(Error::persistence)?;
        }

        tx.commit().await.map_err(Error::persistence)?;
        Ok(run_id)
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, name, timestamp, generated_jupyter IS NOT NULL AS has_report \
             FROM benchmark_results ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::persistence)?;

        Ok(rows.into_iter().map(RunSummary::from).collect())
    }

    async fn fetch_run(&self, run_id: RunId) -> Result<Option<BenchmarkRun>> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM benchmark_results WHERE id = $1"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::persistence)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut series = self.load_series(&[row.id]).await?;
        let owned = series.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_run(owned)))
    }

    async fn delete_run(&self, run_id: RunId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::persistence)?;

        sqlx::query("DELETE FROM benchmark_data WHERE benchmark_results_id = $1")
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::persistence)?;

        let deleted = sqlx::query("DELETE FROM benchmark_results WHERE id = $1")
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::persistence)?
            .rows_affected();

        tx.commit().await.map_err(Error::persistence)?;
        Ok(deleted > 0)
    }
}
