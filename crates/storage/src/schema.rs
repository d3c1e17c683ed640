// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL schema shared with benchmark producers.

/// Idempotent DDL for both tables.
///
/// Series reference their run with `ON DELETE CASCADE`; the store also
/// deletes them explicitly when removing a run.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_results (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    raw_data TEXT NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
    generated_jupyter TEXT
);

CREATE TABLE IF NOT EXISTS benchmark_data (
    id SERIAL PRIMARY KEY,
    benchmark_results_id INTEGER NOT NULL
        REFERENCES benchmark_results (id) ON DELETE CASCADE,
    parameter TEXT NOT NULL,
    data_unit TEXT NOT NULL,
    measurements DOUBLE PRECISION[] NOT NULL,
    measurement_name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS benchmark_data_results_id_idx
    ON benchmark_data (benchmark_results_id);

CREATE INDEX IF NOT EXISTS benchmark_results_pending_idx
    ON benchmark_results (id) WHERE generated_jupyter IS NULL;
"#;
