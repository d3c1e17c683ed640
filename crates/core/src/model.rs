// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark run and measurement series types.
//!
//! A [`BenchmarkRun`] owns an ordered list of [`MeasurementSeries`], one per
//! varied parameter. Runs are written by an external producer; the analysis
//! runner only reads them and fills in `generated_report` exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a benchmark run.
pub type RunId = i32;

/// Store-assigned identifier of a measurement series.
pub type SeriesId = i32;

/// One parameter's samples within a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSeries {
    /// Unique series identifier.
    pub id: SeriesId,
    /// The owning run.
    pub run_id: RunId,
    /// What was varied or measured, e.g. `threads=4`.
    pub parameter: String,
    /// Unit label for display.
    pub data_unit: String,
    /// Human-readable axis label for the sample values.
    pub measurement_name: String,
    /// Raw samples in insertion order.
    pub measurements: Vec<f64>,
}

impl MeasurementSeries {
    /// Arithmetic mean of the samples, skipping NaN ones the way a data
    /// frame column mean does. `None` when no sample remains.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .measurements
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Whether the series has no samples to plot a mean for.
    pub fn is_degenerate(&self) -> bool {
        self.measurements.iter().all(|v| v.is_nan())
    }
}

/// A stored benchmark run with its series loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Unique run identifier.
    pub id: RunId,
    /// Benchmark name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Verbatim raw benchmark output.
    pub raw_data: String,
    /// Insertion time, assigned by the store.
    pub timestamp: DateTime<Utc>,
    /// Serialized notebook; `None` while generation is pending.
    pub generated_report: Option<String>,
    /// Owned series in insertion order.
    pub series: Vec<MeasurementSeries>,
}

impl BenchmarkRun {
    /// Whether the run still awaits a generated report.
    pub fn is_pending(&self) -> bool {
        self.generated_report.is_none()
    }

    /// Series with no samples to average.
    pub fn degenerate_series(&self) -> impl Iterator<Item = &MeasurementSeries> {
        self.series.iter().filter(|s| s.is_degenerate())
    }
}

/// Listing entry for a stored run, without its series or payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub id: RunId,
    /// Benchmark name.
    pub name: String,
    /// Insertion time.
    pub timestamp: DateTime<Utc>,
    /// Whether the notebook has been generated.
    pub has_report: bool,
}

impl From<&BenchmarkRun> for RunSummary {
    fn from(run: &BenchmarkRun) -> Self {
        Self {
            id: run.id,
            name: run.name.clone(),
            timestamp: run.timestamp,
            has_report: !run.is_pending(),
        }
    }
}

/// A series as submitted by a benchmark producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurementSeries {
    /// What was varied or measured.
    pub parameter: String,
    /// Raw samples.
    pub measurements: Vec<f64>,
    /// Unit label.
    pub data_unit: String,
    /// Axis label.
    pub measurement_name: String,
}

/// A benchmark result as submitted by a producer, before the store assigns
/// identifiers and a timestamp.
///
/// Deserializes from the standard result response JSON, where the series
/// list is named `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBenchmarkRun {
    /// Benchmark name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Series, in the order they should be reported.
    #[serde(rename = "data", default)]
    pub series: Vec<NewMeasurementSeries>,
    /// Verbatim raw benchmark output.
    pub raw_data: String,
}

impl NewBenchmarkRun {
    /// Create a run with no series.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        raw_data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            series: Vec::new(),
            raw_data: raw_data.into(),
        }
    }

    /// Append a series.
    pub fn with_series(
        mut self,
        parameter: impl Into<String>,
        data_unit: impl Into<String>,
        measurement_name: impl Into<String>,
        measurements: Vec<f64>,
    ) -> Self {
        self.series.push(NewMeasurementSeries {
            parameter: parameter.into(),
            measurements,
            data_unit: data_unit.into(),
            measurement_name: measurement_name.into(),
        });
        self
    }
}
