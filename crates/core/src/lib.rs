// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the benchmark analysis runner.
//!
//! This crate provides the data model shared by every other crate in the
//! workspace: benchmark runs, their per-parameter measurement series, the
//! error taxonomy and the runner configuration.
//!
//! # Modules
//!
//! - [`model`] - `BenchmarkRun` and `MeasurementSeries`
//! - [`error`] - The workspace-wide `Error` type
//! - [`config`] - `RunnerConfig` loading from files and the environment

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;

pub use crate::config::{LogFormat, RunnerConfig};
pub use error::{Error, Result};
pub use model::{
    BenchmarkRun, MeasurementSeries, NewBenchmarkRun, NewMeasurementSeries, RunId, RunSummary,
};
