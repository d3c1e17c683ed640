// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Analysis notebook generation for benchmark runs.
//!
//! This crate turns a stored benchmark run into a Jupyter notebook that
//! loads, tabulates and plots the run's measurement series.
//!
//! # Quick Start
//!
//! ```no_run
//! use bench_analysis_notebook::render_notebook;
//! # fn demo(run: &bench_analysis_core::BenchmarkRun) -> bench_analysis_core::Result<()> {
//! let json = render_notebook(run)?;
//! println!("{json}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`cell`] - Format-independent `Cell` type
//! - [`assemble`] - Run-to-cells document assembly
//! - [`nbformat`] - nbformat v4 JSON serialization
//! - [`io`] - Reading and writing notebook and raw output files

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod assemble;
pub mod cell;
pub mod io;
pub mod nbformat;

pub use assemble::{assemble, expected_cell_count};
pub use cell::Cell;
pub use nbformat::Notebook;

use bench_analysis_core::{BenchmarkRun, Result};

/// Assemble a run's analysis document and serialize it to notebook JSON.
pub fn render_notebook(run: &BenchmarkRun) -> Result<String> {
    let cells = assemble(run);
    Notebook::from_cells(run.id, &cells).to_json_string()
}
