// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Notebook file I/O.
//!
//! This module writes generated notebooks and raw benchmark output to disk
//! for download, and reads notebooks back.

use crate::nbformat::Notebook;
use bench_analysis_core::{BenchmarkRun, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension of notebook documents.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// File extension of downloaded raw benchmark output.
pub const RAW_DATA_EXTENSION: &str = "txt";

/// File name used when a run's notebook is saved into a directory.
pub fn default_file_name(run: &BenchmarkRun) -> String {
    file_name(run, NOTEBOOK_EXTENSION)
}

/// File name used when a run's raw output is saved into a directory.
pub fn raw_data_file_name(run: &BenchmarkRun) -> String {
    file_name(run, RAW_DATA_EXTENSION)
}

fn file_name(run: &BenchmarkRun, extension: &str) -> String {
    let slug: String = run
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("benchmark-{}-{}.{}", run.id, slug, extension)
}

/// Resolve an output path: directories get `default_name` appended.
pub fn resolve_output_path(output: &Path, default_name: &str) -> PathBuf {
    if output.is_dir() {
        output.join(default_name)
    } else {
        output.to_path_buf()
    }
}

/// Write serialized notebook JSON, creating parent directories.
pub fn write_notebook(path: impl AsRef<Path>, json: &str) -> io::Result<()> {
    write_creating_dirs(path.as_ref(), json)
}

/// Write a run's raw output verbatim, creating parent directories.
pub fn write_raw_data(path: impl AsRef<Path>, raw_data: &str) -> io::Result<()> {
    write_creating_dirs(path.as_ref(), raw_data)
}

fn write_creating_dirs(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Read and parse a notebook file.
pub fn read_notebook(path: impl AsRef<Path>) -> Result<Notebook> {
    let content = fs::read_to_string(path)?;
    Notebook::from_json(&content)
}
