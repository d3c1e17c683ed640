// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! nbformat v4 serialization.
//!
//! Converts assembled [`Cell`]s into the JSON document Jupyter reads. Keys
//! are emitted in sorted order with one-space indentation, matching what
//! Jupyter itself writes, and cell ids are derived from the run id so the
//! output is byte-for-byte reproducible.

use crate::cell::Cell;
use bench_analysis_core::{Error, Result, RunId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Major notebook format version.
pub const NBFORMAT: u32 = 4;

/// Minor notebook format version (cell ids are required from 4.5).
pub const NBFORMAT_MINOR: u32 = 5;

/// A complete notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Cells in display order.
    pub cells: Vec<NotebookCell>,
    /// Kernel and language metadata.
    #[serde(default)]
    pub metadata: NotebookMetadata,
    /// Major format version.
    pub nbformat: u32,
    /// Minor format version.
    pub nbformat_minor: u32,
}

/// One serialized cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum NotebookCell {
    /// A markdown cell.
    Markdown {
        /// Cell id.
        id: String,
        /// Cell metadata.
        #[serde(default)]
        metadata: Map<String, Value>,
        /// Source lines, each keeping its newline except the last.
        #[serde(deserialize_with = "deserialize_source")]
        source: Vec<String>,
    },
    /// A code cell that has never been executed.
    Code {
        /// Execution counter; `None` until the cell runs.
        execution_count: Option<u32>,
        /// Cell id.
        id: String,
        /// Cell metadata.
        #[serde(default)]
        metadata: Map<String, Value>,
        /// Outputs produced by execution.
        #[serde(default)]
        outputs: Vec<Value>,
        /// Source lines, each keeping its newline except the last.
        #[serde(deserialize_with = "deserialize_source")]
        source: Vec<String>,
    },
}

/// Top-level notebook metadata.
///
/// Notebooks written by other tools may leave it empty; missing entries fall
/// back to the python3 defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookMetadata {
    /// Kernel to execute the notebook with.
    pub kernelspec: KernelSpec,
    /// Language the cells are written in.
    pub language_info: LanguageInfo,
}

/// Kernel specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    /// Name shown in the UI.
    pub display_name: String,
    /// Kernel language.
    pub language: String,
    /// Kernel name.
    pub name: String,
}

/// Language information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Language name.
    pub name: String,
}

impl Default for NotebookMetadata {
    fn default() -> Self {
        Self {
            kernelspec: KernelSpec {
                display_name: "Python 3".to_string(),
                language: "python".to_string(),
                name: "python3".to_string(),
            },
            language_info: LanguageInfo {
                name: "python".to_string(),
            },
        }
    }
}

impl NotebookCell {
    /// Source text with lines joined back together.
    pub fn text(&self) -> String {
        match self {
            NotebookCell::Markdown { source, .. } | NotebookCell::Code { source, .. } => {
                source.concat()
            }
        }
    }
}

impl From<&NotebookCell> for Cell {
    fn from(cell: &NotebookCell) -> Self {
        match cell {
            NotebookCell::Markdown { .. } => Cell::Narrative(cell.text()),
            NotebookCell::Code { .. } => Cell::Code(cell.text()),
        }
    }
}

impl Notebook {
    /// Wrap assembled cells for a run in a python3 notebook.
    pub fn from_cells(run_id: RunId, cells: &[Cell]) -> Self {
        let cells = cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let id = format!("run-{run_id}-cell-{index}");
                let source = split_source(cell.source());
                match cell {
                    Cell::Narrative(_) => NotebookCell::Markdown {
                        id,
                        metadata: Map::new(),
                        source,
                    },
                    Cell::Code(_) => NotebookCell::Code {
                        execution_count: None,
                        id,
                        metadata: Map::new(),
                        outputs: Vec::new(),
                        source,
                    },
                }
            })
            .collect();

        Self {
            cells,
            metadata: NotebookMetadata::default(),
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
        }
    }

    /// Serialize to notebook JSON with a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        buf.push(b'\n');

        String::from_utf8(buf)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Parse notebook JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert back to format-independent cells.
    pub fn to_cells(&self) -> Vec<Cell> {
        self.cells.iter().map(Cell::from).collect()
    }
}

fn split_source(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MultilineSource {
    Lines(Vec<String>),
    Text(String),
}

// nbformat allows a cell source to be one string or a list of lines.
fn deserialize_source<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MultilineSource::deserialize(deserializer)? {
        MultilineSource::Lines(lines) => lines,
        MultilineSource::Text(text) => split_source(&text),
    })
}
