// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Format-independent notebook cells.

/// One cell of a generated analysis document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Markdown prose.
    Narrative(String),
    /// Executable Python source.
    Code(String),
}

impl Cell {
    /// The cell's text.
    pub fn source(&self) -> &str {
        match self {
            Cell::Narrative(text) | Cell::Code(text) => text,
        }
    }

    /// Whether this is a code cell.
    pub fn is_code(&self) -> bool {
        matches!(self, Cell::Code(_))
    }
}
