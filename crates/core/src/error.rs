// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared across the analysis runner.

use crate::model::RunId;
use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur while loading configuration, talking to the store,
/// or producing a notebook.
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting is missing or invalid. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The store could not be reached or its schema could not be created.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A read or write against the store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The referenced run does not exist.
    #[error("Benchmark run {0} not found")]
    RunNotFound(RunId),

    /// The run already carries a generated report.
    #[error("Benchmark run {0} already has a generated report")]
    RunNotPending(RunId),

    /// Notebook JSON could not be produced or parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a store-unavailable error from any displayable cause.
    pub fn store_unavailable(cause: impl Display) -> Self {
        Error::StoreUnavailable(cause.to_string())
    }

    /// Create a persistence error from any displayable cause.
    pub fn persistence(cause: impl Display) -> Self {
        Error::Persistence(cause.to_string())
    }

    /// Whether the process cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::StoreUnavailable(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

/// Result type for analysis runner operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::configuration("DATABASE_URL is not set").is_fatal());
        assert!(Error::store_unavailable("connection refused").is_fatal());
        assert!(!Error::persistence("deadlock detected").is_fatal());
        assert!(!Error::RunNotFound(3).is_fatal());
    }

    #[test]
    fn test_messages_name_the_run() {
        assert_eq!(
            Error::RunNotPending(12).to_string(),
            "Benchmark run 12 already has a generated report"
        );
        assert_eq!(Error::RunNotFound(7).to_string(), "Benchmark run 7 not found");
    }
}
