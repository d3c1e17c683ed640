// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runner configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables (after loading a `.env` file if one exists).
//!
//! # Example
//!
//! ```no_run
//! use bench_analysis_core::RunnerConfig;
//!
//! let config = RunnerConfig::load(None)?;
//! println!("polling every {:?}", config.poll_interval());
//! # Ok::<(), bench_analysis_core::Error>(())
//! ```

use crate::error::{Error, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "analysis-runner";

/// Seconds between poll cycles unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default size of the store connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Resolved runner configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Connection URL of the PostgreSQL store.
    pub database_url: String,
    /// Seconds to wait between poll cycles.
    pub poll_interval_secs: u64,
    /// Maximum pooled store connections.
    pub max_connections: u32,
    /// Log output format.
    pub log_format: LogFormat,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    database_url: Option<String>,
    poll_interval_secs: u64,
    max_connections: u32,
    log_format: LogFormat,
    log_level: String,
}

impl RunnerConfig {
    /// Load configuration from `.env`, the config file and the environment.
    ///
    /// When `file` is `None`, `analysis-runner.{toml,yaml,json}` is used if it
    /// exists in the working directory.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;

        let settings = Self::layered(file)?
            .add_source(Environment::default().try_parsing(true))
            .build()?;
        Self::from_settings(settings)
    }

    /// Defaults plus the file layer, without the environment.
    pub fn layered(file: Option<&Path>) -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("poll_interval_secs", DEFAULT_POLL_INTERVAL_SECS as i64)?
            .set_default("max_connections", i64::from(DEFAULT_MAX_CONNECTIONS))?
            .set_default("log_format", "pretty")?
            .set_default("log_level", "info")?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        Ok(builder)
    }

    /// Validate and convert built settings.
    pub fn from_settings(settings: Config) -> Result<Self> {
        let raw: RawConfig = settings.try_deserialize()?;

        let database_url = raw
            .database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::configuration("DATABASE_URL is required but not set"))?;

        if raw.poll_interval_secs == 0 {
            return Err(Error::configuration("poll_interval_secs must be greater than zero"));
        }
        if raw.max_connections == 0 {
            return Err(Error::configuration("max_connections must be greater than zero"));
        }

        Ok(Self {
            database_url,
            poll_interval_secs: raw.poll_interval_secs,
            max_connections: raw.max_connections,
            log_format: raw.log_format,
            log_level: raw.log_level,
        })
    }

    /// Wait between poll cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// A missing .env file is fine; an unreadable or malformed one is not.
fn check_dotenv<T>(result: dotenvy::Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::configuration(format!("invalid .env file: {e}"))),
    }
}
