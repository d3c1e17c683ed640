// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface.

use crate::poller::{FailurePolicy, Poller};
use crate::telemetry;
use anyhow::{bail, Context};
use bench_analysis_core::{BenchmarkRun, NewBenchmarkRun, RunId, RunSummary, RunnerConfig};
use bench_analysis_notebook::{io as notebook_io, render_notebook, Notebook};
use bench_analysis_storage::{PgRunStore, RunStore};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Benchmark analysis runner.
#[derive(Parser, Debug)]
#[command(name = "analysis-runner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./analysis-runner.toml when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll for benchmark runs without a notebook and generate one for each.
    ///
    /// Runs until interrupted (Ctrl-C or SIGTERM).
    Run {
        /// Seconds between poll cycles, overriding the configuration.
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Process the current pending batch once and exit.
        #[arg(long)]
        once: bool,

        /// Stop at the first run that fails instead of leaving it pending.
        #[arg(long)]
        fail_fast: bool,
    },

    /// Insert a benchmark result JSON file as a pending run.
    Import {
        /// Result file with name, description, raw_data and data fields.
        file: PathBuf,
    },

    /// Generate a run's notebook without storing it.
    Render {
        /// Benchmark run id.
        id: RunId,

        /// Output file or directory (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a run's stored notebook.
    Export {
        /// Benchmark run id.
        id: RunId,

        /// Output file or directory (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a run's raw benchmark output.
    Raw {
        /// Benchmark run id.
        id: RunId,

        /// Output file or directory (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored runs with their notebook state.
    List,

    /// Show how many runs are waiting for a notebook.
    Status,
}

/// Parse arguments, load configuration, connect and run the command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config =
        RunnerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    telemetry::init_tracing(config.log_format, &config.log_level);

    let store = PgRunStore::connect_lazy(&config.database_url, config.max_connections)
        .context("invalid database URL")?;
    store
        .ensure_schema()
        .await
        .context("failed to prepare the benchmark store")?;

    let store = Arc::new(store);
    let result = execute(cli.command, &config, store.clone()).await;
    store.close().await;
    result
}

/// Run one command against an already prepared store.
pub async fn execute(
    command: Commands,
    config: &RunnerConfig,
    store: Arc<dyn RunStore>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            interval,
            once,
            fail_fast,
        } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            let policy = if fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::SkipAndRetry
            };
            let mut poller = Poller::new(store, interval).with_failure_policy(policy);

            if once {
                let report = poller.run_cycle(&CancellationToken::new()).await?;
                info!(
                    fetched = report.fetched,
                    generated = report.generated,
                    failed = report.failed,
                    "Single poll cycle finished"
                );
                if report.failed > 0 {
                    bail!("{} benchmark run(s) failed and remain pending", report.failed);
                }
                return Ok(());
            }

            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            info!("Analysis runner started");
            poller.run(shutdown).await?;
            Ok(())
        }

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let new_run: NewBenchmarkRun = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a valid benchmark result", file.display()))?;
            let series = new_run.series.len();

            let run_id = store.insert_run(new_run).await?;
            info!(run_id, series, "Imported benchmark run");
            println!("{run_id}");
            Ok(())
        }

        Commands::Render { id, output } => {
            let run = store
                .fetch_run(id)
                .await?
                .with_context(|| format!("benchmark run {id} not found"))?;
            let json = render_notebook(&run)?;
            write_notebook_output(&json, output.as_deref(), &run)
        }

        Commands::Export { id, output } => {
            let run = store
                .fetch_run(id)
                .await?
                .with_context(|| format!("benchmark run {id} not found"))?;
            let Some(json) = run.generated_report.as_deref() else {
                bail!("benchmark run {id} has no generated notebook yet");
            };
            Notebook::from_json(json)
                .with_context(|| format!("stored notebook of run {id} is not valid"))?;
            write_notebook_output(json, output.as_deref(), &run)
        }

        Commands::Raw { id, output } => {
            let run = store
                .fetch_run(id)
                .await?
                .with_context(|| format!("benchmark run {id} not found"))?;
            match output {
                Some(output) => {
                    let file_name = notebook_io::raw_data_file_name(&run);
                    let path = notebook_io::resolve_output_path(&output, &file_name);
                    notebook_io::write_raw_data(&path, &run.raw_data)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(run_id = run.id, path = %path.display(), "Raw data written");
                    Ok(())
                }
                None => emit(&run.raw_data),
            }
        }

        Commands::List => {
            let runs = store.list_runs().await?;
            let mut listing = String::new();
            for run in &runs {
                listing.push_str(&format_summary(run));
                listing.push('\n');
            }
            emit(&listing)
        }

        Commands::Status => {
            let pending = store.count_pending().await?;
            println!("Pending benchmark runs: {pending}");
            Ok(())
        }
    }
}

fn write_notebook_output(
    json: &str,
    output: Option<&Path>,
    run: &BenchmarkRun,
) -> anyhow::Result<()> {
    let Some(output) = output else {
        return emit(json);
    };
    let path = notebook_io::resolve_output_path(output, &notebook_io::default_file_name(run));
    notebook_io::write_notebook(&path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(run_id = run.id, path = %path.display(), "Notebook written");
    Ok(())
}

fn emit(text: &str) -> anyhow::Result<()> {
    std::io::stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("failed to write to stdout")
}

fn format_summary(run: &RunSummary) -> String {
    let state = if run.has_report { "generated" } else { "pending" };
    format!(
        "{}\t{}\t{}\t{}",
        run.id,
        run.timestamp.format("%Y-%m-%d %H:%M:%S%:z"),
        state,
        run.name
    )
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_analysis_core::LogFormat;
    use bench_analysis_storage::MemoryRunStore;
    use clap::CommandFactory;

    fn config() -> RunnerConfig {
        RunnerConfig {
            database_url: "postgres://localhost/bench".to_string(),
            poll_interval_secs: 10,
            max_connections: 1,
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
        }
    }

    async fn seeded_store() -> (Arc<MemoryRunStore>, RunId) {
        let store = Arc::new(MemoryRunStore::new());
        let id = store
            .insert_run(
                NewBenchmarkRun::new("latency-test", "p99 check", "csv,1,2,3").with_series(
                    "threads=4",
                    "ms",
                    "latency",
                    vec![10.0, 20.0, 30.0],
                ),
            )
            .await
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::parse_from(["analysis-runner", "run", "--interval", "3", "--once"]);
        match cli.command {
            Commands::Run {
                interval,
                once,
                fail_fast,
            } => {
                assert_eq!(interval, Some(3));
                assert!(once);
                assert!(!fail_fast);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["analysis-runner", "run", "--interval", "0"]).is_err());
    }

    #[tokio::test]
    async fn test_run_once_generates_pending_reports() {
        let (store, id) = seeded_store().await;
        let command = Commands::Run {
            interval: None,
            once: true,
            fail_fast: false,
        };

        execute(command, &config(), store.clone()).await.unwrap();

        let run = store.fetch_run(id).await.unwrap().unwrap();
        assert!(run.generated_report.is_some());
        assert_eq!(store.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_inserts_pending_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("result.json");
        std::fs::write(
            &file,
            r#"{"name": "cpu", "description": "fib", "raw_data": "1,2",
                "data": [{"parameter": "n=30", "measurements": [1.5, 2.5],
                          "data_unit": "s", "measurement_name": "time"}]}"#,
        )
        .unwrap();

        let store = Arc::new(MemoryRunStore::new());
        execute(Commands::Import { file }, &config(), store.clone())
            .await
            .unwrap();

        let pending = store.fetch_pending_runs().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "cpu");
        assert_eq!(pending[0].series[0].measurements, vec![1.5, 2.5]);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{\"name\": 1}").unwrap();

        let store = Arc::new(MemoryRunStore::new());
        let result = execute(Commands::Import { file }, &config(), store.clone()).await;
        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_render_writes_file_without_storing() {
        let (store, id) = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();

        let command = Commands::Render {
            id,
            output: Some(dir.path().to_path_buf()),
        };
        execute(command, &config(), store.clone()).await.unwrap();

        let path = dir.path().join(format!("benchmark-{id}-latency-test.ipynb"));
        let notebook = notebook_io::read_notebook(&path).unwrap();
        assert_eq!(notebook.cells.len(), 6);
        assert_eq!(store.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_export_requires_generated_report() {
        let (store, id) = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ipynb");

        let pending_export = Commands::Export {
            id,
            output: Some(path.clone()),
        };
        assert!(execute(pending_export, &config(), store.clone()).await.is_err());

        let once = Commands::Run {
            interval: None,
            once: true,
            fail_fast: false,
        };
        execute(once, &config(), store.clone()).await.unwrap();

        let export = Commands::Export {
            id,
            output: Some(path.clone()),
        };
        execute(export, &config(), store.clone()).await.unwrap();

        let stored = store.fetch_run(id).await.unwrap().unwrap().generated_report;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), stored.unwrap());
    }

    #[tokio::test]
    async fn test_export_accepts_notebook_with_empty_metadata() {
        let (store, id) = seeded_store().await;
        let stored = r###"{"cells":[{"cell_type":"markdown","id":"3f1a","metadata":{},"source":["## Benchmark analysis"]}],"metadata":{},"nbformat":4,"nbformat_minor":5}"###;
        store.mark_generated(id, stored).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let command = Commands::Export {
            id,
            output: Some(dir.path().to_path_buf()),
        };
        execute(command, &config(), store.clone()).await.unwrap();

        let path = dir.path().join(format!("benchmark-{id}-latency-test.ipynb"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), stored);
    }

    #[tokio::test]
    async fn test_raw_writes_raw_data_into_directory() {
        let (store, id) = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();

        let command = Commands::Raw {
            id,
            output: Some(dir.path().to_path_buf()),
        };
        execute(command, &config(), store.clone()).await.unwrap();

        let path = dir.path().join(format!("benchmark-{id}-latency-test.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "csv,1,2,3");
        assert_eq!(store.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_raw_missing_run_is_error() {
        let store = Arc::new(MemoryRunStore::new());
        let command = Commands::Raw { id: 7, output: None };
        let err = execute(command, &config(), store).await.unwrap_err();
        assert!(err.to_string().contains("7"));
    }

    #[tokio::test]
    async fn test_list_succeeds_on_populated_store() {
        let (store, _) = seeded_store().await;
        execute(Commands::List, &config(), store).await.unwrap();
    }

    #[test]
    fn test_parse_list_and_raw() {
        let cli = Cli::parse_from(["analysis-runner", "list"]);
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::parse_from(["analysis-runner", "raw", "3", "--output", "out.txt"]);
        match cli.command {
            Commands::Raw { id, output } => {
                assert_eq!(id, 3);
                assert_eq!(output, Some(PathBuf::from("out.txt")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_summary_line() {
        use chrono::{TimeZone, Utc};

        let summary = RunSummary {
            id: 12,
            name: "latency-test".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            has_report: false,
        };
        assert_eq!(
            format_summary(&summary),
            "12\t2024-03-01 12:30:00+00:00\tpending\tlatency-test"
        );

        let generated = RunSummary { has_report: true, ..summary };
        assert!(format_summary(&generated).contains("\tgenerated\t"));
    }

    #[tokio::test]
    async fn test_missing_run_is_error() {
        let store = Arc::new(MemoryRunStore::new());
        let command = Commands::Render { id: 404, output: None };
        let err = execute(command, &config(), store).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
