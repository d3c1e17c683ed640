// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Analysis runner entry point.

#[tokio::main]
async fn main() {
    if let Err(e) = bench_analysis_runner::cli::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
