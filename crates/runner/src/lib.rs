// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Analysis runner for benchmark results.
//!
//! This crate drives the result-to-notebook pipeline: it polls the store for
//! benchmark runs without a generated notebook, assembles one for each and
//! writes it back.
//!
//! # Modules
//!
//! - [`poller`] - The Idle/Processing poll loop
//! - [`clock`] - Timer abstraction used between cycles
//! - [`telemetry`] - Tracing subscriber setup
//! - [`cli`] - The `analysis-runner` command line

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod poller;
pub mod telemetry;

pub use clock::{Clock, TokioClock};
pub use poller::{CycleReport, FailurePolicy, PollState, Poller};
