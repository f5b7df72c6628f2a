//! Headless match runner for balance sweeps and CI verification.
//!
//! This crate drives complete seeded duels without any rendering:
//!
//! - **Single runs** ([`runner::run_match`]): one full lifecycle from intro
//!   to done, folded into a serializable report.
//! - **Batch sweeps** ([`batch::run_batch`]): many seeds in parallel via
//!   rayon, aggregated into win-rate and duration statistics.
//! - **Determinism verification** ([`batch::verify_determinism`]): the same
//!   seed re-run several times, any divergence reported for CI gates.
//!
//! All process concerns live here: argument parsing, settings files,
//! logging setup, result files, exit codes. The simulation itself performs
//! no I/O. When run as a binary, stdout carries machine-readable JSON only;
//! logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod runner;
pub mod settings;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use runner::{run_match, MatchReport, SurvivorRecord};
pub use settings::load_settings;
