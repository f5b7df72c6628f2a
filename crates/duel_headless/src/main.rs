//! Headless duel runner.
//!
//! Runs seeded matches without rendering, for balance sweeps and CI
//! determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # One match, outcome JSON on stdout
//! cargo run -p duel_headless -- run --seed 42
//!
//! # Balance sweep over 1000 seeds
//! cargo run -p duel_headless -- batch --left saber --right dagger --count 1000 --output results/
//!
//! # CI determinism gate
//! cargo run -p duel_headless -- verify --seed 42 --runs 5
//! ```
//!
//! Output (stdout): machine-readable JSON
//! Logs (stderr): human-readable diagnostics

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duel_core::sim::MatchSetup;
use duel_core::weapons::WeaponRegistry;
use duel_headless::batch::{run_batch, verify_determinism, BatchConfig};
use duel_headless::runner::run_match;
use duel_headless::settings::load_settings;

#[derive(Parser)]
#[command(name = "duel_headless")]
#[command(about = "Headless duel runner for balance sweeps and CI verification")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match and print the outcome as JSON
    Run {
        /// Match seed
        #[arg(short, long)]
        seed: u64,

        /// Weapon for the left side
        #[arg(long, default_value = "saber")]
        left: String,

        /// Weapon for the right side
        #[arg(long, default_value = "shuriken")]
        right: String,

        /// Combatants per side
        #[arg(long, default_value = "1")]
        per_side: usize,

        /// Combat timeout override in seconds
        #[arg(long)]
        timeout: Option<f32>,

        /// Match settings file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a batch of seeded matches for balance statistics
    Batch {
        /// Weapon for the left side
        #[arg(long, default_value = "saber")]
        left: String,

        /// Weapon for the right side
        #[arg(long, default_value = "shuriken")]
        right: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting seed; match i runs with seed + i
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Combatants per side
        #[arg(long, default_value = "1")]
        per_side: usize,

        /// Maximum parallel matches (0 = all cores)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Match settings file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Re-run one seed several times and fail on any divergence
    Verify {
        /// Seed to verify
        #[arg(short, long, default_value = "12345")]
        seed: u64,

        /// Weapon for the left side
        #[arg(long, default_value = "saber")]
        left: String,

        /// Weapon for the right side
        #[arg(long, default_value = "shuriken")]
        right: String,

        /// Combatants per side
        #[arg(long, default_value = "1")]
        per_side: usize,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Match settings file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout is reserved for JSON output.
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            seed,
            left,
            right,
            per_side,
            timeout,
            config,
        } => {
            cmd_run(seed, left, right, per_side, timeout, config);
        }
        Commands::Batch {
            left,
            right,
            count,
            seed,
            per_side,
            parallel,
            output,
            config,
        } => {
            cmd_batch(left, right, count, seed, per_side, parallel, output, config);
        }
        Commands::Verify {
            seed,
            left,
            right,
            per_side,
            runs,
            config,
        } => {
            cmd_verify(seed, left, right, per_side, runs, config);
        }
    }
}

/// Run a single match and print the report as JSON on stdout.
fn cmd_run(
    seed: u64,
    left: String,
    right: String,
    per_side: usize,
    timeout: Option<f32>,
    config: Option<PathBuf>,
) {
    let match_config = match load_settings(config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let setup = MatchSetup {
        seed,
        left_weapon: left,
        right_weapon: right,
        per_side,
        timeout_override: timeout,
    };

    let report = match run_match(&setup, &match_config, &WeaponRegistry::builtin()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Match failed: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch of matches and save aggregated results.
fn cmd_batch(
    left: String,
    right: String,
    count: u32,
    seed: u64,
    per_side: usize,
    parallel: u32,
    output: PathBuf,
    config: Option<PathBuf>,
) {
    let match_config = match load_settings(config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&output) {
        eprintln!(
            "Cannot create output directory '{}': {e}",
            output.display()
        );
        std::process::exit(1);
    }

    let batch_config = BatchConfig {
        left_weapon: left,
        right_weapon: right,
        per_side,
        match_count: count,
        parallel_matches: parallel,
        seed_start: seed,
        output_dir: output.clone(),
    };

    let results = run_batch(batch_config, &match_config, &WeaponRegistry::builtin());

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        eprintln!("Failed to save results: {e}");
        std::process::exit(1);
    }

    // Human-readable summary on stderr; the JSON file holds the details.
    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.matches.len());
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} matches/sec",
        results.matches.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("\nWin Rates:");
    eprintln!(
        "  {} (left):  {:.1}%",
        results.config.left_weapon,
        summary.win_rate_left * 100.0
    );
    eprintln!(
        "  {} (right): {:.1}%",
        results.config.right_weapon,
        summary.win_rate_right * 100.0
    );
    eprintln!("  no winner:  {:.1}%", summary.timeout_rate * 100.0);
    eprintln!(
        "\nMatch length: avg {:.0} ticks ({:.1}s), min {}, max {}",
        summary.avg_duration_ticks,
        summary.avg_elapsed_seconds,
        summary.min_duration_ticks,
        summary.max_duration_ticks
    );

    if let Some(side) = summary.dominant_side(0.1) {
        eprintln!("\nBalance warning: the {side} side dominates this pairing");
    }

    if !results.errors.is_empty() {
        eprintln!("\nFAILED MATCHES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Match {} (seed {}): {}",
                error.match_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());

    if results.matches.is_empty() && !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Verify determinism by re-running one seed several times.
fn cmd_verify(
    seed: u64,
    left: String,
    right: String,
    per_side: usize,
    runs: u32,
    config: Option<PathBuf>,
) {
    let match_config = match load_settings(config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let setup = MatchSetup {
        seed,
        left_weapon: left,
        right_weapon: right,
        per_side,
        timeout_override: None,
    };

    tracing::info!(seed, runs, "verifying determinism");

    let report = match verify_determinism(&setup, &match_config, &WeaponRegistry::builtin(), runs)
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Verification failed to run: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!(
            "PASS: all {} runs produced identical outcomes",
            report.runs
        );
        eprintln!("  State hash: {:016x}", report.baseline.state_hash);
    } else {
        eprintln!("FAIL: non-determinism detected!");
        eprintln!("  Baseline hash: {:016x}", report.baseline.state_hash);
        for divergence in &report.divergences {
            eprintln!(
                "  Run {} hash:   {:016x}",
                divergence.run, divergence.report.state_hash
            );
        }
        std::process::exit(1);
    }
}
