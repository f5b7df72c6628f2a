//! Batch match runner for balance sweeps.
//!
//! Runs many seeded matches in parallel using rayon and aggregates win
//! rates, timeout rates and duration statistics. Each match owns its own
//! simulation and RNG streams, so parallel execution cannot perturb
//! results.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use duel_core::config::MatchConfig;
use duel_core::entity::TeamId;
use duel_core::error::DuelError;
use duel_core::sim::MatchSetup;
use duel_core::weapons::WeaponRegistry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_match, MatchReport};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Weapon fielded by the left side (team 0).
    pub left_weapon: String,
    /// Weapon fielded by the right side (team 1).
    pub right_weapon: String,
    /// Combatants per side.
    pub per_side: usize,
    /// Number of matches to run.
    pub match_count: u32,
    /// Maximum parallel matches (0 = rayon default).
    pub parallel_matches: u32,
    /// Seed of the first match; match `i` runs with `seed_start + i`.
    pub seed_start: u64,
    /// Output directory for result files.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            left_weapon: "saber".to_string(),
            right_weapon: "shuriken".to_string(),
            per_side: 1,
            match_count: 100,
            parallel_matches: 0,
            seed_start: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create a config for a specific weapon pairing.
    #[must_use]
    pub fn new(left_weapon: &str, right_weapon: &str, match_count: u32) -> Self {
        Self {
            left_weapon: left_weapon.to_string(),
            right_weapon: right_weapon.to_string(),
            match_count,
            ..Default::default()
        }
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set the starting seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the number of combatants per side.
    #[must_use]
    pub fn with_per_side(mut self, per_side: usize) -> Self {
        self.per_side = per_side;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Match settings every match ran with.
    pub match_config: MatchConfig,
    /// Individual match reports.
    pub matches: Vec<MatchReport>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total wall-clock runtime in seconds.
    pub duration_seconds: f64,
    /// Matches that failed to run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a pretty-printed JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// One match that failed to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Index of the match within the batch.
    pub match_index: u32,
    /// Seed the match would have run with.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Progress tracking shared across batch worker threads.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total matches in the batch.
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create a new progress tracker.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed match, returning the new completion count.
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current completion count.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Estimated time remaining.
    #[must_use]
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }
        let per_match = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_match * f64::from(remaining))
    }
}

/// Summary statistics across the matches of one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches that completed.
    pub total_matches: u32,
    /// Wins for the left side (team 0).
    pub wins_left: u32,
    /// Wins for the right side (team 1).
    pub wins_right: u32,
    /// Matches that ended without a winner, by timeout or mutual kill.
    pub timeouts: u32,
    /// Left-side win rate.
    pub win_rate_left: f64,
    /// Right-side win rate.
    pub win_rate_right: f64,
    /// No-winner rate.
    pub timeout_rate: f64,
    /// Average match duration in combat ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average match duration in simulated seconds.
    pub avg_elapsed_seconds: f64,
}

impl BatchSummary {
    /// Calculate the summary from a list of match reports.
    #[must_use]
    pub fn from_reports(reports: &[MatchReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_matches: reports.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Self::default()
        };

        let mut tick_sum = 0u64;
        let mut elapsed_sum = 0f64;
        for report in reports {
            tick_sum += report.duration_ticks;
            elapsed_sum += f64::from(report.elapsed_seconds);
            summary.min_duration_ticks = summary.min_duration_ticks.min(report.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(report.duration_ticks);
            match report.winner.as_ref().map(|winner| winner.team) {
                Some(TeamId(0)) => summary.wins_left += 1,
                Some(_) => summary.wins_right += 1,
                None => summary.timeouts += 1,
            }
        }

        let total = f64::from(summary.total_matches);
        summary.win_rate_left = f64::from(summary.wins_left) / total;
        summary.win_rate_right = f64::from(summary.wins_right) / total;
        summary.timeout_rate = f64::from(summary.timeouts) / total;
        summary.avg_duration_ticks = tick_sum as f64 / total;
        summary.avg_elapsed_seconds = elapsed_sum / total;
        summary
    }

    /// Whether both win rates sit within `threshold` of an even split.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        (self.win_rate_left - 0.5).abs() <= threshold
            && (self.win_rate_right - 0.5).abs() <= threshold
    }

    /// The side winning more than `0.5 + threshold` of matches, if any.
    #[must_use]
    pub fn dominant_side(&self, threshold: f64) -> Option<&'static str> {
        if self.win_rate_left > 0.5 + threshold {
            Some("left")
        } else if self.win_rate_right > 0.5 + threshold {
            Some("right")
        } else {
            None
        }
    }
}

/// Run a batch of matches over consecutive seeds.
pub fn run_batch(
    config: BatchConfig,
    match_config: &MatchConfig,
    registry: &WeaponRegistry,
) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.match_count);

    info!(
        left = %config.left_weapon,
        right = %config.right_weapon,
        count = config.match_count,
        seed_start = config.seed_start,
        per_side = config.per_side,
        "starting batch run"
    );

    if config.parallel_matches > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_matches as usize)
            .build_global()
            .ok(); // Ignore if a pool is already installed
    }

    let results: Vec<Result<MatchReport, BatchError>> = (0..config.match_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let setup = MatchSetup {
                seed,
                left_weapon: config.left_weapon.clone(),
                right_weapon: config.right_weapon.clone(),
                per_side: config.per_side,
                timeout_override: None,
            };

            match run_match(&setup, match_config, registry) {
                Ok(report) => {
                    let completed = progress.record_completion();
                    if completed % 100 == 0 {
                        debug!(completed, total = config.match_count, "batch progress");
                    }
                    if completed % 1000 == 0 {
                        info!(
                            completed,
                            total = config.match_count,
                            percent = format!("{:.1}", progress.percentage()),
                            eta_secs = progress.eta().as_secs(),
                            "batch progress"
                        );
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!(match_index = i, seed, error = %e, "match failed");
                    Err(BatchError {
                        match_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (matches, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let matches: Vec<MatchReport> = matches.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_reports(&matches);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        completed = matches.len(),
        failed = errors.len(),
        duration_secs = format!("{duration_seconds:.1}"),
        "batch finished"
    );

    BatchResults {
        config,
        match_config: match_config.clone(),
        matches,
        summary,
        duration_seconds,
        errors,
    }
}

/// Result of re-running one seed several times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Total runs executed.
    pub runs: u32,
    /// The report every run must reproduce.
    pub baseline: MatchReport,
    /// Runs that disagreed with the baseline.
    pub divergences: Vec<Divergence>,
}

/// One verification run that disagreed with the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Divergence {
    /// Index of the diverging run.
    pub run: u32,
    /// What it produced instead.
    pub report: MatchReport,
}

impl VerifyReport {
    /// Whether every run reproduced the baseline exactly.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.divergences.is_empty()
    }
}

/// Run the same match `runs` times and compare outcomes and state hashes.
///
/// At least one run always executes; it becomes the baseline the rest are
/// compared against.
pub fn verify_determinism(
    setup: &MatchSetup,
    match_config: &MatchConfig,
    registry: &WeaponRegistry,
    runs: u32,
) -> Result<VerifyReport, DuelError> {
    let baseline = run_match(setup, match_config, registry)?;
    let mut divergences = Vec::new();

    for run in 1..runs {
        let report = run_match(setup, match_config, registry)?;
        if report != baseline {
            warn!(
                run,
                baseline_hash = baseline.state_hash,
                diverged_hash = report.state_hash,
                "verification run diverged from baseline"
            );
            divergences.push(Divergence { run, report });
        }
    }

    Ok(VerifyReport {
        runs: runs.max(1),
        baseline,
        divergences,
    })
}
