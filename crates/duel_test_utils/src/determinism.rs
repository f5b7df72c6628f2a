//! Determinism testing utilities.
//!
//! A harness for verifying that matches produce identical results given
//! identical inputs.
//!
//! # Testing Strategy
//!
//! Every match must be 100% reproducible from its seed. Sources of
//! non-determinism this harness is built to catch:
//!
//! - **Iteration order**: all roster and projectile walks must run in id
//!   order; a stray `HashMap` iteration reorders combat resolution.
//!
//! - **System randomness**: every stochastic decision must draw from the
//!   per-entity seeded streams, never from thread-local entropy.
//!
//! - **Serialization drift**: a restored match must continue bit-identically,
//!   RNG stream positions included.
//!
//! - **Scheduling sensitivity**: results must not depend on what else the
//!   process is doing, so the parallel harness replays one setup across
//!   threads.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual stage determinism (policy, combat, physics)
//! 2. **Property tests**: random seeds and matchups must still replay exactly
//! 3. **Integration tests**: full matches are reproducible end to end
//! 4. **Parallel tests**: N concurrent replays of one setup all agree

use std::thread;

use duel_core::sim::DuelSim;

/// Result of replaying one setup several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismReport {
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Ticks stepped per run.
    pub ticks: u64,
}

impl DeterminismReport {
    /// Whether every run produced the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct hashes observed; length 1 for a deterministic run set.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert all runs matched, with a message naming every hash.
    ///
    /// # Panics
    ///
    /// Panics when any two runs disagree.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "runs diverged after {} ticks: {} unique hashes across {} runs: {:?}",
            self.ticks,
            self.unique_hashes().len(),
            self.hashes.len(),
            self.hashes
        );
    }
}

/// Replay a setup `runs` times for `ticks` steps each and compare hashes.
///
/// Generic over the state type so stage-level tests can drive a bare
/// roster or policy loop through the same harness as a full match.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismReport
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }
    DeterminismReport { hashes, ticks }
}

/// Replay a match setup twice and report whether the hashes agree.
#[must_use]
pub fn verify_match_determinism<F>(setup_fn: F, ticks: u64) -> bool
where
    F: Fn() -> DuelSim,
{
    verify_determinism(2, ticks, setup_fn, DuelSim::step, DuelSim::state_hash)
        .is_deterministic()
}

/// Replay one match setup across `runs` threads simultaneously.
///
/// Catches non-determinism that only shows under scheduling pressure or
/// differing memory layouts. The report type is shared with the serial
/// harness since the question is the same: did every replay agree.
pub fn run_parallel_matches<F>(setup_fn: F, runs: usize, ticks: u64) -> DeterminismReport
where
    F: Fn() -> DuelSim + Sync,
{
    let hashes = thread::scope(|scope| {
        let workers: Vec<_> = (0..runs)
            .map(|_| {
                scope.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..ticks {
                        sim.step();
                    }
                    sim.state_hash()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("simulation thread panicked"))
            .collect()
    });
    DeterminismReport { hashes, ticks }
}

/// Step two instances of one setup in lockstep and report the first tick
/// whose hashes disagree. `None` means the runs never diverged.
#[must_use]
pub fn find_first_divergence<F>(setup_fn: F, ticks: u64) -> Option<u64>
where
    F: Fn() -> DuelSim,
{
    let mut first = setup_fn();
    let mut second = setup_fn();
    if first.state_hash() != second.state_hash() {
        return Some(0);
    }
    for tick in 1..=ticks {
        first.step();
        second.step();
        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }
    None
}

/// Run a match for `ticks`, round-trip it through serialization, then step
/// both the original and the restored copy further and compare.
///
/// Stepping past the restore point is the part that catches lost RNG
/// stream positions; the immediate hash comparison alone would miss them.
#[must_use]
pub fn verify_serialization_determinism<F>(setup_fn: F, ticks: u64) -> bool
where
    F: Fn() -> DuelSim,
{
    let mut sim = setup_fn();
    for _ in 0..ticks {
        sim.step();
    }

    let Ok(bytes) = sim.to_bytes() else {
        return false;
    };
    let Ok(mut restored) = DuelSim::from_bytes(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..30 {
        sim.step();
        restored.step();
    }
    restored.state_hash() == sim.state_hash()
}

/// Proptest strategies for determinism testing.
///
/// These generate random but reproducible match inputs for property-based
/// tests across the crates.
pub mod strategies {
    use duel_core::sim::MatchSetup;
    use proptest::prelude::*;

    use crate::fixtures::BUILTIN_WEAPONS;

    /// Any match seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// One of the built-in weapon names.
    pub fn arb_weapon() -> impl Strategy<Value = &'static str> {
        proptest::sample::select(BUILTIN_WEAPONS.to_vec())
    }

    /// An ordered weapon pairing.
    pub fn arb_matchup() -> impl Strategy<Value = (&'static str, &'static str)> {
        (arb_weapon(), arb_weapon())
    }

    /// Side sizes worth testing; duels plus small teams.
    pub fn arb_per_side() -> impl Strategy<Value = usize> {
        1usize..=3
    }

    /// A spawn position inside the default arena with a ball-radius margin.
    pub fn arb_interior_position() -> impl Strategy<Value = (f32, f32)> {
        (40.0f32..1040.0, 40.0f32..1880.0)
    }

    /// A complete randomized match setup.
    pub fn arb_setup() -> impl Strategy<Value = MatchSetup> {
        (arb_seed(), arb_matchup(), arb_per_side()).prop_map(|(seed, (left, right), per_side)| {
            MatchSetup {
                seed,
                left_weapon: left.to_string(),
                right_weapon: right.to_string(),
                per_side,
                timeout_override: None,
            }
        })
    }
}
