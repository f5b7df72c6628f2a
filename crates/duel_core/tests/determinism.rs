//! End-to-end reproducibility tests.
//!
//! These drive whole matches through the shared determinism harness:
//! same seed in, bit-identical fight out, across repeat runs, threads
//! and serialization round-trips.

use duel_core::config::MatchConfig;
use duel_core::entity::{BallSpawn, TeamId};
use duel_core::math::Vec2;
use duel_core::phase::Termination;
use duel_core::policy::PolicyKind;
use duel_core::sim::DuelSim;
use duel_core::weapons::WeaponRegistry;
use duel_test_utils::determinism::{
    find_first_divergence, run_parallel_matches, strategies, verify_match_determinism,
    verify_serialization_determinism,
};
use duel_test_utils::fixtures;
use duel_test_utils::proptest::prelude::*;

#[test]
fn full_match_outcome_is_reproducible() {
    let first = fixtures::duel(42, "saber", "shuriken").run_to_completion();
    let second = fixtures::duel(42, "saber", "shuriken").run_to_completion();
    assert_eq!(first, second);
    assert!(matches!(first.termination, Termination::Winner(_)));
}

#[test]
fn every_builtin_matchup_is_reproducible() {
    for (left, right) in fixtures::all_matchups() {
        assert!(
            verify_match_determinism(|| fixtures::duel(9, left, right), 360),
            "{left} vs {right} diverged"
        );
    }
}

#[test]
fn parallel_replays_of_one_seed_agree() {
    run_parallel_matches(|| fixtures::duel(42, "saber", "shuriken"), 8, 900)
        .assert_deterministic();
}

#[test]
fn no_divergence_tick_by_tick() {
    assert_eq!(
        find_first_divergence(|| fixtures::duel(5, "rocket", "dagger"), 1200),
        None
    );
}

#[test]
fn restored_match_finishes_like_the_original() {
    let mut original = fixtures::duel(42, "saber", "shuriken");
    for _ in 0..200 {
        original.step();
    }
    let bytes = original.to_bytes().expect("serialize mid-fight");
    let mut restored = DuelSim::from_bytes(&bytes).expect("restore mid-fight");

    let first = original.run_to_completion();
    let second = restored.run_to_completion();
    assert_eq!(first, second);
}

proptest! {
    /// Arbitrary legal spawn geometry still replays exactly; custom
    /// rosters go through the same seeded streams as standard duels.
    #[test]
    fn prop_custom_rosters_replay_identically(
        seed in strategies::arb_seed(),
        (ax, ay) in strategies::arb_interior_position(),
        (bx, by) in strategies::arb_interior_position(),
    ) {
        let apart = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
        prop_assume!(apart >= 60.0);

        let setup = || {
            let spawns = [
                BallSpawn {
                    name: "left".to_string(),
                    team: TeamId(0),
                    weapon: "saber".to_string(),
                    position: Vec2::new(ax, ay),
                    facing: None,
                    policy: PolicyKind::Aggressive,
                },
                BallSpawn {
                    name: "right".to_string(),
                    team: TeamId(1),
                    weapon: "shuriken".to_string(),
                    position: Vec2::new(bx, by),
                    facing: None,
                    policy: PolicyKind::Evader,
                },
            ];
            let mut sim = DuelSim::from_spawns(
                seed,
                &spawns,
                &WeaponRegistry::builtin(),
                MatchConfig::default(),
            )
            .expect("interior spawns with clearance");
            sim.skip_intro();
            sim
        };
        prop_assert!(verify_match_determinism(setup, 180));
    }

    /// Restoring at an arbitrary point never changes the rest of the fight.
    #[test]
    fn prop_restore_point_is_irrelevant(
        seed in strategies::arb_seed(),
        ticks in 0u64..400,
    ) {
        prop_assert!(verify_serialization_determinism(
            || fixtures::duel(seed, "dagger", "rocket"),
            ticks,
        ));
    }
}
