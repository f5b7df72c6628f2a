//! Pre-built match scenarios for consistent testing.
//!
//! Every builder panics on invalid input: fixtures describe known-good
//! setups, so a failure here is a bug in the fixture, not a case a test
//! should handle.

use duel_core::config::MatchConfig;
use duel_core::entity::{BallSpawn, TeamId};
use duel_core::math::Vec2;
use duel_core::policy::PolicyKind;
use duel_core::sim::{DuelSim, MatchSetup};
use duel_core::weapons::WeaponRegistry;

/// Names of the built-in weapon roster, in registry order.
pub const BUILTIN_WEAPONS: [&str; 4] = ["dagger", "rocket", "saber", "shuriken"];

/// A standard duel with the intro already skipped, ready to step.
#[must_use]
pub fn duel(seed: u64, left: &str, right: &str) -> DuelSim {
    let setup = MatchSetup::duel(seed, left, right);
    let mut sim = DuelSim::new(&setup, &WeaponRegistry::builtin(), MatchConfig::default())
        .expect("builtin weapons with the default config");
    sim.skip_intro();
    sim
}

/// A duel with a shortened combat timeout, for tests that must finish fast.
#[must_use]
pub fn short_duel(seed: u64, left: &str, right: &str, timeout: f32) -> DuelSim {
    let mut setup = MatchSetup::duel(seed, left, right);
    setup.timeout_override = Some(timeout);
    let mut sim = DuelSim::new(&setup, &WeaponRegistry::builtin(), MatchConfig::default())
        .expect("builtin weapons with the default config");
    sim.skip_intro();
    sim
}

/// A team match with `per_side` combatants on each side.
#[must_use]
pub fn team_match(seed: u64, per_side: usize, left: &str, right: &str) -> DuelSim {
    let mut setup = MatchSetup::duel(seed, left, right);
    setup.per_side = per_side;
    let mut sim = DuelSim::new(&setup, &WeaponRegistry::builtin(), MatchConfig::default())
        .expect("builtin weapons with the default config");
    sim.skip_intro();
    sim
}

/// Two sabers spawned inside each other's strike range. The first fire
/// intents already connect, so damage flows from the very first tick.
#[must_use]
pub fn close_quarters(seed: u64) -> DuelSim {
    let spawns = [
        BallSpawn {
            name: "left".to_string(),
            team: TeamId(0),
            weapon: "saber".to_string(),
            position: Vec2::new(500.0, 960.0),
            facing: None,
            policy: PolicyKind::Aggressive,
        },
        BallSpawn {
            name: "right".to_string(),
            team: TeamId(1),
            weapon: "saber".to_string(),
            position: Vec2::new(580.0, 960.0),
            facing: None,
            policy: PolicyKind::Aggressive,
        },
    ];
    let mut sim = DuelSim::from_spawns(
        seed,
        &spawns,
        &WeaponRegistry::builtin(),
        MatchConfig::default(),
    )
    .expect("in-range saber spawns are valid");
    sim.skip_intro();
    sim
}

/// Every ordered pairing of the built-in weapons, 16 in total.
#[must_use]
pub fn all_matchups() -> Vec<(&'static str, &'static str)> {
    let mut pairs = Vec::with_capacity(BUILTIN_WEAPONS.len() * BUILTIN_WEAPONS.len());
    for left in BUILTIN_WEAPONS {
        for right in BUILTIN_WEAPONS {
            pairs.push((left, right));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::phase::MatchPhase;

    #[test]
    fn test_duel_fixture_is_ready_to_fight() {
        let sim = duel(1, "saber", "shuriken");
        assert_eq!(sim.phase(), MatchPhase::Combat);
        assert_eq!(sim.roster().len(), 2);
    }

    #[test]
    fn test_close_quarters_draws_first_blood_immediately() {
        let mut sim = close_quarters(1);
        sim.step();
        assert!(sim.last_hit().is_some());
    }

    #[test]
    fn test_all_matchups_covers_the_roster_square() {
        let pairs = all_matchups();
        assert_eq!(pairs.len(), 16);
        assert!(pairs.contains(&("saber", "saber")));
        assert!(pairs.contains(&("rocket", "dagger")));
    }

    #[test]
    fn test_team_match_fields_both_sides() {
        let sim = team_match(1, 3, "saber", "rocket");
        assert_eq!(sim.roster().len(), 6);
    }
}
