//! Single-match execution.
//!
//! Runs one complete seeded duel from intro to done, exactly the lifecycle
//! a rendering front-end would drive, and folds the result into a
//! serializable report for stdout or batch aggregation.

use duel_core::config::MatchConfig;
use duel_core::entity::TeamId;
use duel_core::error::Result;
use duel_core::phase::Termination;
use duel_core::sim::{DuelSim, MatchSetup, WinnerInfo};
use duel_core::weapons::WeaponRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Record of one finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Seed the match ran with.
    pub seed: u64,
    /// Weapon fielded by the left side (team 0).
    pub left_weapon: String,
    /// Weapon fielded by the right side (team 1).
    pub right_weapon: String,
    /// Combatants per side.
    pub per_side: usize,
    /// Winning side, absent on a no-winner termination.
    pub winner: Option<WinnerInfo>,
    /// Why the match ended.
    pub termination: Termination,
    /// Combat ticks executed.
    pub duration_ticks: u64,
    /// Combat-clock seconds elapsed when the match was decided.
    pub elapsed_seconds: f32,
    /// Hash of the final simulation state, for determinism audits.
    pub state_hash: u64,
    /// Combatants still standing at the end.
    pub survivors: Vec<SurvivorRecord>,
}

/// One combatant alive in the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivorRecord {
    /// Display name.
    pub name: String,
    /// Side fought for.
    pub team: TeamId,
    /// Equipped weapon.
    pub weapon: String,
    /// Health remaining.
    pub health: f32,
}

/// Run one match start to finish.
///
/// Drives the full lifecycle including the intro hold and the end
/// sequence, so the report reflects exactly what a viewer would see.
pub fn run_match(
    setup: &MatchSetup,
    config: &MatchConfig,
    registry: &WeaponRegistry,
) -> Result<MatchReport> {
    debug!(
        seed = setup.seed,
        left = %setup.left_weapon,
        right = %setup.right_weapon,
        per_side = setup.per_side,
        "starting match"
    );

    let mut sim = DuelSim::new(setup, registry, config.clone())?;
    let outcome = sim.run_to_completion();

    let survivors: Vec<SurvivorRecord> = sim
        .roster()
        .iter()
        .filter(|ball| ball.is_alive())
        .map(|ball| SurvivorRecord {
            name: ball.name.clone(),
            team: ball.team,
            weapon: ball.weapon.spec().name.clone(),
            health: ball.health,
        })
        .collect();

    debug!(
        seed = outcome.seed,
        winner = ?outcome.winner,
        termination = ?outcome.termination,
        ticks = outcome.ticks,
        elapsed = outcome.elapsed_seconds,
        state_hash = outcome.state_hash,
        "match finished"
    );

    Ok(MatchReport {
        seed: outcome.seed,
        left_weapon: setup.left_weapon.clone(),
        right_weapon: setup.right_weapon.clone(),
        per_side: setup.per_side,
        winner: outcome.winner,
        termination: outcome.termination,
        duration_ticks: outcome.ticks,
        elapsed_seconds: outcome.elapsed_seconds,
        state_hash: outcome.state_hash,
        survivors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::error::DuelError;
    use duel_test_utils::fixtures;

    fn builtin() -> WeaponRegistry {
        WeaponRegistry::builtin()
    }

    #[test]
    fn test_run_match_produces_a_decided_report() {
        let setup = MatchSetup::duel(42, "saber", "shuriken");
        let report = run_match(&setup, &MatchConfig::default(), &builtin()).unwrap();

        assert_eq!(report.seed, 42);
        assert_eq!(report.left_weapon, "saber");
        assert_eq!(report.right_weapon, "shuriken");
        assert!(matches!(report.termination, Termination::Winner(_)));
        let winner = report.winner.as_ref().unwrap();
        assert!(report
            .survivors
            .iter()
            .all(|survivor| survivor.team == winner.team));
        assert!(!report.survivors.is_empty());
        assert!(report.duration_ticks > 0);
    }

    #[test]
    fn test_run_match_is_reproducible() {
        let setup = MatchSetup::duel(7, "dagger", "rocket");
        let registry = builtin();
        let first = run_match(&setup, &MatchConfig::default(), &registry).unwrap();
        let second = run_match(&setup, &MatchConfig::default(), &registry).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timed_out_match_reports_both_sides_standing() {
        let setup = MatchSetup {
            timeout_override: Some(0.5),
            ..MatchSetup::duel(3, "saber", "saber")
        };
        let report = run_match(&setup, &MatchConfig::default(), &builtin()).unwrap();

        assert_eq!(report.termination, Termination::NoWinnerTimeout);
        assert!(report.winner.is_none());
        // Half a second is not enough to close the spawn gap and kill.
        assert_eq!(report.survivors.len(), 2);
    }

    #[test]
    fn test_team_mode_records_every_combatant() {
        let setup = MatchSetup {
            per_side: 3,
            ..MatchSetup::duel(11, "saber", "dagger")
        };
        let report = run_match(&setup, &MatchConfig::default(), &builtin()).unwrap();
        assert_eq!(report.per_side, 3);
        assert!(report.survivors.len() <= 6);
    }

    #[test]
    fn test_unknown_weapon_fails_before_any_simulation() {
        let setup = MatchSetup::duel(1, "trident", "saber");
        let err = run_match(&setup, &MatchConfig::default(), &builtin()).unwrap_err();
        assert!(matches!(err, DuelError::UnknownWeapon { name } if name == "trident"));
    }

    #[test]
    fn test_every_builtin_pairing_completes() {
        let registry = builtin();
        for (left, right) in fixtures::all_matchups() {
            let setup = MatchSetup {
                timeout_override: Some(30.0),
                ..MatchSetup::duel(9, left, right)
            };
            let report = run_match(&setup, &MatchConfig::default(), &registry)
                .unwrap_or_else(|e| panic!("{left} vs {right}: {e}"));
            assert!(report.duration_ticks > 0);
        }
    }
}
