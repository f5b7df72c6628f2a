//! Balance measurement over seeded match batches.
//!
//! Runs real matches across seed ranges to measure how weapon pairings
//! actually play out, plus closed-form time-to-kill figures for quick
//! sanity checks when tuning a spec.

use std::ops::Range;

use duel_core::config::MatchConfig;
use duel_core::entity::TeamId;
use duel_core::sim::{DuelSim, MatchSetup};
use duel_core::weapons::{WeaponRegistry, WeaponSpec};

/// Aggregate record of one weapon pairing across many seeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupStats {
    /// Matches run.
    pub total_matches: u32,
    /// Wins for the left side.
    pub wins_left: u32,
    /// Wins for the right side.
    pub wins_right: u32,
    /// No-winner terminations.
    pub draws: u32,
    /// Mean combat ticks to termination.
    pub avg_ticks: f64,
}

impl MatchupStats {
    /// Left-side win rate in [0, 1]; 0.5 for an empty sample.
    #[must_use]
    pub fn win_rate_left(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.5;
        }
        f64::from(self.wins_left) / f64::from(self.total_matches)
    }

    /// Right-side win rate in [0, 1]; 0.5 for an empty sample.
    #[must_use]
    pub fn win_rate_right(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.5;
        }
        f64::from(self.wins_right) / f64::from(self.total_matches)
    }

    /// Fraction of matches that ended without a winner.
    #[must_use]
    pub fn draw_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        f64::from(self.draws) / f64::from(self.total_matches)
    }

    /// Whether the left-side win rate sits inside an acceptable band.
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_left();
        rate >= min_rate && rate <= max_rate
    }
}

/// Run one weapon pairing across a range of consecutive seeds.
///
/// Uses the default configuration, so results reflect what the shipped
/// tuning actually produces.
#[must_use]
pub fn run_matchup(left: &str, right: &str, seeds: Range<u64>) -> MatchupStats {
    let registry = WeaponRegistry::builtin();
    let mut stats = MatchupStats::default();
    let mut total_ticks = 0u64;

    for seed in seeds {
        let setup = MatchSetup::duel(seed, left, right);
        let mut sim = DuelSim::new(&setup, &registry, MatchConfig::default())
            .expect("builtin weapons with the default config");
        let outcome = sim.run_to_completion();

        total_ticks += outcome.ticks;
        stats.total_matches += 1;
        match outcome.winner.as_ref().map(|w| w.team) {
            Some(TeamId(0)) => stats.wins_left += 1,
            Some(_) => stats.wins_right += 1,
            None => stats.draws += 1,
        }
        tracing::debug!(
            seed,
            ticks = outcome.ticks,
            termination = ?outcome.termination,
            "matchup sample finished"
        );
    }

    if stats.total_matches > 0 {
        stats.avg_ticks = total_ticks as f64 / f64::from(stats.total_matches);
    }
    stats
}

/// Closed-form seconds for a weapon to kill a target of `target_health`,
/// assuming every attack lands, none are critical and the cooldown is the
/// only gate. The first hit is free, so the count of waits is one less
/// than the count of hits.
#[must_use]
pub fn time_to_kill(spec: &WeaponSpec, target_health: f32) -> f32 {
    let hits = (target_health / spec.damage).ceil();
    (hits - 1.0).max(0.0) * spec.cooldown
}

/// Time-to-kill for every built-in weapon against `target_health`,
/// in registry name order.
#[must_use]
pub fn ttk_table(target_health: f32) -> Vec<(String, f32)> {
    let registry = WeaponRegistry::builtin();
    registry
        .names()
        .iter()
        .filter_map(|name| {
            registry
                .get(name)
                .map(|spec| (spec.name.clone(), time_to_kill(spec, target_health)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saber_time_to_kill() {
        let registry = WeaponRegistry::builtin();
        let saber = registry.get("saber").unwrap();
        // 100 health / 18 damage = 6 hits; 5 cooldown waits of 0.6 s.
        assert!((time_to_kill(saber, 100.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_dagger_trades_damage_for_cadence() {
        let registry = WeaponRegistry::builtin();
        let saber = registry.get("saber").unwrap();
        let dagger = registry.get("dagger").unwrap();
        // Dagger swings almost twice as fast but still kills slower.
        assert!(dagger.cooldown < saber.cooldown);
        assert!(time_to_kill(dagger, 100.0) > time_to_kill(saber, 100.0));
    }

    #[test]
    fn test_one_shot_kill_takes_no_time() {
        let registry = WeaponRegistry::builtin();
        let rocket = registry.get("rocket").unwrap();
        assert_eq!(time_to_kill(rocket, 15.0), 0.0);
    }

    #[test]
    fn test_ttk_table_covers_the_roster() {
        let table = ttk_table(100.0);
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|(_, ttk)| *ttk > 0.0));
    }

    #[test]
    fn test_win_rates_sum_with_draws() {
        let stats = MatchupStats {
            total_matches: 100,
            wins_left: 55,
            wins_right: 40,
            draws: 5,
            avg_ticks: 900.0,
        };
        assert!((stats.win_rate_left() - 0.55).abs() < 1e-9);
        assert!((stats.win_rate_right() - 0.40).abs() < 1e-9);
        assert!((stats.draw_rate() - 0.05).abs() < 1e-9);
        assert!(stats.is_balanced(0.45, 0.60));
        assert!(!stats.is_balanced(0.45, 0.50));
    }

    #[test]
    fn test_empty_sample_reports_even_odds() {
        let stats = MatchupStats::default();
        assert!((stats.win_rate_left() - 0.5).abs() < 1e-9);
        assert_eq!(stats.draw_rate(), 0.0);
    }

    #[test]
    fn test_matchup_sweep_accounts_for_every_seed() {
        let stats = run_matchup("saber", "shuriken", 0..8);
        assert_eq!(stats.total_matches, 8);
        assert_eq!(stats.wins_left + stats.wins_right + stats.draws, 8);
        assert!(stats.avg_ticks > 0.0);
    }
}
