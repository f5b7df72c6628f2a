//! Combatants and the match roster.
//!
//! Balls are stored in a flat `Vec` and identified by their index, assigned
//! in spawn order. Every system iterates the roster front to back, which
//! makes iteration order identical to id order and keeps the simulation
//! deterministic without any sorting at step time.

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::dash::DashState;
use crate::error::{DuelError, Result};
use crate::math::Vec2;
use crate::policy::PolicyKind;
use crate::weapons::{WeaponInstance, WeaponRegistry};

/// Stable identifier for a combatant, assigned in spawn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ball{}", self.0)
    }
}

/// Side a combatant fights for. A duel has two, team mode may field more
/// combatants per side, and the winner is the last side with anyone alive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TeamId(pub u8);

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team{}", self.0)
    }
}

/// Spawn-time description of one combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSpawn {
    /// Display name, shown on the winner banner.
    pub name: String,
    /// Side this combatant fights for.
    pub team: TeamId,
    /// Registry name of the equipped weapon.
    pub weapon: String,
    /// Spawn position.
    pub position: Vec2,
    /// Initial facing; defaults to pointing at the arena centre.
    #[serde(default)]
    pub facing: Option<Vec2>,
    /// Behaviour policy driving this combatant.
    #[serde(default)]
    pub policy: PolicyKind,
}

/// One combatant's full live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    /// Stable id, equal to the roster index.
    pub id: EntityId,
    /// Side this combatant fights for.
    pub team: TeamId,
    /// Display name.
    pub name: String,
    /// Position in arena coordinates.
    pub position: Vec2,
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Body radius.
    pub radius: f32,
    /// Current health, clamped to [0, max_health].
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Unit facing direction.
    pub facing: Vec2,
    /// Equipped weapon with live cooldown state.
    pub weapon: WeaponInstance,
    /// Dash timers and flags.
    pub dash: DashState,
    /// Fraction of incoming knockback cancelled, in [0, 1).
    pub knockback_resistance: f32,
    /// Behaviour policy driving this combatant.
    pub policy: PolicyKind,
}

impl Ball {
    /// Whether this combatant is still in the fight.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Apply damage, clamping health at zero. Returns the amount actually
    /// removed, which is less than `amount` only on the killing blow.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let applied = amount.min(self.health);
        self.health -= applied;
        applied
    }

    /// Effective top speed, including any weapon equip bonus.
    #[must_use]
    pub fn max_speed(&self, base: f32) -> f32 {
        base + self.weapon.spec().max_speed_bonus
    }
}

/// All combatants in one match, indexed by [`EntityId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    balls: Vec<Ball>,
}

impl Roster {
    /// Build a roster from spawn descriptions, validating geometry and
    /// resolving weapon names against the registry.
    ///
    /// # Errors
    ///
    /// [`DuelError::InvalidSpawnConfiguration`] when fewer than two
    /// combatants or fewer than two teams are given, a spawn lies outside
    /// the arena interior, or two spawns overlap.
    /// [`DuelError::UnknownWeapon`] when a weapon name has no registry
    /// entry.
    pub fn from_spawns(
        spawns: &[BallSpawn],
        registry: &WeaponRegistry,
        config: &MatchConfig,
    ) -> Result<Self> {
        if spawns.len() < 2 {
            return Err(DuelError::InvalidSpawnConfiguration(format!(
                "need at least 2 combatants, got {}",
                spawns.len()
            )));
        }
        if spawns.iter().all(|s| s.team == spawns[0].team) {
            return Err(DuelError::InvalidSpawnConfiguration(
                "all combatants are on the same team".to_string(),
            ));
        }
        let radius = config.ball.radius;
        for (i, spawn) in spawns.iter().enumerate() {
            if !config
                .arena
                .contains_circle(spawn.position.x, spawn.position.y, radius)
            {
                return Err(DuelError::InvalidSpawnConfiguration(format!(
                    "spawn '{}' at ({}, {}) is outside the arena interior",
                    spawn.name, spawn.position.x, spawn.position.y
                )));
            }
            for other in &spawns[..i] {
                if spawn.position.distance(other.position) < 2.0 * radius {
                    return Err(DuelError::InvalidSpawnConfiguration(format!(
                        "spawns '{}' and '{}' overlap",
                        other.name, spawn.name
                    )));
                }
            }
        }

        let centre = Vec2::new(config.arena.width / 2.0, config.arena.height / 2.0);
        let mut balls = Vec::with_capacity(spawns.len());
        for (i, spawn) in spawns.iter().enumerate() {
            let weapon = registry.instantiate(&spawn.weapon)?;
            let facing = spawn
                .facing
                .unwrap_or_else(|| centre - spawn.position)
                .normalize_or_zero();
            let facing = if facing == Vec2::ZERO {
                Vec2::new(1.0, 0.0)
            } else {
                facing
            };
            balls.push(Ball {
                id: EntityId(i as u32),
                team: spawn.team,
                name: spawn.name.clone(),
                position: spawn.position,
                velocity: Vec2::ZERO,
                radius,
                health: config.ball.max_health,
                max_health: config.ball.max_health,
                facing,
                weapon,
                dash: DashState::default(),
                knockback_resistance: config.ball.knockback_resistance,
                policy: spawn.policy,
            });
        }
        Ok(Self { balls })
    }

    /// Number of combatants, alive or dead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.balls.len()
    }

    /// Whether the roster is empty. Never true for a validated roster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Combatant by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Ball> {
        self.balls.get(id.0 as usize)
    }

    /// Mutable combatant by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Ball> {
        self.balls.get_mut(id.0 as usize)
    }

    /// Iterate all combatants in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    /// Iterate all combatants mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ball> {
        self.balls.iter_mut()
    }

    /// Ids of combatants still alive, in id order.
    #[must_use]
    pub fn alive_ids(&self) -> Vec<EntityId> {
        self.balls
            .iter()
            .filter(|b| b.is_alive())
            .map(|b| b.id)
            .collect()
    }

    /// The winning side, once every living combatant shares one team.
    /// `None` while more than one team still stands, and also when nobody
    /// does.
    #[must_use]
    pub fn winning_team(&self) -> Option<TeamId> {
        let mut teams = self.balls.iter().filter(|b| b.is_alive()).map(|b| b.team);
        let first = teams.next()?;
        teams.all(|t| t == first).then_some(first)
    }

    /// Nearest living opponent of `id`, lower id winning distance ties.
    #[must_use]
    pub fn nearest_enemy(&self, id: EntityId) -> Option<EntityId> {
        let me = self.get(id)?;
        let mut best: Option<(f32, EntityId)> = None;
        for other in self.iter() {
            if other.team == me.team || !other.is_alive() {
                continue;
            }
            let dist_sq = me.position.distance_squared(other.position);
            let better = match best {
                None => true,
                Some((d, _)) => dist_sq < d,
            };
            if better {
                best = Some((dist_sq, other.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Two distinct combatants borrowed mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; callers always pass distinct ids.
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> (&mut Ball, &mut Ball) {
        assert_ne!(a, b, "pair_mut requires distinct ids");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = self.balls.split_at_mut(hi.0 as usize);
        let first = &mut left[lo.0 as usize];
        let second = &mut right[0];
        if a < b {
            (first, second)
        } else {
            (second, first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(name: &str, team: u8, weapon: &str, x: f32, y: f32) -> BallSpawn {
        BallSpawn {
            name: name.to_string(),
            team: TeamId(team),
            weapon: weapon.to_string(),
            position: Vec2::new(x, y),
            facing: None,
            policy: PolicyKind::default(),
        }
    }

    fn test_setup() -> (WeaponRegistry, MatchConfig) {
        (WeaponRegistry::builtin(), MatchConfig::default())
    }

    #[test]
    fn test_roster_spawns_in_id_order() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 300.0, 960.0),
            spawn("B", 1, "shuriken", 780.0, 960.0),
        ];
        let roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid spawns");
        assert_eq!(roster.len(), 2);
        let ids: Vec<_> = roster.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![EntityId(0), EntityId(1)]);
        assert_eq!(roster.get(EntityId(0)).unwrap().name, "A");
        // Both face the centre, so toward each other here.
        assert!(roster.get(EntityId(0)).unwrap().facing.x > 0.9);
        assert!(roster.get(EntityId(1)).unwrap().facing.x < -0.9);
    }

    #[test]
    fn test_single_spawn_rejected() {
        let (registry, config) = test_setup();
        let err = Roster::from_spawns(&[spawn("A", 0, "saber", 300.0, 960.0)], &registry, &config)
            .unwrap_err();
        assert!(matches!(err, DuelError::InvalidSpawnConfiguration(_)));
    }

    #[test]
    fn test_overlapping_spawns_rejected() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 300.0, 960.0),
            spawn("B", 1, "saber", 310.0, 960.0),
        ];
        let err = Roster::from_spawns(&spawns, &registry, &config).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_out_of_bounds_spawn_rejected() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 15.0, 960.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let err = Roster::from_spawns(&spawns, &registry, &config).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_unknown_weapon_rejected() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "trident", 300.0, 960.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let err = Roster::from_spawns(&spawns, &registry, &config).unwrap_err();
        assert!(matches!(err, DuelError::UnknownWeapon { .. }));
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 300.0, 960.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let mut roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid");
        let ball = roster.get_mut(EntityId(0)).unwrap();
        ball.health = 10.0;
        let applied = ball.apply_damage(18.0);
        assert_eq!(applied, 10.0);
        assert_eq!(ball.health, 0.0);
        assert!(!ball.is_alive());
    }

    #[test]
    fn test_pair_mut_returns_requested_order() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 300.0, 960.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let mut roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid");
        let (b, a) = roster.pair_mut(EntityId(1), EntityId(0));
        assert_eq!(b.name, "B");
        assert_eq!(a.name, "A");
    }

    #[test]
    fn test_single_team_rejected() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A", 0, "saber", 300.0, 960.0),
            spawn("B", 0, "saber", 780.0, 960.0),
        ];
        let err = Roster::from_spawns(&spawns, &registry, &config).unwrap_err();
        assert!(err.to_string().contains("same team"));
    }

    #[test]
    fn test_nearest_enemy_skips_teammates() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A1", 0, "saber", 300.0, 900.0),
            spawn("A2", 0, "saber", 300.0, 1020.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid");
        // A2 is closer to A1 than B is, but stands on the same side.
        assert_eq!(roster.nearest_enemy(EntityId(0)), Some(EntityId(2)));
        assert_eq!(roster.nearest_enemy(EntityId(2)), Some(EntityId(0)));
    }

    #[test]
    fn test_winning_team_requires_last_side_standing() {
        let (registry, config) = test_setup();
        let spawns = [
            spawn("A1", 0, "saber", 300.0, 900.0),
            spawn("A2", 0, "saber", 300.0, 1020.0),
            spawn("B", 1, "saber", 780.0, 960.0),
        ];
        let mut roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid");
        assert_eq!(roster.winning_team(), None);
        roster.get_mut(EntityId(0)).unwrap().health = 0.0;
        assert_eq!(roster.winning_team(), None);
        roster.get_mut(EntityId(2)).unwrap().health = 0.0;
        assert_eq!(roster.winning_team(), Some(TeamId(0)));
        roster.get_mut(EntityId(1)).unwrap().health = 0.0;
        assert_eq!(roster.winning_team(), None);
    }
}
