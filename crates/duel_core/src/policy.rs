//! Seeded combat policies.
//!
//! Policies are pure decision functions: given the combatant's own state,
//! the opposing combatant, the live projectiles and the per-entity RNG
//! stream, they produce one [`Intent`] per tick. All randomness flows
//! through the passed stream, so a fixed seed replays the exact same fight
//! while different seeds vary the evasive timing.
//!
//! Styles share a common skeleton: retreat when nearly dead, dodge when a
//! projectile is inbound, otherwise press the style's preferred range.

use serde::{Deserialize, Serialize};

use crate::entity::Ball;
use crate::math::Vec2;
use crate::projectile::Projectile;
use crate::rng::EntityRng;
use crate::weapons::{lead_intercept, WeaponClass, WeaponSpec};

/// Movement acceleration magnitude shared by every style.
const ACCEL: f32 = 400.0;
/// Half-angle of the firing cone around the facing, degrees.
const FIRE_ARC_DEGREES: f32 = 18.0;
/// Melee styles press the attack inside this distance.
const MELEE_FIRE_RANGE: f32 = 150.0;
/// Preferred kiting distance, with hysteresis to avoid oscillation.
const KITER_STANDOFF: f32 = 250.0;
const STANDOFF_HYSTERESIS: f32 = 50.0;
/// Evaders hold a longer stand-off than kiters.
const EVADER_STANDOFF: f32 = 350.0;
/// Health ratio below which a combatant disengages.
const RETREAT_HEALTH_RATIO: f32 = 0.15;
/// Steering reacts to projectiles predicted within this horizon (seconds)
/// and this closest-approach distance.
const DODGE_HORIZON: f32 = 1.0;
const DODGE_RADIUS: f32 = 200.0;
/// Dashes react only to imminent threats.
const DASH_HORIZON: f32 = 0.3;
/// Extra miss distance still treated as a hit when predicting threats.
const DASH_MARGIN: f32 = 10.0;
/// Base weight of the lateral dodge component; the per-seed draw perturbs it.
const DODGE_BIAS: f32 = 0.5;
/// Facing nudge applied when the duel starts perfectly mirrored.
const VERTICAL_OFFSET: f32 = 0.1;
/// Ranged weapons fire inside this fraction of their maximum flight range.
const FIRE_RANGE_FACTOR: f32 = 0.9;

/// Behaviour style for one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Close distance and strike whenever possible.
    #[default]
    Aggressive,
    /// Hold a stand-off band and fire opportunistically.
    Kiter,
    /// Hold a longer stand-off and prioritise evasion.
    Evader,
}

impl PolicyKind {
    /// Style suited to a weapon matchup: ranged weapons kite, and evade
    /// when the opponent can close for melee; melee always presses.
    #[must_use]
    pub fn for_matchup(mine: &WeaponSpec, enemy: &WeaponSpec) -> Self {
        match (mine.class, enemy.class) {
            (WeaponClass::Ranged, WeaponClass::Melee) => Self::Evader,
            (WeaponClass::Ranged, WeaponClass::Ranged) => Self::Kiter,
            (WeaponClass::Melee, _) => Self::Aggressive,
        }
    }
}

/// One tick's worth of decisions for one combatant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    /// Acceleration to apply this tick.
    pub accel: Vec2,
    /// Desired unit facing.
    pub facing: Vec2,
    /// Whether to attempt an attack.
    pub fire: bool,
    /// Requested dash direction, if any.
    pub dash: Option<Vec2>,
}

impl Intent {
    /// A do-nothing intent keeping the current facing.
    #[must_use]
    pub fn idle(facing: Vec2) -> Self {
        Self {
            accel: Vec2::ZERO,
            facing,
            fire: false,
            dash: None,
        }
    }
}

/// Read-only view handed to a policy for one decision.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// The deciding combatant.
    pub me: &'a Ball,
    /// The opposing combatant.
    pub enemy: &'a Ball,
    /// All live projectiles.
    pub projectiles: &'a [Projectile],
    /// Arena width, used as the far-separation failsafe distance.
    pub arena_width: f32,
}

/// Decide one tick. Draws from `rng` only on the paths that need variety,
/// so a fixed seed reproduces the same decision sequence exactly.
#[must_use]
pub fn decide(ctx: &PolicyContext<'_>, rng: &mut EntityRng) -> Intent {
    let me = ctx.me;
    let enemy = ctx.enemy;
    let spec = me.weapon.spec();

    let to_enemy = enemy.position - me.position;
    let dist = to_enemy.length();
    let direction = if dist > 0.0 {
        to_enemy * (1.0 / dist)
    } else {
        Vec2::new(1.0, 0.0)
    };

    let projectile_speed = match spec.class {
        WeaponClass::Ranged => spec.projectile_speed,
        WeaponClass::Melee => 0.0,
    };
    let mut facing = lead_intercept(me.position, enemy.position, enemy.velocity, projectile_speed);
    let cos_arc = FIRE_ARC_DEGREES.to_radians().cos();
    let range = fire_range(spec);
    let in_cone = dist <= range && direction.dot(facing) >= cos_arc;

    let my_ratio = me.health / me.max_health;
    let enemy_ratio = enemy.health / enemy.max_health;
    let both_critical = my_ratio < RETREAT_HEALTH_RATIO && enemy_ratio < RETREAT_HEALTH_RATIO;

    let threat = nearest_threat(me, ctx.projectiles, DODGE_HORIZON, DODGE_RADIUS);

    let (accel, fire) = if my_ratio < RETREAT_HEALTH_RATIO && !both_critical {
        // Disengage but keep shooting back when the shot is there.
        (-direction * ACCEL, in_cone)
    } else if let Some(threat) = threat {
        let dodge = dodge_vector(me, &threat);
        let bias = DODGE_BIAS + rng.jitter(0.1);
        let blended = (direction + dodge * bias).normalize_or_zero();
        let blended = if blended == Vec2::ZERO { direction } else { blended };
        (blended * ACCEL, false)
    } else {
        let style = if both_critical {
            PolicyKind::Aggressive
        } else {
            me.policy
        };
        let accel = match style {
            PolicyKind::Aggressive => direction * ACCEL,
            PolicyKind::Kiter => standoff_accel(me, enemy, direction, dist, KITER_STANDOFF),
            PolicyKind::Evader => standoff_accel(me, enemy, direction, dist, EVADER_STANDOFF),
        };
        (accel, in_cone)
    };

    // Failsafe: ranged combatants drifting a full arena apart close back in.
    let accel = if spec.class == WeaponClass::Ranged && dist > ctx.arena_width {
        direction * ACCEL
    } else {
        accel
    };

    // Perfectly mirrored starts would stay mirrored forever; a seeded nudge
    // off the horizontal breaks the symmetry differently per seed.
    if threat.is_none() && to_enemy.y.abs() <= 1e-6 {
        let offset = VERTICAL_OFFSET + rng.jitter(0.05);
        facing = Vec2::new(direction.x, offset).normalize_or_zero();
        if facing == Vec2::ZERO {
            facing = direction;
        }
    }

    let dash = dash_request(ctx, direction, dist, rng);

    Intent {
        accel,
        facing,
        fire,
        dash,
    }
}

/// Distance inside which the weapon is worth triggering.
fn fire_range(spec: &WeaponSpec) -> f32 {
    match spec.class {
        WeaponClass::Melee => MELEE_FIRE_RANGE,
        WeaponClass::Ranged => spec.projectile_speed * spec.projectile_ttl * FIRE_RANGE_FACTOR,
    }
}

/// Hold a preferred distance: back off inside it, close outside the
/// hysteresis band, and sidestep the enemy's line of fire in between.
fn standoff_accel(me: &Ball, enemy: &Ball, direction: Vec2, dist: f32, standoff: f32) -> Vec2 {
    if dist < standoff {
        return -direction * ACCEL;
    }
    if dist > standoff + STANDOFF_HYSTERESIS {
        return direction * ACCEL;
    }
    // In the band: if the enemy is lined up on us, strafe off their axis.
    let off_axis = (me.position - enemy.position).normalize_or_zero();
    let cos_arc = FIRE_ARC_DEGREES.to_radians().cos();
    if enemy.facing.dot(off_axis) >= cos_arc {
        let side = enemy.facing.perp();
        let sign = if side.dot(off_axis) >= 0.0 { 1.0 } else { -1.0 };
        return side * (sign * ACCEL);
    }
    Vec2::ZERO
}

/// A projectile predicted to pass near `me` soon.
#[derive(Debug, Clone, Copy)]
struct Threat {
    velocity: Vec2,
    position: Vec2,
    time: f32,
    miss_distance: f32,
}

/// Closest-approach scan over enemy projectiles.
///
/// For each projectile moving toward `me`, solves the time of closest
/// approach under linear motion; the projectile is a threat when that time
/// falls inside `horizon` and the miss distance inside `radius`. Returns
/// the threat arriving soonest.
fn nearest_threat(
    me: &Ball,
    projectiles: &[Projectile],
    horizon: f32,
    radius: f32,
) -> Option<Threat> {
    let mut best: Option<Threat> = None;
    for proj in projectiles {
        if proj.owner == me.id {
            continue;
        }
        let rel = proj.position - me.position;
        let approach = rel.dot(proj.velocity);
        if approach >= 0.0 {
            continue;
        }
        let speed_sq = proj.velocity.length_squared();
        if speed_sq <= 1e-6 {
            continue;
        }
        let t = -approach / speed_sq;
        if t <= 0.0 || t > horizon {
            continue;
        }
        let closest = rel + proj.velocity * t;
        let miss = closest.length();
        if miss > radius {
            continue;
        }
        if best.map_or(true, |b| t < b.time) {
            best = Some(Threat {
                velocity: proj.velocity,
                position: proj.position,
                time: t,
                miss_distance: miss,
            });
        }
    }
    best
}

/// Lateral escape direction off the threat's flight line.
fn dodge_vector(me: &Ball, threat: &Threat) -> Vec2 {
    let along = threat.velocity.normalize_or_zero();
    let rel = me.position - threat.position;
    let lateral = rel - along * rel.dot(along);
    let lateral = lateral.normalize_or_zero();
    if lateral == Vec2::ZERO {
        along.perp()
    } else {
        lateral
    }
}

/// Dash when a projectile is about to hit, or (for melee) to close the gap.
///
/// The per-seed draw widens or narrows the predicted hit radius, so the
/// exact frame a dash triggers differs between seeds but never between
/// replays of the same seed.
fn dash_request(
    ctx: &PolicyContext<'_>,
    direction: Vec2,
    dist: f32,
    rng: &mut EntityRng,
) -> Option<Vec2> {
    let me = ctx.me;
    if !me.dash.can_dash() {
        return None;
    }

    if let Some(threat) = nearest_threat(me, ctx.projectiles, DASH_HORIZON, DODGE_RADIUS) {
        let hit_radius = (me.radius + DASH_MARGIN) * (1.0 + rng.jitter(0.1));
        if threat.miss_distance <= hit_radius.max(0.0) {
            let dodge = dodge_vector(me, &threat);
            let escape = (-direction + dodge * DODGE_BIAS).normalize_or_zero();
            let escape = if escape == Vec2::ZERO { dodge } else { escape };
            return Some(escape);
        }
    }

    if me.weapon.spec().class == WeaponClass::Melee && dist > MELEE_FIRE_RANGE {
        return Some(direction);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::entity::{BallSpawn, EntityId, Roster, TeamId};
    use crate::projectile::ProjectileId;
    use crate::rng::MatchRng;
    use crate::weapons::WeaponRegistry;

    fn duel(my_weapon: &str, my_policy: PolicyKind, positions: [(f32, f32); 2]) -> Roster {
        let config = MatchConfig::default();
        let registry = WeaponRegistry::builtin();
        let spawns = [
            BallSpawn {
                name: "me".to_string(),
                team: TeamId(0),
                weapon: my_weapon.to_string(),
                position: Vec2::new(positions[0].0, positions[0].1),
                facing: None,
                policy: my_policy,
            },
            BallSpawn {
                name: "enemy".to_string(),
                team: TeamId(1),
                weapon: "saber".to_string(),
                position: Vec2::new(positions[1].0, positions[1].1),
                facing: None,
                policy: PolicyKind::Aggressive,
            },
        ];
        Roster::from_spawns(&spawns, &registry, &config).expect("valid spawns")
    }

    fn rng() -> EntityRng {
        MatchRng::from_seed(7).split()
    }

    fn ctx<'a>(roster: &'a Roster, projectiles: &'a [Projectile]) -> PolicyContext<'a> {
        PolicyContext {
            me: roster.get(EntityId(0)).unwrap(),
            enemy: roster.get(EntityId(1)).unwrap(),
            projectiles,
            arena_width: 1080.0,
        }
    }

    fn incoming(owner: u32, from: Vec2, velocity: Vec2) -> Projectile {
        Projectile {
            id: ProjectileId(0),
            owner: EntityId(owner),
            team: TeamId(owner as u8),
            position: from,
            velocity,
            radius: 10.0,
            damage: 10.0,
            knockback: 120.0,
            ttl: 0.8,
            spin: 0.0,
        }
    }

    #[test]
    fn test_aggressive_closes_distance() {
        let roster = duel("saber", PolicyKind::Aggressive, [(300.0, 960.0), (800.0, 960.0)]);
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.accel.x > 0.0);
        assert!(!intent.fire);
        // Melee out of fire range dashes in to engage.
        assert!(intent.dash.is_some());
    }

    #[test]
    fn test_aggressive_fires_in_range() {
        let roster = duel("saber", PolicyKind::Aggressive, [(500.0, 960.0), (600.0, 960.0)]);
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.fire);
        assert!(intent.dash.is_none());
    }

    #[test]
    fn test_kiter_backs_off_inside_standoff() {
        let roster = duel("shuriken", PolicyKind::Kiter, [(500.0, 960.0), (600.0, 960.0)]);
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.accel.x < 0.0);
        // Still fires: 100 is well inside shuriken range.
        assert!(intent.fire);
    }

    #[test]
    fn test_kiter_closes_outside_band() {
        let roster = duel("shuriken", PolicyKind::Kiter, [(200.0, 960.0), (900.0, 960.0)]);
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.accel.x > 0.0);
    }

    #[test]
    fn test_retreat_below_health_threshold() {
        let mut roster = duel("saber", PolicyKind::Aggressive, [(500.0, 960.0), (600.0, 960.0)]);
        roster.get_mut(EntityId(0)).unwrap().health = 10.0;
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.accel.x < 0.0);
    }

    #[test]
    fn test_both_critical_forces_showdown() {
        let mut roster = duel("shuriken", PolicyKind::Kiter, [(200.0, 960.0), (900.0, 960.0)]);
        roster.get_mut(EntityId(0)).unwrap().health = 10.0;
        roster.get_mut(EntityId(1)).unwrap().health = 10.0;
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        // Aggressive override: closes in rather than retreating.
        assert!(intent.accel.x > 0.0);
    }

    #[test]
    fn test_incoming_projectile_suppresses_fire_and_bends_path() {
        let roster = duel("saber", PolicyKind::Aggressive, [(500.0, 960.0), (600.0, 960.0)]);
        // Slightly off-axis shot arriving in ~0.5 s so the dodge has a side to pick.
        let projectiles = [incoming(
            1,
            Vec2::new(800.0, 955.0),
            Vec2::new(-600.0, 0.0),
        )];
        let intent = decide(&ctx(&roster, &projectiles), &mut rng());
        assert!(!intent.fire);
        assert!(intent.accel.y.abs() > 1.0);
    }

    #[test]
    fn test_dash_requested_for_imminent_hit() {
        let roster = duel("saber", PolicyKind::Aggressive, [(500.0, 960.0), (600.0, 960.0)]);
        // Dead-on shot arriving in 0.1 s.
        let projectiles = [incoming(
            1,
            Vec2::new(560.0, 960.0),
            Vec2::new(-600.0, 0.0),
        )];
        let intent = decide(&ctx(&roster, &projectiles), &mut rng());
        assert!(intent.dash.is_some());
    }

    #[test]
    fn test_no_dash_while_cooling_down() {
        let mut roster = duel("saber", PolicyKind::Aggressive, [(500.0, 960.0), (600.0, 960.0)]);
        let tuning = crate::config::DashTuning::default();
        roster
            .get_mut(EntityId(0))
            .unwrap()
            .dash
            .try_start(Vec2::new(1.0, 0.0), &tuning, WeaponClass::Melee);
        // Let the dash itself end; cooldown still pending.
        for _ in 0..20 {
            roster.get_mut(EntityId(0)).unwrap().dash.tick(1.0 / 60.0);
        }
        let projectiles = [incoming(
            1,
            Vec2::new(560.0, 960.0),
            Vec2::new(-600.0, 0.0),
        )];
        let intent = decide(&ctx(&roster, &projectiles), &mut rng());
        assert!(intent.dash.is_none());
    }

    #[test]
    fn test_same_seed_same_decisions() {
        let roster = duel("shuriken", PolicyKind::Kiter, [(500.0, 960.0), (900.0, 960.0)]);
        let projectiles = [incoming(
            1,
            Vec2::new(700.0, 950.0),
            Vec2::new(-500.0, 10.0),
        )];
        let mut rng_a = MatchRng::from_seed(42).split();
        let mut rng_b = MatchRng::from_seed(42).split();
        for _ in 0..32 {
            let a = decide(&ctx(&roster, &projectiles), &mut rng_a);
            let b = decide(&ctx(&roster, &projectiles), &mut rng_b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_mirrored_start_gets_seeded_facing_nudge() {
        let roster = duel("saber", PolicyKind::Aggressive, [(300.0, 960.0), (780.0, 960.0)]);
        let intent = decide(&ctx(&roster, &[]), &mut rng());
        assert!(intent.facing.y.abs() > 1e-4);
    }

    #[test]
    fn test_matchup_styles() {
        let registry = WeaponRegistry::builtin();
        let saber = registry.get("saber").unwrap();
        let shuriken = registry.get("shuriken").unwrap();
        let rocket = registry.get("rocket").unwrap();
        assert_eq!(PolicyKind::for_matchup(saber, shuriken), PolicyKind::Aggressive);
        assert_eq!(PolicyKind::for_matchup(shuriken, saber), PolicyKind::Evader);
        assert_eq!(PolicyKind::for_matchup(shuriken, rocket), PolicyKind::Kiter);
    }
}
