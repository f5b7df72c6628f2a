//! Combat resolution.
//!
//! All state mutation caused by fighting happens here, in a fixed order the
//! simulation calls once per tick: dash impulses, then melee and fire
//! attempts, then projectile impacts, then contact knockback. Combatants
//! are always visited in id order, so two runs of the same match resolve
//! every exchange identically.
//!
//! Damage rules: a hit landed while the attacker's dash window is open is
//! critical and multiplied; a target inside its invulnerability window
//! takes neither damage nor knockback; health clamps at zero and death is
//! terminal for the rest of the match.

use serde::{Deserialize, Serialize};

use crate::config::DashTuning;
use crate::entity::{EntityId, Roster};
use crate::physics::{Contact, Impact};
use crate::policy::Intent;
use crate::projectile::{Projectile, ProjectileId, ProjectileSpawn};
use crate::weapons::{AttackOutcome, AttackerView};

/// One resolved hit, kept for snapshots and the end-sequence banner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Combatant that dealt the hit.
    pub attacker: EntityId,
    /// Combatant that took the hit.
    pub target: EntityId,
    /// Damage actually removed, after the critical multiplier and clamping.
    pub amount: f32,
    /// Whether the attacker's dash window made this a critical hit.
    pub critical: bool,
    /// Whether this hit killed the target.
    pub fatal: bool,
}

/// Attack-stage output: hits already applied plus projectile spawn requests
/// for the simulation to instantiate.
#[derive(Debug, Default)]
pub struct AttackResolution {
    /// Melee hits applied this stage.
    pub events: Vec<DamageEvent>,
    /// Ranged shots requested this stage, in attacker id order.
    pub spawns: Vec<ProjectileSpawn>,
}

/// Impact-stage output: hits applied plus the projectiles spent doing it.
#[derive(Debug, Default)]
pub struct ImpactResolution {
    /// Projectile hits applied this stage.
    pub events: Vec<DamageEvent>,
    /// Projectiles consumed by their impact.
    pub destroyed: Vec<ProjectileId>,
}

/// Stage 1: start requested dashes and apply their velocity impulses.
///
/// `try_start` enforces exclusivity, so a request during an active dash or
/// a pending cooldown is dropped here without side effects.
pub fn apply_dash_impulses(
    roster: &mut Roster,
    intents: &[(EntityId, Intent)],
    tuning: &DashTuning,
) -> u32 {
    let mut started = 0;
    for (id, intent) in intents {
        let Some(direction) = intent.dash else {
            continue;
        };
        let Some(ball) = roster.get_mut(*id) else {
            continue;
        };
        if !ball.is_alive() {
            continue;
        }
        let class = ball.weapon.spec().class;
        if ball.dash.try_start(direction, tuning, class) {
            ball.velocity = ball.dash.direction() * tuning.speed;
            started += 1;
        }
    }
    started
}

/// Stage 2: resolve fire intents in attacker id order.
///
/// Melee hits apply immediately; ranged attempts produce spawn requests.
/// An attacker killed earlier in the same stage loses its queued attack,
/// and a melee hit on an invulnerable target spends the cooldown but
/// applies nothing.
pub fn resolve_attacks(
    roster: &mut Roster,
    intents: &[(EntityId, Intent)],
    crit_multiplier: f32,
) -> AttackResolution {
    let mut resolution = AttackResolution::default();
    for (id, intent) in intents {
        if !intent.fire {
            continue;
        }
        if !roster.get(*id).is_some_and(|b| b.is_alive()) {
            continue;
        }
        let Some(target_id) = roster.nearest_enemy(*id) else {
            continue;
        };
        let (attacker, target) = roster.pair_mut(*id, target_id);
        let view = AttackerView::of(attacker);
        let critical = attacker.dash.in_crit_window();
        let Some(outcome) = attacker.weapon.try_attack(&view, target) else {
            continue;
        };
        match outcome {
            AttackOutcome::Strike {
                target: struck,
                damage,
                knockback,
            } => {
                if target.dash.is_invulnerable() {
                    continue;
                }
                let amount = if critical {
                    damage * crit_multiplier
                } else {
                    damage
                };
                let applied = target.apply_damage(amount);
                target.velocity += knockback * (1.0 - target.knockback_resistance);
                resolution.events.push(DamageEvent {
                    attacker: *id,
                    target: struck,
                    amount: applied,
                    critical,
                    fatal: !target.is_alive(),
                });
            }
            AttackOutcome::Fire(spawn) => resolution.spawns.push(spawn),
        }
    }
    resolution
}

/// Stage 3: apply projectile impacts in projectile id order.
///
/// The critical flag comes from the owner's dash window at the moment the
/// shot lands, matching the melee rule. A projectile whose target died
/// earlier this tick flies on.
pub fn resolve_impacts(
    roster: &mut Roster,
    projectiles: &[Projectile],
    impacts: &[Impact],
    crit_multiplier: f32,
) -> ImpactResolution {
    let mut resolution = ImpactResolution::default();
    for impact in impacts {
        let Some(proj) = projectiles.iter().find(|p| p.id == impact.projectile) else {
            continue;
        };
        let critical = roster
            .get(proj.owner)
            .is_some_and(|owner| owner.dash.in_crit_window());
        let Some(target) = roster.get_mut(impact.target) else {
            continue;
        };
        if !target.is_alive() || target.dash.is_invulnerable() {
            continue;
        }
        let amount = if critical {
            proj.damage * crit_multiplier
        } else {
            proj.damage
        };
        let applied = target.apply_damage(amount);
        let direction = proj.velocity.normalize_or_zero();
        target.velocity += direction * proj.knockback * (1.0 - target.knockback_resistance);
        resolution.events.push(DamageEvent {
            attacker: proj.owner,
            target: impact.target,
            amount: applied,
            critical,
            fatal: !target.is_alive(),
        });
        resolution.destroyed.push(proj.id);
    }
    resolution
}

/// Stage 4: elastic contact knockback between overlapping combatants.
///
/// Equal-mass elastic exchange of the normal velocity components, with
/// each recipient's share scaled down by its knockback resistance. With
/// zero resistance on both sides this is the classic velocity swap.
pub fn apply_contact_knockback(roster: &mut Roster, contacts: &[Contact]) {
    for contact in contacts {
        let both_alive = roster.get(contact.a).is_some_and(|b| b.is_alive())
            && roster.get(contact.b).is_some_and(|b| b.is_alive());
        if !both_alive {
            continue;
        }
        let normal = contact.normal;
        let (a, b) = roster.pair_mut(contact.a, contact.b);
        let va_n = a.velocity.dot(normal);
        let vb_n = b.velocity.dot(normal);
        let delta = vb_n - va_n;
        a.velocity += normal * (delta * (1.0 - a.knockback_resistance));
        b.velocity += normal * (-delta * (1.0 - b.knockback_resistance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::entity::{BallSpawn, TeamId};
    use crate::math::Vec2;
    use crate::policy::PolicyKind;
    use crate::weapons::{WeaponClass, WeaponRegistry};

    const DT: f32 = 1.0 / 60.0;

    fn duel(weapon_a: &str, weapon_b: &str, ax: f32, bx: f32) -> (Roster, MatchConfig) {
        let config = MatchConfig::default();
        let registry = WeaponRegistry::builtin();
        let spawns = [
            BallSpawn {
                name: "A".to_string(),
                team: TeamId(0),
                weapon: weapon_a.to_string(),
                position: Vec2::new(ax, 960.0),
                facing: None,
                policy: PolicyKind::default(),
            },
            BallSpawn {
                name: "B".to_string(),
                team: TeamId(1),
                weapon: weapon_b.to_string(),
                position: Vec2::new(bx, 960.0),
                facing: None,
                policy: PolicyKind::default(),
            },
        ];
        let roster = Roster::from_spawns(&spawns, &registry, &config).expect("valid spawns");
        (roster, config)
    }

    fn fire_intent(id: u32) -> (EntityId, Intent) {
        (
            EntityId(id),
            Intent {
                accel: Vec2::ZERO,
                facing: Vec2::new(1.0, 0.0),
                fire: true,
                dash: None,
            },
        )
    }

    fn dash_intent(id: u32, direction: Vec2) -> (EntityId, Intent) {
        (
            EntityId(id),
            Intent {
                accel: Vec2::ZERO,
                facing: Vec2::new(1.0, 0.0),
                fire: false,
                dash: Some(direction),
            },
        )
    }

    #[test]
    fn test_dash_impulse_sets_velocity_and_cooldown() {
        let (mut roster, config) = duel("saber", "saber", 300.0, 800.0);
        let intents = [dash_intent(0, Vec2::new(1.0, 0.0))];
        let started = apply_dash_impulses(&mut roster, &intents, &config.dash);
        assert_eq!(started, 1);
        let ball = roster.get(EntityId(0)).unwrap();
        assert!((ball.velocity.x - 800.0).abs() < 1e-3);
        assert!(ball.dash.is_active());
        assert_eq!(ball.dash.cooldown_remaining(), 3.0);

        // Second request the same tick is refused.
        let started = apply_dash_impulses(&mut roster, &intents, &config.dash);
        assert_eq!(started, 0);
    }

    #[test]
    fn test_melee_strike_applies_damage_and_knockback() {
        let (mut roster, config) = duel("saber", "saber", 500.0, 570.0);
        let intents = [fire_intent(0)];
        let resolution = resolve_attacks(&mut roster, &intents, config.dash.crit_multiplier);
        assert_eq!(resolution.events.len(), 1);
        let event = resolution.events[0];
        assert_eq!(event.attacker, EntityId(0));
        assert_eq!(event.target, EntityId(1));
        assert_eq!(event.amount, 18.0);
        assert!(!event.critical);
        assert!(!event.fatal);
        let target = roster.get(EntityId(1)).unwrap();
        assert_eq!(target.health, 82.0);
        assert!((target.velocity.x - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_dashing_attacker_scores_critical() {
        let (mut roster, config) = duel("saber", "saber", 500.0, 570.0);
        assert!(roster.get_mut(EntityId(0)).unwrap().dash.try_start(
            Vec2::new(1.0, 0.0),
            &config.dash,
            WeaponClass::Melee
        ));
        let intents = [fire_intent(0)];
        let resolution = resolve_attacks(&mut roster, &intents, config.dash.crit_multiplier);
        let event = resolution.events[0];
        assert!(event.critical);
        assert_eq!(event.amount, 36.0);
    }

    #[test]
    fn test_invulnerable_target_takes_nothing_but_cooldown_is_spent() {
        let (mut roster, config) = duel("saber", "saber", 500.0, 570.0);
        assert!(roster.get_mut(EntityId(1)).unwrap().dash.try_start(
            Vec2::new(0.0, 1.0),
            &config.dash,
            WeaponClass::Melee
        ));
        let before = roster.get(EntityId(1)).unwrap().velocity;
        let intents = [fire_intent(0)];
        let resolution = resolve_attacks(&mut roster, &intents, config.dash.crit_multiplier);
        assert!(resolution.events.is_empty());
        let target = roster.get(EntityId(1)).unwrap();
        assert_eq!(target.health, 100.0);
        assert_eq!(target.velocity, before);
        // The swing still happened.
        assert!(!roster.get(EntityId(0)).unwrap().weapon.ready());
    }

    #[test]
    fn test_dead_attacker_loses_queued_attack() {
        let (mut roster, config) = duel("saber", "saber", 500.0, 570.0);
        roster.get_mut(EntityId(1)).unwrap().health = 10.0;
        // A kills B first; B's queued swing must not resolve.
        let intents = [fire_intent(0), fire_intent(1)];
        let resolution = resolve_attacks(&mut roster, &intents, config.dash.crit_multiplier);
        assert_eq!(resolution.events.len(), 1);
        assert!(resolution.events[0].fatal);
        assert_eq!(roster.get(EntityId(0)).unwrap().health, 100.0);
    }

    #[test]
    fn test_ranged_attack_produces_spawn() {
        let (mut roster, config) = duel("shuriken", "saber", 300.0, 800.0);
        let intents = [fire_intent(0)];
        let resolution = resolve_attacks(&mut roster, &intents, config.dash.crit_multiplier);
        assert!(resolution.events.is_empty());
        assert_eq!(resolution.spawns.len(), 1);
        assert_eq!(resolution.spawns[0].owner, EntityId(0));
        assert!(resolution.spawns[0].velocity.x > 0.0);
    }

    #[test]
    fn test_impact_applies_damage_along_flight_direction() {
        let (mut roster, config) = duel("saber", "shuriken", 500.0, 800.0);
        let projectiles = [Projectile {
            id: ProjectileId(0),
            owner: EntityId(1),
            team: TeamId(1),
            position: Vec2::new(505.0, 960.0),
            velocity: Vec2::new(-600.0, 0.0),
            radius: 10.0,
            damage: 10.0,
            knockback: 120.0,
            ttl: 0.5,
            spin: 0.0,
        }];
        let impacts = [Impact {
            projectile: ProjectileId(0),
            target: EntityId(0),
        }];
        let resolution = resolve_impacts(
            &mut roster,
            &projectiles,
            &impacts,
            config.dash.crit_multiplier,
        );
        assert_eq!(resolution.events.len(), 1);
        assert_eq!(resolution.destroyed, vec![ProjectileId(0)]);
        let target = roster.get(EntityId(0)).unwrap();
        assert_eq!(target.health, 90.0);
        // Knocked back along the projectile's flight, away from the shooter.
        assert!(target.velocity.x < 0.0);
    }

    #[test]
    fn test_impact_on_dead_target_skipped() {
        let (mut roster, config) = duel("saber", "shuriken", 500.0, 800.0);
        roster.get_mut(EntityId(0)).unwrap().health = 0.0;
        let projectiles = [Projectile {
            id: ProjectileId(0),
            owner: EntityId(1),
            team: TeamId(1),
            position: Vec2::new(505.0, 960.0),
            velocity: Vec2::new(-600.0, 0.0),
            radius: 10.0,
            damage: 10.0,
            knockback: 120.0,
            ttl: 0.5,
            spin: 0.0,
        }];
        let impacts = [Impact {
            projectile: ProjectileId(0),
            target: EntityId(0),
        }];
        let resolution = resolve_impacts(
            &mut roster,
            &projectiles,
            &impacts,
            config.dash.crit_multiplier,
        );
        assert!(resolution.events.is_empty());
        assert!(resolution.destroyed.is_empty());
    }

    #[test]
    fn test_contact_knockback_swaps_normal_velocities() {
        let (mut roster, _config) = duel("saber", "saber", 500.0, 570.0);
        roster.get_mut(EntityId(0)).unwrap().velocity = Vec2::new(200.0, 0.0);
        roster.get_mut(EntityId(1)).unwrap().velocity = Vec2::new(-100.0, 50.0);
        let contacts = [Contact {
            a: EntityId(0),
            b: EntityId(1),
            normal: Vec2::new(1.0, 0.0),
        }];
        apply_contact_knockback(&mut roster, &contacts);
        let a = roster.get(EntityId(0)).unwrap();
        let b = roster.get(EntityId(1)).unwrap();
        // Normal components swapped, tangential kept.
        assert!((a.velocity.x - -100.0).abs() < 1e-3);
        assert!((b.velocity.x - 200.0).abs() < 1e-3);
        assert!((a.velocity.y - 0.0).abs() < 1e-3);
        assert!((b.velocity.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_knockback_resistance_scales_exchange() {
        let (mut roster, _config) = duel("saber", "saber", 500.0, 570.0);
        roster.get_mut(EntityId(0)).unwrap().velocity = Vec2::new(200.0, 0.0);
        roster.get_mut(EntityId(0)).unwrap().knockback_resistance = 0.5;
        roster.get_mut(EntityId(1)).unwrap().velocity = Vec2::ZERO;
        let contacts = [Contact {
            a: EntityId(0),
            b: EntityId(1),
            normal: Vec2::new(1.0, 0.0),
        }];
        apply_contact_knockback(&mut roster, &contacts);
        let a = roster.get(EntityId(0)).unwrap();
        // Full swap would leave a at 0; half resistance keeps half the loss.
        assert!((a.velocity.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_weapon_cooldown_never_negative_over_ticks() {
        let (mut roster, _config) = duel("saber", "saber", 500.0, 570.0);
        let ball = roster.get_mut(EntityId(0)).unwrap();
        for _ in 0..100 {
            ball.weapon.tick(DT);
            assert!(ball.weapon.cooldown_remaining() >= 0.0);
        }
    }
}
