//! Weapon specs, live instances and the name registry.
//!
//! The registry is populated once before any match starts and never mutated
//! afterwards; matches look weapons up by name and receive fresh instances.
//! A melee attack lands only when the target is inside both the weapon's
//! reach and an angular arc around the owner's facing. A ranged attack
//! always succeeds off cooldown and produces a projectile spawn request
//! aimed at the target, leading it for weapons flagged `lead_aim`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{Ball, EntityId, TeamId};
use crate::error::{DuelError, Result};
use crate::math::Vec2;
use crate::projectile::ProjectileSpawn;

/// Broad weapon category; decides dash cooldown and AI stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    /// Short reach, arc-gated strikes.
    Melee,
    /// Spawns projectiles, no reach limit.
    Ranged,
}

/// Immutable description of one weapon type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponSpec {
    /// Registry name, unique.
    pub name: String,
    /// Melee or ranged.
    pub class: WeaponClass,
    /// Seconds between attacks.
    pub cooldown: f32,
    /// Damage per landed hit, before any critical multiplier.
    pub damage: f32,
    /// Knockback magnitude transferred on hit.
    pub knockback: f32,
    /// Melee only: maximum centre distance for a hit.
    pub reach: f32,
    /// Melee only: half-angle of the strike arc around the facing, degrees.
    pub arc_degrees: f32,
    /// Ranged only: projectile speed in units per second.
    pub projectile_speed: f32,
    /// Ranged only: projectile collision radius.
    pub projectile_radius: f32,
    /// Ranged only: projectile lifetime in seconds.
    pub projectile_ttl: f32,
    /// Ranged only: sprite spin rate, a presentation hint.
    pub projectile_spin: f32,
    /// Ranged only: aim at the predicted intercept instead of the target.
    pub lead_aim: bool,
    /// Added to the owner's speed cap while equipped.
    pub max_speed_bonus: f32,
}

impl Default for WeaponSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            class: WeaponClass::Melee,
            cooldown: 0.5,
            damage: 10.0,
            knockback: 120.0,
            reach: 90.0,
            arc_degrees: 45.0,
            projectile_speed: 0.0,
            projectile_radius: 0.0,
            projectile_ttl: 0.0,
            projectile_spin: 0.0,
            lead_aim: false,
            max_speed_bonus: 0.0,
        }
    }
}

impl WeaponSpec {
    /// Melee spec with the common fields set.
    #[must_use]
    pub fn melee(name: &str, cooldown: f32, damage: f32, knockback: f32, reach: f32) -> Self {
        Self {
            name: name.to_string(),
            class: WeaponClass::Melee,
            cooldown,
            damage,
            knockback,
            reach,
            ..Self::default()
        }
    }

    /// Ranged spec with the common fields set.
    #[must_use]
    pub fn ranged(
        name: &str,
        cooldown: f32,
        damage: f32,
        knockback: f32,
        projectile_speed: f32,
        projectile_radius: f32,
        projectile_ttl: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            class: WeaponClass::Ranged,
            cooldown,
            damage,
            knockback,
            reach: 0.0,
            arc_degrees: 0.0,
            projectile_speed,
            projectile_radius,
            projectile_ttl,
            ..Self::default()
        }
    }

    /// Enable lead-intercept aiming.
    #[must_use]
    pub fn with_lead_aim(mut self) -> Self {
        self.lead_aim = true;
        self
    }

    /// Set the melee arc half-angle in degrees.
    #[must_use]
    pub fn with_arc(mut self, degrees: f32) -> Self {
        self.arc_degrees = degrees;
        self
    }

    /// Set the sprite spin rate.
    #[must_use]
    pub fn with_spin(mut self, spin: f32) -> Self {
        self.projectile_spin = spin;
        self
    }

    /// Grant the owner a speed cap bonus while equipped.
    #[must_use]
    pub fn with_speed_bonus(mut self, bonus: f32) -> Self {
        self.max_speed_bonus = bonus;
        self
    }

    /// Check the spec for values that cannot drive a simulation.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DuelError::malformed("weapon.name", "must not be empty"));
        }
        if self.cooldown <= 0.0 {
            return Err(DuelError::malformed(
                "weapon.cooldown",
                format!("'{}' must have a positive cooldown", self.name),
            ));
        }
        if self.damage <= 0.0 {
            return Err(DuelError::malformed(
                "weapon.damage",
                format!("'{}' must deal positive damage", self.name),
            ));
        }
        if self.knockback < 0.0 {
            return Err(DuelError::malformed(
                "weapon.knockback",
                format!("'{}' must not have negative knockback", self.name),
            ));
        }
        match self.class {
            WeaponClass::Melee => {
                if self.reach <= 0.0 {
                    return Err(DuelError::malformed(
                        "weapon.reach",
                        format!("melee '{}' must have positive reach", self.name),
                    ));
                }
                if self.arc_degrees <= 0.0 || self.arc_degrees > 180.0 {
                    return Err(DuelError::malformed(
                        "weapon.arc_degrees",
                        format!("melee '{}' arc must be in (0, 180]", self.name),
                    ));
                }
            }
            WeaponClass::Ranged => {
                if self.projectile_speed <= 0.0 {
                    return Err(DuelError::malformed(
                        "weapon.projectile_speed",
                        format!("ranged '{}' must have positive projectile speed", self.name),
                    ));
                }
                if self.projectile_radius <= 0.0 {
                    return Err(DuelError::malformed(
                        "weapon.projectile_radius",
                        format!("ranged '{}' must have positive projectile radius", self.name),
                    ));
                }
                if self.projectile_ttl <= 0.0 {
                    return Err(DuelError::malformed(
                        "weapon.projectile_ttl",
                        format!("ranged '{}' must have positive projectile ttl", self.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Copy of the attacker fields an attack needs, taken before the weapon is
/// borrowed mutably; the weapon lives inside the same ball.
#[derive(Debug, Clone, Copy)]
pub struct AttackerView {
    /// Attacking combatant.
    pub id: EntityId,
    /// Attacker's side, stamped onto spawned projectiles.
    pub team: TeamId,
    /// Attacker position.
    pub position: Vec2,
    /// Attacker unit facing.
    pub facing: Vec2,
}

impl AttackerView {
    /// Snapshot the relevant fields of `ball`.
    #[must_use]
    pub fn of(ball: &Ball) -> Self {
        Self {
            id: ball.id,
            team: ball.team,
            position: ball.position,
            facing: ball.facing,
        }
    }
}

/// Result of a successful attack attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackOutcome {
    /// A melee hit on `target`.
    Strike {
        /// Combatant that was struck.
        target: EntityId,
        /// Damage before any critical multiplier.
        damage: f32,
        /// Knockback velocity to add to the target.
        knockback: Vec2,
    },
    /// A ranged shot; the simulation spawns the projectile.
    Fire(ProjectileSpawn),
}

/// A weapon equipped by one combatant, carrying live cooldown state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponInstance {
    spec: WeaponSpec,
    cooldown_remaining: f32,
}

impl WeaponInstance {
    /// Wrap a spec with the cooldown ready to fire.
    #[must_use]
    pub fn new(spec: WeaponSpec) -> Self {
        Self {
            spec,
            cooldown_remaining: 0.0,
        }
    }

    /// The immutable spec.
    #[must_use]
    pub fn spec(&self) -> &WeaponSpec {
        &self.spec
    }

    /// Seconds until the next attack is allowed.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// Whether an attack is allowed right now.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    /// Advance the cooldown by one tick; never goes negative.
    pub fn tick(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }

    /// Attempt an attack from `owner` against `target`.
    ///
    /// Returns `None` when on cooldown, when the target is dead, or when a
    /// melee target is outside reach or arc. On success the cooldown resets
    /// to the spec's full duration.
    pub fn try_attack(&mut self, owner: &AttackerView, target: &Ball) -> Option<AttackOutcome> {
        if !self.ready() || !target.is_alive() {
            return None;
        }
        let to_target = target.position - owner.position;
        let aim_fallback = owner.facing;
        let direct = {
            let d = to_target.normalize_or_zero();
            if d == Vec2::ZERO {
                aim_fallback
            } else {
                d
            }
        };

        let outcome = match self.spec.class {
            WeaponClass::Melee => {
                if to_target.length() > self.spec.reach {
                    return None;
                }
                let cos_arc = self.spec.arc_degrees.to_radians().cos();
                if direct.dot(owner.facing) < cos_arc {
                    return None;
                }
                AttackOutcome::Strike {
                    target: target.id,
                    damage: self.spec.damage,
                    knockback: direct * self.spec.knockback,
                }
            }
            WeaponClass::Ranged => {
                let aim = if self.spec.lead_aim {
                    lead_intercept(
                        owner.position,
                        target.position,
                        target.velocity,
                        self.spec.projectile_speed,
                    )
                } else {
                    direct
                };
                AttackOutcome::Fire(ProjectileSpawn {
                    owner: owner.id,
                    team: owner.team,
                    position: owner.position,
                    velocity: aim * self.spec.projectile_speed,
                    radius: self.spec.projectile_radius,
                    damage: self.spec.damage,
                    knockback: self.spec.knockback,
                    ttl: self.spec.projectile_ttl,
                    spin: self.spec.projectile_spin,
                })
            }
        };
        self.cooldown_remaining = self.spec.cooldown;
        Some(outcome)
    }
}

/// Unit aim vector leading a moving target.
///
/// Solves the quadratic intercept of a projectile at `projectile_speed`
/// against a target moving linearly at `target_vel`. Falls back to the
/// direct direction when no positive intercept time exists.
#[must_use]
pub fn lead_intercept(
    shooter: Vec2,
    target_pos: Vec2,
    target_vel: Vec2,
    projectile_speed: f32,
) -> Vec2 {
    let to_target = target_pos - shooter;
    if projectile_speed <= 0.0 {
        let d = to_target.normalize_or_zero();
        return if d == Vec2::ZERO { Vec2::new(1.0, 0.0) } else { d };
    }

    let a = target_vel.length_squared() - projectile_speed * projectile_speed;
    let b = 2.0 * to_target.dot(target_vel);
    let c = to_target.length_squared();

    let t = if a.abs() < 1e-6 {
        if b.abs() > 1e-6 {
            -c / b
        } else {
            0.0
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            0.0
        } else {
            let sqrt_disc = disc.sqrt();
            let t1 = (-b - sqrt_disc) / (2.0 * a);
            let t2 = (-b + sqrt_disc) / (2.0 * a);
            match (t1 > 0.0, t2 > 0.0) {
                (true, true) => t1.min(t2),
                (true, false) => t1,
                (false, true) => t2,
                (false, false) => 0.0,
            }
        }
    };

    let intercept = target_pos + target_vel * t.max(0.0);
    let dir = (intercept - shooter).normalize_or_zero();
    if dir == Vec2::ZERO {
        Vec2::new(1.0, 0.0)
    } else {
        dir
    }
}

/// Name-keyed weapon table, populated at setup and immutable afterwards.
///
/// Backed by a `BTreeMap` so listings come out in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponRegistry {
    specs: BTreeMap<String, WeaponSpec>,
}

impl WeaponRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in roster.
    #[must_use]
    pub fn builtin() -> Self {
        let mut specs = BTreeMap::new();
        for spec in [
            WeaponSpec::melee("saber", 0.6, 18.0, 220.0, 90.0),
            WeaponSpec::melee("dagger", 0.35, 8.0, 120.0, 75.0)
                .with_arc(60.0)
                .with_speed_bonus(120.0),
            WeaponSpec::ranged("shuriken", 0.8, 10.0, 120.0, 600.0, 10.0, 0.8).with_spin(12.0),
            WeaponSpec::ranged("rocket", 1.2, 20.0, 200.0, 300.0, 15.0, 1.5).with_lead_aim(),
        ] {
            specs.insert(spec.name.clone(), spec);
        }
        Self { specs }
    }

    /// Register a new weapon.
    ///
    /// # Errors
    ///
    /// [`DuelError::DuplicateWeapon`] if the name is already taken, or a
    /// validation error for unusable parameter values.
    pub fn register(&mut self, spec: WeaponSpec) -> Result<()> {
        spec.validate()?;
        if self.specs.contains_key(&spec.name) {
            return Err(DuelError::DuplicateWeapon {
                name: spec.name.clone(),
            });
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Replace parameters of an already registered weapon.
    ///
    /// # Errors
    ///
    /// [`DuelError::UnknownWeapon`] if nothing is registered under that
    /// name, or a validation error for unusable parameter values.
    pub fn override_spec(&mut self, spec: WeaponSpec) -> Result<()> {
        spec.validate()?;
        if !self.specs.contains_key(&spec.name) {
            return Err(DuelError::UnknownWeapon {
                name: spec.name.clone(),
            });
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Apply a batch of overrides, typically from a settings file.
    pub fn apply_overrides(&mut self, overrides: &[WeaponSpec]) -> Result<()> {
        for spec in overrides {
            self.override_spec(spec.clone())?;
        }
        Ok(())
    }

    /// Spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WeaponSpec> {
        self.specs.get(name)
    }

    /// Fresh instance of the named weapon.
    ///
    /// # Errors
    ///
    /// [`DuelError::UnknownWeapon`] if the name is unregistered.
    pub fn instantiate(&self, name: &str) -> Result<WeaponInstance> {
        self.specs
            .get(name)
            .map(|spec| WeaponInstance::new(spec.clone()))
            .ok_or_else(|| DuelError::UnknownWeapon {
                name: name.to_string(),
            })
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }

    /// Number of registered weapons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
