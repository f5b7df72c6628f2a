//! Projectiles in flight.
//!
//! Projectiles are plain records moved by the physics step. They carry the
//! damage payload decided at fire time, so a weapon swap or cooldown change
//! after firing never alters a shot already in the air.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, TeamId};
use crate::math::Vec2;

/// Stable identifier for a projectile, unique within one match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProjectileId(pub u32);

impl std::fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proj{}", self.0)
    }
}

/// One projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique id, assigned in fire order.
    pub id: ProjectileId,
    /// Combatant that fired this projectile; never hit by it.
    pub owner: EntityId,
    /// Firing combatant's side. Shots can still strike teammates.
    pub team: TeamId,
    /// Position in arena coordinates.
    pub position: Vec2,
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Collision radius.
    pub radius: f32,
    /// Damage applied on impact, before any critical multiplier.
    pub damage: f32,
    /// Knockback magnitude transferred on impact.
    pub knockback: f32,
    /// Remaining lifetime in seconds; strictly decreases every step.
    pub ttl: f32,
    /// Angular velocity of the sprite, a presentation hint only.
    pub spin: f32,
}

impl Projectile {
    /// Whether the lifetime has run out.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.ttl <= 0.0
    }

    /// Whether this projectile overlaps a circle at `centre` with `radius`.
    #[must_use]
    pub fn overlaps(&self, centre: Vec2, radius: f32) -> bool {
        let reach = self.radius + radius;
        self.position.distance_squared(centre) <= reach * reach
    }
}

/// Request produced by a ranged weapon's successful attack; the simulation
/// turns it into a live [`Projectile`] with the next free id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    /// Firing combatant.
    pub owner: EntityId,
    /// Firing combatant's side.
    pub team: TeamId,
    /// Spawn position.
    pub position: Vec2,
    /// Initial velocity.
    pub velocity: Vec2,
    /// Collision radius.
    pub radius: f32,
    /// Impact damage.
    pub damage: f32,
    /// Impact knockback magnitude.
    pub knockback: f32,
    /// Lifetime in seconds.
    pub ttl: f32,
    /// Sprite angular velocity.
    pub spin: f32,
}
