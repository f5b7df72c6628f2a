//! Read-only per-step views for the presentation layer.
//!
//! A snapshot is captured after every simulation step. It carries plain
//! copies, so the renderer can hold onto it across frames while the match
//! moves on, and the trailing buffer of snapshots feeds the slow-motion
//! replay of the final moments.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Roster, TeamId};
use crate::math::Vec2;
use crate::phase::{MatchPhase, PhaseClock};
use crate::projectile::{Projectile, ProjectileId};

/// The most recent landed hit, for impact flashes and the banner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastHit {
    /// Combatant that was struck.
    pub target: EntityId,
    /// Combatant that landed the hit.
    pub attacker: EntityId,
    /// Combat-clock time the hit landed, in seconds.
    pub time: f32,
    /// Whether the hit was critical.
    pub critical: bool,
}

/// One combatant as the renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    /// Combatant id.
    pub id: EntityId,
    /// Side the combatant fights for.
    pub team: TeamId,
    /// Position in arena coordinates.
    pub position: Vec2,
    /// Unit facing direction.
    pub facing: Vec2,
    /// Current health.
    pub health: f32,
    /// Whether the combatant is still in the fight.
    pub alive: bool,
    /// Whether a dash is currently active.
    pub dashing: bool,
    /// Whether incoming damage is currently negated.
    pub invulnerable: bool,
}

/// One projectile as the renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Projectile id.
    pub id: ProjectileId,
    /// Side of the combatant that fired it.
    pub team: TeamId,
    /// Position in arena coordinates.
    pub position: Vec2,
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Collision radius.
    pub radius: f32,
    /// Sprite angular velocity.
    pub spin: f32,
}

/// Everything the presentation layer needs about one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    /// Tick count since combat began.
    pub tick: u64,
    /// Combat-clock seconds since combat began.
    pub elapsed: f32,
    /// Lifecycle phase when the snapshot was taken.
    pub phase: MatchPhase,
    /// Progress through the current phase in [0, 1].
    pub progress: f32,
    /// Every combatant, in id order, dead ones included.
    pub balls: Vec<BallView>,
    /// Live projectiles in id order.
    pub projectiles: Vec<ProjectileView>,
    /// The most recent landed hit, once any hit has landed.
    pub last_hit: Option<LastHit>,
}

impl StepSnapshot {
    /// Copy the current state of a match into a snapshot.
    #[must_use]
    pub fn capture(
        tick: u64,
        elapsed: f32,
        clock: &PhaseClock,
        roster: &Roster,
        projectiles: &[Projectile],
        last_hit: Option<LastHit>,
    ) -> Self {
        let balls = roster
            .iter()
            .map(|b| BallView {
                id: b.id,
                team: b.team,
                position: b.position,
                facing: b.facing,
                health: b.health,
                alive: b.is_alive(),
                dashing: b.dash.is_active(),
                invulnerable: b.dash.is_invulnerable(),
            })
            .collect();
        let projectiles = projectiles
            .iter()
            .map(|p| ProjectileView {
                id: p.id,
                team: p.team,
                position: p.position,
                velocity: p.velocity,
                radius: p.radius,
                spin: p.spin,
            })
            .collect();
        Self {
            tick,
            elapsed,
            phase: clock.phase(),
            progress: clock.progress(),
            balls,
            projectiles,
            last_hit,
        }
    }
}
