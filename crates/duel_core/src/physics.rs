//! Fixed-timestep integration, arena containment and collision detection.
//!
//! The physics step moves bodies and reports what touched what. It never
//! applies damage or knockback; the combat resolver consumes the returned
//! events and mutates health and velocities in its own fixed order.
//!
//! Iteration is in id order everywhere, so the event lists come out in the
//! same order on every run with the same inputs.

use crate::config::{ArenaConfig, BallTuning};
use crate::entity::{EntityId, Roster};
use crate::math::Vec2;
use crate::projectile::{Projectile, ProjectileId};

/// Two combatants overlapping this step. Ids are ordered `a < b` and the
/// normal points from `a` toward `b`, captured before positional separation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Lower-id combatant.
    pub a: EntityId,
    /// Higher-id combatant.
    pub b: EntityId,
    /// Unit contact normal from `a` toward `b`.
    pub normal: Vec2,
}

/// A projectile overlapping a combatant it may damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// The projectile that struck.
    pub projectile: ProjectileId,
    /// The combatant that was struck.
    pub target: EntityId,
}

/// Collision events observed during one physics step.
#[derive(Debug, Clone, Default)]
pub struct StepEvents {
    /// Ball pair overlaps, in ascending `(a, b)` order.
    pub contacts: Vec<Contact>,
    /// Projectile strikes, in projectile id order, at most one per projectile.
    pub impacts: Vec<Impact>,
}

/// Advance all bodies by one tick and report collisions.
///
/// Order within the step: speed cap, integration, wall containment,
/// pairwise separation, then collision detection on the settled positions.
/// Dash movement is exempt from the speed cap while the dash is active,
/// otherwise the cap would swallow the dash impulse on the next tick.
pub fn step(
    roster: &mut Roster,
    projectiles: &mut [Projectile],
    dt: f32,
    arena: &ArenaConfig,
    tuning: &BallTuning,
) -> StepEvents {
    let (min_x, min_y, max_x, max_y) = arena.interior();

    for ball in roster.iter_mut() {
        if !ball.is_alive() {
            continue;
        }
        if !ball.dash.is_active() {
            let cap = ball.max_speed(tuning.max_speed);
            ball.velocity = ball.velocity.clamp_length(cap);
        }
        ball.position += ball.velocity * dt;
        let r = ball.radius;
        if ball.position.x - r < min_x {
            ball.position.x = min_x + r;
            ball.velocity.x = ball.velocity.x.abs();
        } else if ball.position.x + r > max_x {
            ball.position.x = max_x - r;
            ball.velocity.x = -ball.velocity.x.abs();
        }
        if ball.position.y - r < min_y {
            ball.position.y = min_y + r;
            ball.velocity.y = ball.velocity.y.abs();
        } else if ball.position.y + r > max_y {
            ball.position.y = max_y - r;
            ball.velocity.y = -ball.velocity.y.abs();
        }
    }

    let mut events = StepEvents::default();
    separate_overlaps(roster, &mut events, min_x, min_y, max_x, max_y);

    for proj in projectiles.iter_mut() {
        proj.ttl -= dt;
        proj.position += proj.velocity * dt;
        let r = proj.radius;
        if proj.position.x - r < min_x {
            proj.position.x = min_x + r;
            proj.velocity.x = proj.velocity.x.abs();
        } else if proj.position.x + r > max_x {
            proj.position.x = max_x - r;
            proj.velocity.x = -proj.velocity.x.abs();
        }
        if proj.position.y - r < min_y {
            proj.position.y = min_y + r;
            proj.velocity.y = proj.velocity.y.abs();
        } else if proj.position.y + r > max_y {
            proj.position.y = max_y - r;
            proj.velocity.y = -proj.velocity.y.abs();
        }
    }

    detect_impacts(roster, projectiles, &mut events);
    events
}

/// Push overlapping alive pairs apart by half the overlap each and record
/// the contact. The normal is captured before the shift so the resolver
/// sees the geometry that actually collided.
fn separate_overlaps(
    roster: &mut Roster,
    events: &mut StepEvents,
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
) {
    let count = roster.len() as u32;
    for i in 0..count {
        for j in (i + 1)..count {
            let (id_a, id_b) = (EntityId(i), EntityId(j));
            let alive_a = roster.get(id_a).is_some_and(|b| b.is_alive());
            let alive_b = roster.get(id_b).is_some_and(|b| b.is_alive());
            if !alive_a || !alive_b {
                continue;
            }
            let (a, b) = roster.pair_mut(id_a, id_b);
            let delta = b.position - a.position;
            let dist_sq = delta.length_squared();
            if dist_sq == 0.0 {
                continue;
            }
            let dist = dist_sq.sqrt();
            let overlap = (a.radius + b.radius) - dist;
            if overlap <= 0.0 {
                continue;
            }
            let normal = delta * (1.0 / dist);
            let shift = overlap / 2.0;
            a.position -= normal * shift;
            b.position += normal * shift;
            a.position.x = a.position.x.clamp(min_x + a.radius, max_x - a.radius);
            a.position.y = a.position.y.clamp(min_y + a.radius, max_y - a.radius);
            b.position.x = b.position.x.clamp(min_x + b.radius, max_x - b.radius);
            b.position.y = b.position.y.clamp(min_y + b.radius, max_y - b.radius);
            events.contacts.push(Contact {
                a: id_a,
                b: id_b,
                normal,
            });
        }
    }
}

/// Report the first combatant each projectile overlaps.
///
/// The owner is always skipped, as are dead combatants and combatants inside
/// an invulnerability window: a dodged projectile flies on rather than
/// spending itself on a target it cannot hurt.
fn detect_impacts(roster: &Roster, projectiles: &[Projectile], events: &mut StepEvents) {
    for proj in projectiles {
        if proj.expired() {
            continue;
        }
        for ball in roster.iter() {
            if ball.id == proj.owner || !ball.is_alive() || ball.dash.is_invulnerable() {
                continue;
            }
            if proj.overlaps(ball.position, ball.radius) {
                events.impacts.push(Impact {
                    projectile: proj.id,
                    target: ball.id,
                });
                break;
            }
        }
    }
}
