//! # Duel Core
//!
//! Deterministic combat-duel simulation core.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded stream per match)
//! - Fixed timestep, fixed iteration order
//!
//! This separation enables:
//! - Seed-reproducible matches (same seed, same fight, bit for bit)
//! - Headless batch simulation
//! - Determinism testing across threads and serialization round-trips
//!
//! ## Crate Structure
//!
//! - [`config`] - Arena, tuning and lifecycle timing parameters
//! - [`entity`] - Combatants and the roster
//! - [`weapons`] - Weapon specs, the registry and attack attempts
//! - [`dash`] - Dash timers, invulnerability and the critical window
//! - [`policy`] - Seeded per-tick decision functions
//! - [`physics`] - Integration, containment and collision detection
//! - [`combat`] - Fixed-order damage and knockback resolution
//! - [`phase`] - Match lifecycle from intro to done
//! - [`sim`] - The per-match orchestrator, [`sim::DuelSim`]
//! - [`snapshot`] - Read-only per-step views for presentation layers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod dash;
pub mod entity;
pub mod error;
pub mod math;
pub mod phase;
pub mod physics;
pub mod policy;
pub mod projectile;
pub mod rng;
pub mod sim;
pub mod snapshot;
pub mod weapons;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        ArenaConfig, BallTuning, DashTuning, MatchConfig, SequenceTiming, Timeout, Timestep,
    };
    pub use crate::entity::{Ball, BallSpawn, EntityId, Roster, TeamId};
    pub use crate::error::{DuelError, Result};
    pub use crate::math::Vec2;
    pub use crate::phase::{MatchPhase, Termination};
    pub use crate::policy::{Intent, PolicyKind};
    pub use crate::projectile::{Projectile, ProjectileId};
    pub use crate::rng::{EntityRng, MatchRng};
    pub use crate::sim::{DuelSim, MatchOutcome, MatchSetup, WinnerInfo};
    pub use crate::snapshot::StepSnapshot;
    pub use crate::weapons::{WeaponClass, WeaponRegistry, WeaponSpec};
}
