//! Match configuration.
//!
//! All tunable values are plain serde structs with `#[serde(default)]`
//! fields, so a settings file only needs to name what it changes. The
//! headless driver owns file reading and parsing; the core only validates.
//! Validation runs once, before any match starts, and rejects values that
//! violate documented invariants with the offending field named.

use serde::{Deserialize, Serialize};

use crate::error::{DuelError, Result};
use crate::weapons::{WeaponClass, WeaponSpec};

/// Arena dimensions and wall geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena width in world units.
    pub width: f32,
    /// Arena height in world units.
    pub height: f32,
    /// Thickness of the boundary walls.
    pub wall_thickness: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1920.0,
            wall_thickness: 10.0,
        }
    }
}

impl ArenaConfig {
    /// Interior bounds as (min_x, min_y, max_x, max_y), inset by the walls.
    #[must_use]
    pub fn interior(&self) -> (f32, f32, f32, f32) {
        (
            self.wall_thickness,
            self.wall_thickness,
            self.width - self.wall_thickness,
            self.height - self.wall_thickness,
        )
    }

    /// Whether a circle at `(x, y)` with `radius` fits fully inside the walls.
    #[must_use]
    pub fn contains_circle(&self, x: f32, y: f32, radius: f32) -> bool {
        let (min_x, min_y, max_x, max_y) = self.interior();
        x - radius >= min_x && y - radius >= min_y && x + radius <= max_x && y + radius <= max_y
    }
}

/// Dash mechanic tuning.
///
/// The defaults implement the canonical variant: invulnerability for the
/// dash window plus critical hits on attacks landed while dashing, with a
/// class-dependent cooldown. The documented alternatives are reachable by
/// configuration: set `crit_multiplier` to 1.0 for the plain-evasion
/// variant, or `cooldown_ranged` equal to `cooldown_melee` for the flat
/// cooldown variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    /// Velocity impulse magnitude applied on dash start.
    pub speed: f32,
    /// How long the dash stays active, in seconds.
    pub duration: f32,
    /// Extra invulnerability past the dash duration, in seconds.
    pub invulnerability_buffer: f32,
    /// Dash cooldown for melee-weapon owners, in seconds.
    pub cooldown_melee: f32,
    /// Dash cooldown for ranged-weapon owners, in seconds.
    pub cooldown_ranged: f32,
    /// Damage multiplier for attacks landed during the dash window.
    pub crit_multiplier: f32,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            speed: 800.0,
            duration: 0.2,
            invulnerability_buffer: 1.0 / 60.0,
            cooldown_melee: 3.0,
            cooldown_ranged: 6.0,
            crit_multiplier: 2.0,
        }
    }
}

impl DashTuning {
    /// Dash cooldown for the given weapon class.
    #[must_use]
    pub fn cooldown_for(&self, class: WeaponClass) -> f32 {
        match class {
            WeaponClass::Melee => self.cooldown_melee,
            WeaponClass::Ranged => self.cooldown_ranged,
        }
    }
}

/// Combatant body tuning applied to every ball at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallTuning {
    /// Body radius.
    pub radius: f32,
    /// Maximum (and starting) health.
    pub max_health: f32,
    /// Speed cap applied after every integration step.
    pub max_speed: f32,
    /// Knockback resistance in [0, 1); 0 means full knockback received.
    pub knockback_resistance: f32,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            radius: 30.0,
            max_health: 100.0,
            max_speed: 400.0,
            knockback_resistance: 0.0,
        }
    }
}

/// End-sequence timing constants, all in seconds except the rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTiming {
    /// Intro hold before combat starts.
    pub intro: f32,
    /// Freeze-frame hold on the final hit.
    pub freeze: f32,
    /// Slow-motion playback rate relative to real time.
    pub slowmo_rate: f32,
    /// Real-time length of the slow-motion replay.
    pub slowmo_duration: f32,
    /// Winner banner display time.
    pub banner: f32,
    /// Fade-out to the loop-ready black frame.
    pub fade: f32,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            intro: 1.0,
            freeze: 0.12,
            slowmo_rate: 0.35,
            slowmo_duration: 0.6,
            banner: 2.0,
            fade: 0.4,
        }
    }
}

/// Complete immutable configuration for one match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Arena geometry.
    pub arena: ArenaConfig,
    /// Fixed simulation timestep in seconds.
    pub timestep: Timestep,
    /// Maximum combat duration in seconds before `NoWinnerTimeout`.
    pub timeout: Timeout,
    /// Dash tuning.
    pub dash: DashTuning,
    /// Combatant body tuning.
    pub ball: BallTuning,
    /// Intro and end-sequence timings.
    pub sequence: SequenceTiming,
    /// Per-weapon parameter overrides, matched to registry entries by name.
    pub weapon_overrides: Vec<WeaponSpec>,
}

/// Newtype default for the fixed timestep (1/60 s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestep(pub f32);

impl Default for Timestep {
    fn default() -> Self {
        Self(1.0 / 60.0)
    }
}

/// Newtype default for the combat timeout (120 s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeout(pub f32);

impl Default for Timeout {
    fn default() -> Self {
        Self(120.0)
    }
}

impl MatchConfig {
    /// Validate every documented invariant, naming the offending field.
    ///
    /// Called by match construction; drivers loading settings files should
    /// call it immediately after parsing so bad values fail before any
    /// simulation state exists.
    pub fn validate(&self) -> Result<()> {
        if self.timestep.0 <= 0.0 {
            return Err(DuelError::malformed("timestep", "must be positive"));
        }
        if self.timeout.0 <= 0.0 {
            return Err(DuelError::malformed("timeout", "must be positive"));
        }
        if self.arena.width <= 0.0 || self.arena.height <= 0.0 {
            return Err(DuelError::malformed(
                "arena",
                "width and height must be positive",
            ));
        }
        if self.arena.wall_thickness < 0.0 {
            return Err(DuelError::malformed(
                "arena.wall_thickness",
                "must be non-negative",
            ));
        }
        let usable_w = self.arena.width - 2.0 * self.arena.wall_thickness;
        let usable_h = self.arena.height - 2.0 * self.arena.wall_thickness;
        if usable_w < 4.0 * self.ball.radius || usable_h < 4.0 * self.ball.radius {
            return Err(DuelError::malformed(
                "arena",
                "interior too small for two combatants",
            ));
        }
        if self.ball.radius <= 0.0 {
            return Err(DuelError::malformed("ball.radius", "must be positive"));
        }
        if self.ball.max_health <= 0.0 {
            return Err(DuelError::malformed("ball.max_health", "must be positive"));
        }
        if self.ball.max_speed <= 0.0 {
            return Err(DuelError::malformed("ball.max_speed", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.ball.knockback_resistance) {
            return Err(DuelError::malformed(
                "ball.knockback_resistance",
                "must be in [0, 1)",
            ));
        }
        if self.dash.speed <= 0.0 || self.dash.duration <= 0.0 {
            return Err(DuelError::malformed(
                "dash",
                "speed and duration must be positive",
            ));
        }
        if self.dash.invulnerability_buffer < 0.0 {
            return Err(DuelError::malformed(
                "dash.invulnerability_buffer",
                "must be non-negative",
            ));
        }
        if self.dash.cooldown_melee <= 0.0 {
            return Err(DuelError::malformed(
                "dash.cooldown_melee",
                "must be positive",
            ));
        }
        if self.dash.cooldown_ranged < self.dash.cooldown_melee {
            return Err(DuelError::malformed(
                "dash.cooldown_ranged",
                "must be at least the melee cooldown",
            ));
        }
        if !(1.0..=2.0).contains(&self.dash.crit_multiplier) {
            return Err(DuelError::malformed(
                "dash.crit_multiplier",
                "must be in [1.0, 2.0]",
            ));
        }
        let t = &self.sequence;
        if t.intro < 0.0 || t.freeze < 0.0 || t.slowmo_duration < 0.0 || t.banner < 0.0
            || t.fade < 0.0
        {
            return Err(DuelError::malformed(
                "sequence",
                "phase durations must be non-negative",
            ));
        }
        if t.slowmo_rate <= 0.0 || t.slowmo_rate > 1.0 {
            return Err(DuelError::malformed(
                "sequence.slowmo_rate",
                "must be in (0, 1]",
            ));
        }
        for spec in &self.weapon_overrides {
            spec.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.timestep.0 - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(config.timeout.0, 120.0);
        assert_eq!(config.arena.width, 1080.0);
        assert_eq!(config.arena.height, 1920.0);
    }

    #[test]
    fn test_negative_timestep_rejected() {
        let mut config = MatchConfig::default();
        config.timestep = Timestep(0.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timestep"));
    }

    #[test]
    fn test_flat_cooldown_variant_allowed() {
        let mut config = MatchConfig::default();
        config.dash.cooldown_ranged = config.dash.cooldown_melee;
        assert!(config.validate().is_ok());

        config.dash.cooldown_ranged = config.dash.cooldown_melee - 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_crit_multiplier_range() {
        let mut config = MatchConfig::default();
        config.dash.crit_multiplier = 1.0;
        assert!(config.validate().is_ok());
        config.dash.crit_multiplier = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_settings_take_defaults() {
        // Settings files only name what they change.
        let config: MatchConfig =
            serde_json::from_str(r#"{ "timeout": 30.0, "arena": { "width": 500.0 } }"#)
                .expect("parse");
        assert_eq!(config.timeout.0, 30.0);
        assert_eq!(config.arena.width, 500.0);
        assert_eq!(config.arena.height, 1920.0);
        assert_eq!(config.dash.speed, 800.0);
    }

    #[test]
    fn test_contains_circle() {
        let arena = ArenaConfig::default();
        assert!(arena.contains_circle(540.0, 960.0, 30.0));
        assert!(!arena.contains_circle(20.0, 960.0, 30.0));
        assert!(!arena.contains_circle(540.0, 1915.0, 30.0));
    }
}
