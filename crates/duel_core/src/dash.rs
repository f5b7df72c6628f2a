//! Dash state and timers.
//!
//! A dash is a short velocity burst with its own cooldown. While the dash
//! is active the owner ignores incoming damage and scores critical hits;
//! the invulnerability window runs one tick past the dash itself so a hit
//! landing on the exact end frame still counts as dodged. All times are
//! stored as remaining durations and ticked by the fixed timestep.

use serde::{Deserialize, Serialize};

use crate::config::DashTuning;
use crate::math::Vec2;
use crate::weapons::WeaponClass;

/// Per-combatant dash timers and flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DashState {
    active: bool,
    duration_remaining: f32,
    cooldown_remaining: f32,
    invulnerability_remaining: f32,
    direction: Vec2,
}

impl DashState {
    /// Whether a dash is currently running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether incoming damage is currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability_remaining > 0.0
    }

    /// Whether attacks landed right now score critical damage.
    #[must_use]
    pub fn in_crit_window(&self) -> bool {
        self.active
    }

    /// Seconds until the next dash may start.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// Seconds of invulnerability left.
    #[must_use]
    pub fn invulnerability_remaining(&self) -> f32 {
        self.invulnerability_remaining
    }

    /// Unit direction of the running (or last) dash.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Whether a dash may start right now.
    #[must_use]
    pub fn can_dash(&self) -> bool {
        !self.active && self.cooldown_remaining <= 0.0
    }

    /// Start a dash in `direction` if allowed. Returns whether it started.
    ///
    /// Refused while active, while cooling down, or for a degenerate
    /// direction. On success the caller applies the velocity impulse.
    pub fn try_start(
        &mut self,
        direction: Vec2,
        tuning: &DashTuning,
        class: WeaponClass,
    ) -> bool {
        if !self.can_dash() {
            return false;
        }
        let unit = direction.normalize_or_zero();
        if unit == Vec2::ZERO {
            return false;
        }
        self.active = true;
        self.direction = unit;
        self.duration_remaining = tuning.duration;
        self.invulnerability_remaining = tuning.duration + tuning.invulnerability_buffer;
        self.cooldown_remaining = tuning.cooldown_for(class);
        true
    }

    /// Advance timers by one tick. The dash ends exactly when its duration
    /// runs out, never early.
    pub fn tick(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        self.invulnerability_remaining = (self.invulnerability_remaining - dt).max(0.0);
        if self.active {
            self.duration_remaining -= dt;
            if self.duration_remaining <= 0.0 {
                self.active = false;
                self.duration_remaining = 0.0;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn force_active_for_test(&mut self, duration: f32) {
        self.active = true;
        self.duration_remaining = duration;
        self.invulnerability_remaining = duration + 1.0 / 60.0;
        self.direction = Vec2::new(1.0, 0.0);
    }
}
