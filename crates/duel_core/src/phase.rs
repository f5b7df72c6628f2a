//! Match lifecycle phases.
//!
//! A match runs `Intro -> Combat -> Freeze -> Slowmo -> Banner -> Fade ->
//! Done`. Combat is the only phase without a fixed length: it ends when the
//! simulation reports a winner (on to `Freeze`) or hits the timeout
//! (straight to `Done`). No phase is ever revisited; restarting means a
//! fresh match. The clock performs no I/O and only exposes the current
//! phase and a 0..1 progress ratio for the presentation layer.

use serde::{Deserialize, Serialize};

use crate::config::SequenceTiming;
use crate::entity::TeamId;

/// Lifecycle phase of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Pre-combat hold; combatants are frozen in place.
    Intro,
    /// Live simulation.
    Combat,
    /// Freeze-frame on the final hit.
    Freeze,
    /// Slow-motion replay of the final moments, in real time.
    Slowmo,
    /// Winner banner display.
    Banner,
    /// Fade to the loop-ready black frame.
    Fade,
    /// Terminal; the match can be dropped or looped.
    Done,
}

impl MatchPhase {
    /// Whether the match is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Intro => "intro",
            Self::Combat => "combat",
            Self::Freeze => "freeze",
            Self::Slowmo => "slowmo",
            Self::Banner => "banner",
            Self::Fade => "fade",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// One side outlived the other.
    Winner(TeamId),
    /// The timeout elapsed with no winner, or both sides fell together.
    /// A defined outcome the driver must handle, not an error.
    NoWinnerTimeout,
}

impl Termination {
    /// The winning side, if there is one.
    #[must_use]
    pub fn winner(self) -> Option<TeamId> {
        match self {
            Self::Winner(team) => Some(team),
            Self::NoWinnerTimeout => None,
        }
    }
}

/// Drives the phase sequence off the simulation's `advance(dt)` calls.
///
/// Timed phases flip over when their configured duration elapses. Combat
/// never flips on its own: the simulation calls [`PhaseClock::begin_end_sequence`]
/// on a win and [`PhaseClock::finish`] on a no-winner termination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseClock {
    phase: MatchPhase,
    in_phase: f32,
    timing: SequenceTiming,
    timeout: f32,
}

impl PhaseClock {
    /// Clock at the start of a fresh match. A zero intro duration starts
    /// directly in combat.
    #[must_use]
    pub fn new(timing: SequenceTiming, timeout: f32) -> Self {
        let phase = if timing.intro > 0.0 {
            MatchPhase::Intro
        } else {
            MatchPhase::Combat
        };
        Self {
            phase,
            in_phase: 0.0,
            timing,
            timeout,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Seconds spent in the current phase.
    #[must_use]
    pub fn in_phase(&self) -> f32 {
        self.in_phase
    }

    /// Progress through the current phase in [0, 1]. Combat progress runs
    /// against the timeout; Done always reports 1.
    #[must_use]
    pub fn progress(&self) -> f32 {
        let total = match self.phase {
            MatchPhase::Intro => self.timing.intro,
            MatchPhase::Combat => self.timeout,
            MatchPhase::Freeze => self.timing.freeze,
            MatchPhase::Slowmo => self.timing.slowmo_duration,
            MatchPhase::Banner => self.timing.banner,
            MatchPhase::Fade => self.timing.fade,
            MatchPhase::Done => return 1.0,
        };
        if total <= 0.0 {
            return 1.0;
        }
        (self.in_phase / total).min(1.0)
    }

    /// Jump from the intro straight into combat. No-op in any other phase.
    pub fn skip_intro(&mut self) {
        if self.phase == MatchPhase::Intro {
            self.enter(MatchPhase::Combat);
        }
    }

    /// A winner is decided: leave combat for the end sequence.
    pub fn begin_end_sequence(&mut self) {
        if self.phase == MatchPhase::Combat {
            self.enter(MatchPhase::Freeze);
        }
    }

    /// Terminate without a winner; the end sequence is skipped entirely.
    pub fn finish(&mut self) {
        self.enter(MatchPhase::Done);
    }

    /// Advance the phase timer; timed phases flip over when they elapse.
    pub fn advance(&mut self, dt: f32) {
        self.in_phase += dt;
        let (total, next) = match self.phase {
            MatchPhase::Intro => (self.timing.intro, MatchPhase::Combat),
            MatchPhase::Freeze => (self.timing.freeze, MatchPhase::Slowmo),
            MatchPhase::Slowmo => (self.timing.slowmo_duration, MatchPhase::Banner),
            MatchPhase::Banner => (self.timing.banner, MatchPhase::Fade),
            MatchPhase::Fade => (self.timing.fade, MatchPhase::Done),
            MatchPhase::Combat | MatchPhase::Done => return,
        };
        if self.in_phase >= total {
            self.enter(next);
        }
    }

    fn enter(&mut self, phase: MatchPhase) {
        self.phase = phase;
        self.in_phase = 0.0;
    }
}
