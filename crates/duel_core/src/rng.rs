//! Deterministic random number service.
//!
//! One master ChaCha8 stream is seeded exactly once per match from the
//! run's seed. Per-entity sub-streams are split off the master at setup
//! in fixed roster order, so each combatant's stochastic behavior (dodge
//! bias, strafe jitter) is independently reproducible while the match as
//! a whole stays a pure function of the seed. Reseeding mid-match is
//! forbidden; there is no other entropy source in the crate.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Master random stream for one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRng {
    seed: u64,
    master: ChaCha8Rng,
}

impl MatchRng {
    /// Seed the master stream from the run's seed value.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            master: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this stream was created from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Split an independent sub-stream off the master.
    ///
    /// Call order matters: sub-streams must be split in fixed roster
    /// order during setup so the draw sequence is identical per seed.
    pub fn split(&mut self) -> EntityRng {
        EntityRng {
            stream: ChaCha8Rng::seed_from_u64(self.master.gen()),
        }
    }

    /// Uniform draw in `[lo, hi)` from the master stream.
    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        self.master.gen_range(lo..hi)
    }
}

/// Per-entity random sub-stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRng {
    stream: ChaCha8Rng,
}

impl EntityRng {
    /// Uniform draw in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        self.stream.gen_range(lo..hi)
    }

    /// Symmetric jitter draw in `[-spread, spread)`.
    pub fn jitter(&mut self, spread: f32) -> f32 {
        self.stream.gen_range(-spread..spread)
    }
}
