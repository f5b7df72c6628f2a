//! The match simulation.
//!
//! [`DuelSim`] owns everything one match needs: the roster, live
//! projectiles, the RNG streams, the phase clock and the trailing snapshot
//! buffer. `step()` advances exactly one fixed timestep; an outer loop owns
//! pacing and calls it synchronously. Within a combat step the resolution
//! order is fixed: intents, movement, dash impulses, attacks, physics,
//! projectile impacts, contact knockback, then timers and the winner check.
//! Nothing here reads the wall clock or any entropy source beyond the
//! seeded streams, so a seed and a configuration fully determine the match.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat;
use crate::config::{MatchConfig, Timeout};
use crate::entity::{BallSpawn, EntityId, Roster, TeamId};
use crate::error::{DuelError, Result};
use crate::math::Vec2;
use crate::phase::{MatchPhase, PhaseClock, Termination};
use crate::physics;
use crate::policy::{self, Intent, PolicyContext, PolicyKind};
use crate::projectile::{Projectile, ProjectileId, ProjectileSpawn};
use crate::rng::{EntityRng, MatchRng};
use crate::snapshot::{LastHit, StepSnapshot};
use crate::weapons::WeaponRegistry;

/// Everything a driver supplies to start one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSetup {
    /// Run seed; the sole source of randomness.
    pub seed: u64,
    /// Weapon fielded by the left side (team 0).
    pub left_weapon: String,
    /// Weapon fielded by the right side (team 1).
    pub right_weapon: String,
    /// Combatants per side; 1 is a duel.
    #[serde(default = "default_per_side")]
    pub per_side: usize,
    /// Replaces the configured combat timeout when set, in seconds.
    #[serde(default)]
    pub timeout_override: Option<f32>,
}

fn default_per_side() -> usize {
    1
}

impl MatchSetup {
    /// A plain one-on-one setup.
    #[must_use]
    pub fn duel(seed: u64, left_weapon: &str, right_weapon: &str) -> Self {
        Self {
            seed,
            left_weapon: left_weapon.to_string(),
            right_weapon: right_weapon.to_string(),
            per_side: 1,
            timeout_override: None,
        }
    }

    /// Lay out the spawn formation: sides face each other across the
    /// arena's vertical centre line, teammates stacked above and below it.
    /// Behaviour styles come from the weapon matchup.
    ///
    /// # Errors
    ///
    /// [`DuelError::UnknownWeapon`] for an unregistered weapon name and
    /// [`DuelError::InvalidSpawnConfiguration`] for a zero side size.
    pub fn spawns(
        &self,
        registry: &WeaponRegistry,
        config: &MatchConfig,
    ) -> Result<Vec<BallSpawn>> {
        if self.per_side == 0 {
            return Err(DuelError::InvalidSpawnConfiguration(
                "per_side must be at least 1".to_string(),
            ));
        }
        let left = registry
            .get(&self.left_weapon)
            .ok_or_else(|| DuelError::UnknownWeapon {
                name: self.left_weapon.clone(),
            })?;
        let right = registry
            .get(&self.right_weapon)
            .ok_or_else(|| DuelError::UnknownWeapon {
                name: self.right_weapon.clone(),
            })?;
        let sides = [
            (&self.left_weapon, PolicyKind::for_matchup(left, right), 0.3),
            (&self.right_weapon, PolicyKind::for_matchup(right, left), 0.7),
        ];

        let spacing = 4.0 * config.ball.radius;
        let mut spawns = Vec::with_capacity(self.per_side * 2);
        for (team, (weapon, policy, x_frac)) in sides.into_iter().enumerate() {
            for i in 0..self.per_side {
                let offset = (i as f32 - (self.per_side as f32 - 1.0) / 2.0) * spacing;
                let name = if self.per_side == 1 {
                    weapon.clone()
                } else {
                    format!("{weapon} {}", i + 1)
                };
                spawns.push(BallSpawn {
                    name,
                    team: TeamId(team as u8),
                    weapon: weapon.clone(),
                    position: Vec2::new(
                        config.arena.width * x_frac,
                        config.arena.height / 2.0 + offset,
                    ),
                    facing: None,
                    policy,
                });
            }
        }
        Ok(spawns)
    }
}

/// The side that won, with the weapon it fielded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerInfo {
    /// Winning side.
    pub team: TeamId,
    /// Weapon the winning side fielded.
    pub weapon: String,
}

/// Final record of one match, for the driver and the batch reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Seed the match ran with.
    pub seed: u64,
    /// Winning side, absent on a no-winner termination.
    pub winner: Option<WinnerInfo>,
    /// Why the match ended.
    pub termination: Termination,
    /// Combat-clock seconds elapsed when the match was decided.
    pub elapsed_seconds: f32,
    /// Combat ticks executed.
    pub ticks: u64,
    /// Hash of the final simulation state, for determinism audits.
    pub state_hash: u64,
}

/// One deterministic match from intro to done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelSim {
    config: MatchConfig,
    roster: Roster,
    projectiles: Vec<Projectile>,
    rng: MatchRng,
    entity_rngs: Vec<EntityRng>,
    clock: PhaseClock,
    tick: u64,
    elapsed: f32,
    timeout_ticks: u64,
    next_projectile: u32,
    last_hit: Option<LastHit>,
    termination: Option<Termination>,
    replay: VecDeque<StepSnapshot>,
    replay_capacity: usize,
}

impl DuelSim {
    /// Build a match from a driver setup.
    ///
    /// # Errors
    ///
    /// Fails fast, before any simulation state exists: configuration
    /// violations, unknown weapons and bad spawn geometry all abort here.
    pub fn new(setup: &MatchSetup, registry: &WeaponRegistry, config: MatchConfig) -> Result<Self> {
        let mut config = config;
        if let Some(timeout) = setup.timeout_override {
            if timeout <= 0.0 {
                return Err(DuelError::malformed("timeout", "must be positive"));
            }
            config.timeout = Timeout(timeout);
        }
        config.validate()?;
        let mut registry = registry.clone();
        registry.apply_overrides(&config.weapon_overrides)?;
        let spawns = setup.spawns(&registry, &config)?;
        Self::from_spawns(setup.seed, &spawns, &registry, config)
    }

    /// Build a match from explicit spawn descriptions.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DuelSim::new`].
    pub fn from_spawns(
        seed: u64,
        spawns: &[BallSpawn],
        registry: &WeaponRegistry,
        config: MatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut registry = registry.clone();
        registry.apply_overrides(&config.weapon_overrides)?;
        let roster = Roster::from_spawns(spawns, &registry, &config)?;

        // Sub-streams split in roster order, once, before the first step.
        let mut rng = MatchRng::from_seed(seed);
        let entity_rngs = (0..roster.len()).map(|_| rng.split()).collect();

        let dt = config.timestep.0;
        let timeout_ticks = (config.timeout.0 / dt).round() as u64;
        let clock = PhaseClock::new(config.sequence, config.timeout.0);
        let tail = config.sequence.slowmo_duration * config.sequence.slowmo_rate;
        let replay_capacity = ((tail / dt).ceil() as usize + 1).max(2);

        Ok(Self {
            config,
            roster,
            projectiles: Vec::new(),
            rng,
            entity_rngs,
            clock,
            tick: 0,
            elapsed: 0.0,
            timeout_ticks,
            next_projectile: 0,
            last_hit: None,
            termination: None,
            replay: VecDeque::with_capacity(replay_capacity),
            replay_capacity,
        })
    }

    /// Seed the match runs with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Combat ticks executed so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Combat-clock seconds elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.clock.phase()
    }

    /// Whether the match has reached its terminal phase.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.clock.phase().is_terminal()
    }

    /// The combatants.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Live projectiles in id order.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// How the match ended, once combat has terminated.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// The most recent landed hit.
    #[must_use]
    pub fn last_hit(&self) -> Option<LastHit> {
        self.last_hit
    }

    /// The configuration the match runs with.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Jump from the intro straight into combat.
    pub fn skip_intro(&mut self) {
        self.clock.skip_intro();
    }

    /// Snapshot the current state for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot::capture(
            self.tick,
            self.elapsed,
            &self.clock,
            &self.roster,
            &self.projectiles,
            self.last_hit,
        )
    }

    /// Trailing combat snapshots covering the slow-motion replay window,
    /// oldest first.
    pub fn replay_window(&self) -> impl Iterator<Item = &StepSnapshot> {
        self.replay.iter()
    }

    /// Advance exactly one fixed timestep.
    ///
    /// Outside combat only the phase clock moves: the world stays frozen
    /// through the intro and the end sequence, and `Done` is absorbing.
    pub fn step(&mut self) {
        match self.clock.phase() {
            MatchPhase::Combat => self.step_combat(),
            MatchPhase::Done => {}
            _ => self.clock.advance(self.config.timestep.0),
        }
    }

    /// Run until the terminal phase and report the outcome.
    ///
    /// Combat is bounded by the timeout tick count and every other phase
    /// by its configured duration, so this always returns.
    pub fn run_to_completion(&mut self) -> MatchOutcome {
        while !self.clock.phase().is_terminal() {
            self.step();
        }
        self.build_outcome(self.termination.unwrap_or(Termination::NoWinnerTimeout))
    }

    /// Final record, available once combat has terminated.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.termination.map(|t| self.build_outcome(t))
    }

    fn build_outcome(&self, termination: Termination) -> MatchOutcome {
        let winner = termination.winner().map(|team| WinnerInfo {
            team,
            weapon: self
                .roster
                .iter()
                .find(|b| b.team == team && b.is_alive())
                .or_else(|| self.roster.iter().find(|b| b.team == team))
                .map(|b| b.weapon.spec().name.clone())
                .unwrap_or_default(),
        });
        MatchOutcome {
            seed: self.rng.seed(),
            winner,
            termination,
            elapsed_seconds: self.elapsed,
            ticks: self.tick,
            state_hash: self.state_hash(),
        }
    }

    fn step_combat(&mut self) {
        let dt = self.config.timestep.0;

        // Intents in id order. Dead combatants receive none; a combatant
        // with no living opponent idles until the winner check below ends
        // the match.
        let mut intents: Vec<(EntityId, Intent)> = Vec::with_capacity(self.roster.len());
        for ball in self.roster.iter() {
            if !ball.is_alive() {
                continue;
            }
            let enemy = self
                .roster
                .nearest_enemy(ball.id)
                .and_then(|id| self.roster.get(id));
            let intent = match enemy {
                Some(enemy) => {
                    let ctx = PolicyContext {
                        me: ball,
                        enemy,
                        projectiles: &self.projectiles,
                        arena_width: self.config.arena.width,
                    };
                    policy::decide(&ctx, &mut self.entity_rngs[ball.id.0 as usize])
                }
                None => Intent::idle(ball.facing),
            };
            intents.push((ball.id, intent));
        }

        // Movement inputs.
        for (id, intent) in &intents {
            if let Some(ball) = self.roster.get_mut(*id) {
                let facing = intent.facing.normalize_or_zero();
                if facing != Vec2::ZERO {
                    ball.facing = facing;
                }
                ball.velocity += intent.accel * dt;
            }
        }

        // Fixed resolution order: dash impulses, then attacks, then the
        // physics step whose collision events feed impacts and contact
        // knockback.
        combat::apply_dash_impulses(&mut self.roster, &intents, &self.config.dash);
        let attacks = combat::resolve_attacks(
            &mut self.roster,
            &intents,
            self.config.dash.crit_multiplier,
        );
        for spawn in &attacks.spawns {
            self.spawn_projectile(spawn);
        }

        let events = physics::step(
            &mut self.roster,
            &mut self.projectiles,
            dt,
            &self.config.arena,
            &self.config.ball,
        );
        let impacts = combat::resolve_impacts(
            &mut self.roster,
            &self.projectiles,
            &events.impacts,
            self.config.dash.crit_multiplier,
        );
        combat::apply_contact_knockback(&mut self.roster, &events.contacts);

        let destroyed = impacts.destroyed;
        self.projectiles
            .retain(|p| !p.expired() && !destroyed.contains(&p.id));

        // Cooldowns advance at the end of the step, so an attack resolves
        // against the value the step started with.
        for ball in self.roster.iter_mut() {
            if !ball.is_alive() {
                continue;
            }
            ball.weapon.tick(dt);
            ball.dash.tick(dt);
        }

        self.tick += 1;
        self.elapsed += dt;
        self.clock.advance(dt);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "combat step resolved");
        }

        for event in attacks.events.iter().chain(impacts.events.iter()) {
            self.last_hit = Some(LastHit {
                target: event.target,
                attacker: event.attacker,
                time: self.elapsed,
                critical: event.critical,
            });
        }

        if let Some(team) = self.roster.winning_team() {
            self.termination = Some(Termination::Winner(team));
            self.clock.begin_end_sequence();
        } else if self.roster.alive_ids().is_empty() {
            // Both sides fell on the same tick; nobody is left to banner.
            self.termination = Some(Termination::NoWinnerTimeout);
            self.clock.finish();
        } else if self.tick >= self.timeout_ticks {
            self.termination = Some(Termination::NoWinnerTimeout);
            self.clock.finish();
        }

        let snap = self.snapshot();
        if self.replay.len() == self.replay_capacity {
            self.replay.pop_front();
        }
        self.replay.push_back(snap);
    }

    fn spawn_projectile(&mut self, spawn: &ProjectileSpawn) {
        let id = ProjectileId(self.next_projectile);
        self.next_projectile += 1;
        self.projectiles.push(Projectile {
            id,
            owner: spawn.owner,
            team: spawn.team,
            position: spawn.position,
            velocity: spawn.velocity,
            radius: spawn.radius,
            damage: spawn.damage,
            knockback: spawn.knockback,
            ttl: spawn.ttl,
            spin: spawn.spin,
        });
    }

    /// Order-sensitive hash of the dynamic state, folded over the exact
    /// bit patterns of every float, so two runs agree only when they are
    /// bit-identical.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.tick.hash(&mut h);
        self.elapsed.to_bits().hash(&mut h);
        for ball in self.roster.iter() {
            ball.id.0.hash(&mut h);
            ball.position.x.to_bits().hash(&mut h);
            ball.position.y.to_bits().hash(&mut h);
            ball.velocity.x.to_bits().hash(&mut h);
            ball.velocity.y.to_bits().hash(&mut h);
            ball.facing.x.to_bits().hash(&mut h);
            ball.facing.y.to_bits().hash(&mut h);
            ball.health.to_bits().hash(&mut h);
            ball.weapon.cooldown_remaining().to_bits().hash(&mut h);
            ball.dash.is_active().hash(&mut h);
            ball.dash.cooldown_remaining().to_bits().hash(&mut h);
            ball.dash.invulnerability_remaining().to_bits().hash(&mut h);
        }
        for proj in &self.projectiles {
            proj.id.0.hash(&mut h);
            proj.position.x.to_bits().hash(&mut h);
            proj.position.y.to_bits().hash(&mut h);
            proj.velocity.x.to_bits().hash(&mut h);
            proj.velocity.y.to_bits().hash(&mut h);
            proj.ttl.to_bits().hash(&mut h);
        }
        h.finish()
    }

    /// Serialize the full match state.
    ///
    /// # Errors
    ///
    /// [`DuelError::InvalidState`] when encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| DuelError::InvalidState(format!("serialize: {e}")))
    }

    /// Restore a match from [`DuelSim::to_bytes`] output.
    ///
    /// # Errors
    ///
    /// [`DuelError::InvalidState`] when the bytes do not decode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| DuelError::InvalidState(format!("deserialize: {e}")))
    }
}
