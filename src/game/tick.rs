//! Simulation Tick
//!
//! The frame driver. One call to [`tick`] advances the session by one frame
//! at the timestamp it is handed. Within a frame the order is fixed:
//! movement, spawning, combat, abilities, progression, bookkeeping. A death
//! resolved in combat is therefore visible to the same frame's level-up
//! check.
//!
//! [`Simulation`] wraps the state with its configuration and an injected
//! [`Clock`], and is the boundary that validates external keys.

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::clock::{Clock, Millis};
use crate::game::ability::update_abilities;
use crate::game::behavior::update_enemies;
use crate::game::combat::{
    advance_enemy_projectiles, advance_projectiles, auto_fire, decay_flashes, reap_dead,
    resolve_player_contacts, resolve_projectile_hits, tick_burns,
};
use crate::game::entity::Weapon;
use crate::game::error::{SimError, SimResult};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::{InputFrame, UpgradeCategory};
use crate::game::progression::{self, check_level_up, entity_limit, UpgradeCard, UpgradeChoice};
use crate::game::snapshot::{self, StateSnapshot};
use crate::game::spawner::{try_spawn, SpawnConfig};
use crate::game::state::{SessionPhase, SimulationState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the upgrade menu opened this tick
    pub leveled_up: bool,
    /// Whether the player died this tick
    pub game_over: bool,
}

/// Tunables for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Playfield width (px)
    pub field_width: f64,
    /// Playfield height (px)
    pub field_height: f64,
    /// Enemy placement
    pub spawn: SpawnConfig,
    /// Radius of the player's shield bubble
    pub shield_radius: f64,
    /// Distance an enemy is knocked back by the shield
    pub shield_push_distance: f64,
    /// Shield pool drained per knock-back
    pub shield_push_cost: f64,
    /// Extra gap kept between neighbouring enemies
    pub enemy_separation: f64,
    /// Milliseconds between burn ticks
    pub burn_interval_ms: Millis,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            field_width: 1400.0,
            field_height: 1000.0,
            spawn: SpawnConfig::default(),
            shield_radius: 45.0,
            shield_push_distance: 80.0,
            shield_push_cost: 5.0,
            enemy_separation: 5.0,
            burn_interval_ms: 500,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the simulation cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "field must be positive, got {}x{}",
                self.field_width, self.field_height
            )));
        }
        if self.burn_interval_ms <= 0 {
            return Err(SimError::InvalidConfig("burn interval must be positive".into()));
        }
        if self.shield_radius < 0.0 || self.shield_push_cost < 0.0 {
            return Err(SimError::InvalidConfig("shield tuning must not be negative".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TICK
// =============================================================================

/// Run one simulation tick at `now`.
///
/// Paused and finished sessions do not advance: the call returns an empty
/// result and leaves the state untouched.
///
/// # Determinism
///
/// Given the same state, input, config and `now`, the resulting state is
/// identical: entity lists are walked in a fixed order, maps are ordered
/// and every random draw comes from `state.rng`.
pub fn tick(state: &mut SimulationState, input: &InputFrame, config: &SimConfig, now: Millis) -> TickResult {
    let mut result = TickResult::default();
    if state.phase != SessionPhase::Playing {
        return result;
    }

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        tick = state.tick,
        now,
        enemies = state.enemies.len(),
        projectiles = state.projectiles.len(),
        "tick start"
    );

    // 1. Movement
    decay_flashes(state);
    let step = input.displacement(state.player.speed);
    state.player.position = (state.player.position + step).clamp_to_field(
        config.field_width,
        config.field_height,
        state.player.radius,
    );

    // 2. Clock-derived pacing
    state.survival_secs = ((now - state.started_at).max(0) / 1000) as u32;
    state.entity_limit = entity_limit(state.survival_secs);

    // 3. Spawning
    try_spawn(state, config, now);

    // 4. Combat
    auto_fire(state, now);
    advance_projectiles(state, config);
    update_enemies(state, config, now);
    let pushed = resolve_player_contacts(state, config, now);
    resolve_projectile_hits(state, config, now, &pushed);
    reap_dead(state, now);
    tick_burns(state, config, now);
    advance_enemy_projectiles(state, config, now);

    if end_if_dead(state, now) {
        result.game_over = true;
        result.events = state.take_events();
        return result;
    }

    // 5. Abilities
    update_abilities(state, now, config);
    if end_if_dead(state, now) {
        result.game_over = true;
        result.events = state.take_events();
        return result;
    }

    // 6. Progression
    result.leveled_up = check_level_up(state, now);

    // 7. Bookkeeping
    state.clamp_invariants();
    state.tick += 1;
    result.events = state.take_events();
    result
}

/// Finish the session if the player has no health left.
fn end_if_dead(state: &mut SimulationState, now: Millis) -> bool {
    if !state.player.is_dead() {
        return false;
    }
    state.phase = SessionPhase::GameOver;
    state.clamp_invariants();
    state.push_event(
        now,
        GameEventData::GameOver {
            score: state.score,
            level: state.level,
            survival_secs: state.survival_secs,
        },
    );
    info!(
        score = state.score,
        level = state.level,
        survival_secs = state.survival_secs,
        tick = state.tick,
        "game over"
    );
    true
}

/// Replay recorded `(timestamp, input)` frames from a starting state.
///
/// Returns the final state and every event produced along the way.
pub fn replay(
    initial_state: SimulationState,
    frames: &[(Millis, InputFrame)],
    config: &SimConfig,
) -> (SimulationState, Vec<GameEvent>) {
    let mut state = initial_state;
    let mut all_events = Vec::new();

    for (now, input) in frames {
        let result = tick(&mut state, input, config, *now);
        all_events.extend(result.events);
    }

    (state, all_events)
}

// =============================================================================
// SESSION
// =============================================================================

/// A running session: state, config and the clock that drives it.
pub struct Simulation<C: Clock> {
    state: SimulationState,
    config: SimConfig,
    clock: C,
}

impl<C: Clock> Simulation<C> {
    /// Start a session for `weapon_key` at the clock's current time.
    pub fn new(weapon_key: &str, seed: u64, config: SimConfig, clock: C) -> SimResult<Self> {
        let weapon = Weapon::from_key(weapon_key)?;
        config.validate()?;
        let now = clock.now_ms();
        let state = SimulationState::new(weapon, seed, now, &config);
        info!(weapon = weapon.key(), seed, "session started");
        Ok(Self { state, config, clock })
    }

    /// Advance one frame using the clock's current time.
    pub fn tick(&mut self, input: &InputFrame) -> TickResult {
        let now = self.clock.now_ms();
        tick(&mut self.state, input, &self.config, now)
    }

    /// Apply an upgrade from the open menu, by external category and key.
    ///
    /// On error the session is unchanged and stays paused.
    pub fn apply_upgrade(&mut self, category: &str, key: &str) -> SimResult<UpgradeChoice> {
        let outcome = UpgradeCategory::from_key(category)
            .and_then(|category| progression::apply_upgrade(&mut self.state, category, key));
        if let Err(err) = &outcome {
            warn!(category, key, error = %err, "upgrade rejected");
        }
        outcome
    }

    /// Snapshot the full state at the clock's current time.
    pub fn export_state(&self) -> StateSnapshot {
        snapshot::export_state(&self.state, self.clock.now_ms())
    }

    /// Replace the state with an imported snapshot, re-based to now.
    pub fn import_state(&mut self, snapshot: StateSnapshot) -> SimResult<()> {
        self.state = snapshot::import_state(snapshot, self.clock.now_ms())?;
        debug!(tick = self.state.tick, "session resumed from snapshot");
        Ok(())
    }

    /// Read-only view for rendering and UI.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.state.phase
    }

    /// Cards on offer while paused for an upgrade.
    pub fn cards(&self) -> &[UpgradeCard] {
        match &self.state.phase {
            SessionPhase::PausedForUpgrade { cards } => cards,
            _ => &[],
        }
    }

    /// Session config.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The driving clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

// =============================================================================
// TESTS
// =============================================================================
