//! Simulation State
//!
//! Everything the simulation owns, in one explicit value passed to every
//! phase of the tick. Maps use BTreeMap so iteration (ability triggers,
//! hashing) is ordered the same way on every run.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::clock::Millis;
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityId, Summon};
use crate::game::effects::ActiveEffects;
use crate::game::entity::{Enemy, EnemyKind, EnemyProjectile, EntityId, Projectile, Weapon, DAMAGE_FLASH_MS};
use crate::game::events::{EventBuffer, GameEvent, GameEventData};
use crate::game::progression::{self, initial_stat_levels, StatKind, UpgradeCard};
use crate::game::tick::SimConfig;
use crate::MAX_VISUAL_EVENTS;

/// Player collision radius.
pub const PLAYER_RADIUS: f64 = 15.0;

/// Player movement speed before upgrades (px per tick).
pub const PLAYER_BASE_SPEED: f64 = 2.2;

/// Player health before upgrades.
pub const PLAYER_BASE_HEALTH: f64 = 100.0;

// =============================================================================
// PLAYER
// =============================================================================

/// Owned ability: level plus last trigger time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    /// 1..=3; 0 means not owned
    pub level: u8,
    /// Last trigger (None = eligible immediately)
    pub last_used: Option<Millis>,
}

/// The player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Centre position
    pub position: Vec2,

    /// Collision radius
    pub radius: f64,

    /// Movement speed (px per tick)
    pub speed: f64,

    /// Current health
    pub health: f64,

    /// Maximum health
    pub max_health: f64,

    /// Damage per shot before buffs
    pub damage: f64,

    /// Shots per second
    pub fire_rate: f64,

    /// Projectile range (px)
    pub range: f64,

    /// Time of the last shot (None = never fired)
    pub last_shot: Option<Millis>,

    /// Remaining damage-flash time (ms)
    pub damage_flash: f64,

    /// The session's weapon
    pub weapon: Weapon,

    /// Stat upgrade levels (0..=5)
    pub upgrades: BTreeMap<StatKind, u8>,

    /// Owned abilities
    pub abilities: BTreeMap<AbilityId, AbilitySlot>,

    /// Active timed buffs
    pub effects: ActiveEffects,
}

impl PlayerState {
    /// Fresh player carrying `weapon`.
    pub fn new(weapon: Weapon, position: Vec2) -> Self {
        let stats = weapon.stats();
        Self {
            position,
            radius: PLAYER_RADIUS,
            speed: PLAYER_BASE_SPEED,
            health: PLAYER_BASE_HEALTH,
            max_health: PLAYER_BASE_HEALTH,
            damage: stats.damage,
            fire_rate: stats.fire_rate,
            range: stats.range,
            last_shot: None,
            damage_flash: 0.0,
            weapon,
            upgrades: initial_stat_levels(),
            abilities: BTreeMap::new(),
            effects: ActiveEffects::new(),
        }
    }

    /// Level of a stat upgrade.
    pub fn stat_level(&self, kind: StatKind) -> u8 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Level of an ability (0 if not owned).
    pub fn ability_level(&self, id: AbilityId) -> u8 {
        self.abilities.get(&id).map_or(0, |slot| slot.level)
    }

    /// Lose `amount` health and start the damage flash.
    #[inline]
    pub fn take_damage(&mut self, amount: f64) {
        self.health -= amount;
        self.damage_flash = DAMAGE_FLASH_MS;
    }

    /// Health at or below zero.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Add player state to hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_f64(self.speed);
        hasher.update_f64(self.health);
        hasher.update_f64(self.max_health);
        hasher.update_f64(self.damage);
        hasher.update_f64(self.fire_rate);
        hasher.update_f64(self.range);
        hasher.update_opt_i64(self.last_shot);
        hasher.update_str(self.weapon.key());
        for (kind, level) in &self.upgrades {
            hasher.update_str(kind.key());
            hasher.update_u8(*level);
        }
        for (id, slot) in &self.abilities {
            hasher.update_str(id.key());
            hasher.update_u8(slot.level);
            hasher.update_opt_i64(slot.last_used);
        }
        hasher.update_u32(self.effects.len() as u32);
        for effect in self.effects.iter() {
            hasher.update_u8(effect.kind() as u8);
            hasher.update_opt_i64(effect.expires_at());
        }
    }
}

// =============================================================================
// SESSION PHASE
// =============================================================================

/// Where the session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Simulation advancing
    #[default]
    Playing,
    /// Frozen until an upgrade is chosen
    PausedForUpgrade {
        /// Offered cards (1..=3)
        cards: Vec<UpgradeCard>,
    },
    /// Player died
    GameOver,
}

impl SessionPhase {
    fn tag(&self) -> u8 {
        match self {
            SessionPhase::Playing => 0,
            SessionPhase::PausedForUpgrade { .. } => 1,
            SessionPhase::GameOver => 2,
        }
    }
}

// =============================================================================
// SIMULATION STATE
// =============================================================================

/// Complete simulation state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationState {
    /// Lifecycle phase
    pub phase: SessionPhase,

    /// Ticks simulated while playing
    pub tick: u64,

    /// Clock time the session started
    pub started_at: Millis,

    /// Whole seconds survived
    pub survival_secs: u32,

    /// Current enemy population cap
    pub entity_limit: usize,

    /// The player
    pub player: PlayerState,

    /// Live enemies, in spawn order
    pub enemies: Vec<Enemy>,

    /// Player projectiles
    pub projectiles: Vec<Projectile>,

    /// Enemy projectiles
    pub enemy_projectiles: Vec<EnemyProjectile>,

    /// Ability sub-entities
    pub summons: Vec<Summon>,

    /// Total score
    pub score: u64,

    /// XP toward the next level
    pub xp: u64,

    /// Player level
    pub level: u32,

    /// XP needed for the next level
    pub next_level_xp: u64,

    /// Kills since the player last took damage.
    ///
    /// Counts every reaped death, whether the killing blow came from a
    /// projectile, an ability, a summon or a burn.
    pub kill_streak: u32,

    /// Time of the last spawn wave (None = spawn immediately)
    pub last_spawn: Option<Millis>,

    /// Next entity id
    pub next_id: EntityId,

    /// Deterministic RNG
    pub rng: DeterministicRng,

    /// Events emitted this tick (not persisted)
    #[serde(skip)]
    events: EventBuffer,
}

impl SimulationState {
    /// Start a session at `now`.
    pub fn new(weapon: Weapon, seed: u64, now: Millis, config: &SimConfig) -> Self {
        let centre = Vec2::new(config.field_width / 2.0, config.field_height / 2.0);
        Self {
            phase: SessionPhase::Playing,
            tick: 0,
            started_at: now,
            survival_secs: 0,
            entity_limit: progression::entity_limit(0),
            player: PlayerState::new(weapon, centre),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            enemy_projectiles: Vec::new(),
            summons: Vec::new(),
            score: 0,
            xp: 0,
            level: 1,
            next_level_xp: progression::next_level_xp(1),
            kill_streak: 0,
            last_spawn: None,
            next_id: 1,
            rng: DeterministicRng::new(seed),
            events: EventBuffer::default(),
        }
    }

    /// Allocate an entity id.
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Record an event; visual events past the per-tick cap are dropped.
    pub fn push_event(&mut self, at: Millis, data: GameEventData) {
        self.events.push(GameEvent::new(at, data), MAX_VISUAL_EVENTS);
    }

    /// Drain this tick's events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.events.take()
    }

    /// Events buffered so far this tick.
    pub fn pending_events(&self) -> &[GameEvent] {
        self.events.as_slice()
    }

    /// Check if the session has ended.
    pub fn is_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    /// Shift every absolute timestamp by `offset` ms.
    pub fn rebase(&mut self, offset: Millis) {
        self.started_at += offset;
        if let Some(t) = self.last_spawn.as_mut() {
            *t += offset;
        }
        if let Some(t) = self.player.last_shot.as_mut() {
            *t += offset;
        }
        for slot in self.player.abilities.values_mut() {
            if let Some(t) = slot.last_used.as_mut() {
                *t += offset;
            }
        }
        self.player.effects.rebase(offset);
        for enemy in &mut self.enemies {
            enemy.rebase(offset);
        }
        for summon in &mut self.summons {
            summon.rebase(offset);
        }
    }

    /// Enforce the health and population invariants.
    ///
    /// Debug builds assert; release builds clamp.
    pub fn clamp_invariants(&mut self) {
        debug_assert!(self.player.health.is_finite(), "player health is not finite");
        debug_assert!(self.player.max_health > 0.0, "player max health must be positive");
        debug_assert!(self.player.position.is_finite(), "player position is not finite");

        self.player.health = self.player.health.clamp(0.0, self.player.max_health.max(0.0));
    }

    /// Compute deterministic hash of the gameplay state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng.state(), |hasher| {
            hasher.update_u8(self.phase.tag());
            hasher.update_i64(self.started_at);
            hasher.update_u32(self.survival_secs);
            hasher.update_u64(self.entity_limit as u64);
            hasher.update_u64(self.score);
            hasher.update_u64(self.xp);
            hasher.update_u32(self.level);
            hasher.update_u64(self.next_level_xp);
            hasher.update_u32(self.kill_streak);
            hasher.update_opt_i64(self.last_spawn);
            hasher.update_u32(self.next_id);

            self.player.hash_into(hasher);

            hasher.update_u32(self.enemies.len() as u32);
            for enemy in &self.enemies {
                hasher.update_u32(enemy.id);
                hasher.update_str(enemy.enemy_type().key());
                hasher.update_vec2(enemy.position);
                hasher.update_f64(enemy.speed);
                hasher.update_f64(enemy.health);
                hasher.update_bool(enemy.burn.is_some());
                hasher.update_bool(enemy.slow.is_some());
                if let EnemyKind::Ability { shield_health, .. } = &enemy.kind {
                    hasher.update_f64(*shield_health);
                }
            }

            hasher.update_u32(self.projectiles.len() as u32);
            for p in &self.projectiles {
                hasher.update_u32(p.id);
                hasher.update_vec2(p.position);
                hasher.update_f64(p.damage);
            }

            hasher.update_u32(self.enemy_projectiles.len() as u32);
            for p in &self.enemy_projectiles {
                hasher.update_u32(p.id);
                hasher.update_vec2(p.position);
            }

            hasher.update_u32(self.summons.len() as u32);
            for s in &self.summons {
                hasher.update_vec2(s.position(self.player.position));
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
