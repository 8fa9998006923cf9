//! Ability Engine
//!
//! Per-ability cooldown tracking and effect application. Abilities fire
//! automatically: cooldown-gated ones whenever their cooldown has elapsed,
//! berserker on a kill streak, bloodthirst when the player is surrounded.
//! Passive abilities never trigger here; they shape every shot in
//! [`crate::game::combat`].
//!
//! Persistent sub-entities (orbs, blades, scheduled meteors and volley
//! impacts, shockwave rings) live in [`Summon`] and are advanced every
//! tick until their own expiry.

use std::f64::consts::TAU;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::clock::Millis;
use crate::core::vec2::Vec2;
use crate::game::collision::{beam_hits, nearest_enemy, nearest_enemy_where};
use crate::game::combat::reap_dead;
use crate::game::effects::{ActiveEffect, EffectKind, InsertOutcome};
use crate::game::entity::Weapon;
use crate::game::error::SimError;
use crate::game::events::GameEventData;
use crate::game::state::SimulationState;
use crate::game::tick::SimConfig;
use crate::TICK_RATE;

/// Highest level any ability can reach.
pub const MAX_ABILITY_LEVEL: u8 = 3;

// =============================================================================
// ABILITY IDS
// =============================================================================

/// Every ability, weapon-specific ones first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilityId {
    // Sword
    /// Spin attack around the player
    Whirlwind,
    /// Kill-streak rage
    Berserker,
    /// "Bloodthirst": one-hit kills while surrounded
    Execution,
    // Bow
    /// Passive extra arrows
    Multishot,
    /// Timed piercing shots
    Piercing,
    /// Delayed arrow rain
    Volley,
    // Staff
    /// Passive burning shots
    Fireshot,
    /// Seeking orbs
    Arcane,
    /// Unlimited fire rate burst
    Mana,
    // Cannon
    /// Passive explosive shells
    Explosive,
    /// Beam attack
    Laser,
    /// Amplified next shots
    Overcharge,
    // General
    /// Absorbing shield
    Shield,
    /// Chain lightning
    Lightning,
    /// Regeneration
    Healing,
    /// Slow all enemies
    TimeStop,
    /// Damage and freeze nearby enemies
    Frost,
    /// Life steal
    Vampiric,
    /// Random meteor strikes
    Meteor,
    /// Expanding damage rings
    Shockwave,
    /// Orbiting blades
    SpiritBlades,
}

/// How an ability decides to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerClass {
    /// Never fires; modifies shots instead
    Passive,
    /// Fires whenever `now - last_used >= cooldown`
    Cooldown,
    /// Fires on a kill streak once `now - last_used > cooldown`
    KillStreak,
    /// Fires when enough enemies are close and `now - last_used >= cooldown`
    Surrounded,
}

impl AbilityId {
    /// All abilities.
    pub const ALL: [AbilityId; 21] = [
        AbilityId::Whirlwind,
        AbilityId::Berserker,
        AbilityId::Execution,
        AbilityId::Multishot,
        AbilityId::Piercing,
        AbilityId::Volley,
        AbilityId::Fireshot,
        AbilityId::Arcane,
        AbilityId::Mana,
        AbilityId::Explosive,
        AbilityId::Laser,
        AbilityId::Overcharge,
        AbilityId::Shield,
        AbilityId::Lightning,
        AbilityId::Healing,
        AbilityId::TimeStop,
        AbilityId::Frost,
        AbilityId::Vampiric,
        AbilityId::Meteor,
        AbilityId::Shockwave,
        AbilityId::SpiritBlades,
    ];

    /// Abilities available to every weapon.
    pub const GENERAL: [AbilityId; 9] = [
        AbilityId::Shield,
        AbilityId::Lightning,
        AbilityId::Healing,
        AbilityId::TimeStop,
        AbilityId::Frost,
        AbilityId::Vampiric,
        AbilityId::Meteor,
        AbilityId::Shockwave,
        AbilityId::SpiritBlades,
    ];

    /// The three abilities specific to `weapon`.
    pub fn for_weapon(weapon: Weapon) -> [AbilityId; 3] {
        match weapon {
            Weapon::Sword => [AbilityId::Whirlwind, AbilityId::Berserker, AbilityId::Execution],
            Weapon::Bow => [AbilityId::Multishot, AbilityId::Piercing, AbilityId::Volley],
            Weapon::Staff => [AbilityId::Fireshot, AbilityId::Arcane, AbilityId::Mana],
            Weapon::Cannon => [AbilityId::Explosive, AbilityId::Laser, AbilityId::Overcharge],
        }
    }

    /// Weapon this ability belongs to, or `None` for general abilities.
    pub fn weapon(self) -> Option<Weapon> {
        Weapon::ALL.into_iter().find(|w| Self::for_weapon(*w).contains(&self))
    }

    /// External key.
    pub fn key(self) -> &'static str {
        match self {
            AbilityId::Whirlwind => "whirlwind",
            AbilityId::Berserker => "berserker",
            AbilityId::Execution => "execution",
            AbilityId::Multishot => "multishot",
            AbilityId::Piercing => "piercing",
            AbilityId::Volley => "volley",
            AbilityId::Fireshot => "fireshot",
            AbilityId::Arcane => "arcane",
            AbilityId::Mana => "mana",
            AbilityId::Explosive => "explosive",
            AbilityId::Laser => "laser",
            AbilityId::Overcharge => "overcharge",
            AbilityId::Shield => "shield",
            AbilityId::Lightning => "lightning",
            AbilityId::Healing => "healing",
            AbilityId::TimeStop => "timeStop",
            AbilityId::Frost => "frost",
            AbilityId::Vampiric => "vampiric",
            AbilityId::Meteor => "meteor",
            AbilityId::Shockwave => "shockwave",
            AbilityId::SpiritBlades => "spiritBlades",
        }
    }

    /// Resolve an external key for a session using `weapon`.
    ///
    /// Keys of another weapon's abilities are rejected.
    pub fn from_key(key: &str, weapon: Weapon) -> Result<Self, SimError> {
        Self::ALL
            .into_iter()
            .find(|id| id.key() == key && id.weapon().map_or(true, |w| w == weapon))
            .ok_or_else(|| SimError::UnknownAbility {
                key: key.to_string(),
                weapon: weapon.key().to_string(),
            })
    }

    /// Display name used on upgrade cards.
    pub fn name(self) -> &'static str {
        match self {
            AbilityId::Whirlwind => "Whirlwind Strike",
            AbilityId::Berserker => "Berserker Rage",
            AbilityId::Execution => "Bloodthirst",
            AbilityId::Multishot => "Multi Shot",
            AbilityId::Piercing => "Piercing Arrow",
            AbilityId::Volley => "Arrow Volley",
            AbilityId::Fireshot => "Fire Enchantment",
            AbilityId::Arcane => "Arcane Orb",
            AbilityId::Mana => "Mana Surge",
            AbilityId::Explosive => "Explosive Rounds",
            AbilityId::Laser => "Laser Cannon",
            AbilityId::Overcharge => "Overcharge",
            AbilityId::Shield => "Energy Shield",
            AbilityId::Lightning => "Chain Lightning",
            AbilityId::Healing => "Regeneration",
            AbilityId::TimeStop => "Time Dilation",
            AbilityId::Frost => "Frost Nova",
            AbilityId::Vampiric => "Vampiric Aura",
            AbilityId::Meteor => "Meteor Strike",
            AbilityId::Shockwave => "Shockwave",
            AbilityId::SpiritBlades => "Spirit Blades",
        }
    }

    /// Trigger class.
    pub fn trigger_class(self) -> TriggerClass {
        match self {
            AbilityId::Multishot | AbilityId::Fireshot | AbilityId::Explosive => TriggerClass::Passive,
            AbilityId::Berserker => TriggerClass::KillStreak,
            AbilityId::Execution => TriggerClass::Surrounded,
            _ => TriggerClass::Cooldown,
        }
    }

    /// Cooldown at `level` (1-based). `None` for passives.
    pub fn cooldown_ms(self, level: u8) -> Option<Millis> {
        let i = level_index(level);
        let ms = match self {
            AbilityId::Multishot | AbilityId::Fireshot | AbilityId::Explosive => return None,
            AbilityId::Whirlwind => 8_000,
            AbilityId::Berserker => BERSERKER_COOLDOWN[i],
            AbilityId::Execution => BLOODTHIRST_COOLDOWN[i],
            AbilityId::Piercing => 8_000,
            AbilityId::Volley => 18_000,
            AbilityId::Arcane => 12_000,
            AbilityId::Mana => 25_000,
            AbilityId::Laser => 12_000,
            AbilityId::Overcharge => 20_000,
            AbilityId::Shield => 15_000,
            AbilityId::Lightning => 10_000,
            AbilityId::Healing => 25_000,
            AbilityId::TimeStop => 25_000,
            AbilityId::Frost => 18_000,
            AbilityId::Vampiric => 20_000,
            AbilityId::Meteor => 30_000,
            AbilityId::Shockwave => 12_000,
            AbilityId::SpiritBlades => 15_000,
        };
        Some(ms)
    }
}

/// Table index for a 1-based level, clamped into range.
#[inline]
pub fn level_index(level: u8) -> usize {
    (level.clamp(1, MAX_ABILITY_LEVEL) - 1) as usize
}

// =============================================================================
// ABILITY TABLES
// =============================================================================

// ===== Sword =====
const WHIRLWIND_DAMAGE: [f64; 3] = [60.0, 80.0, 100.0];
const WHIRLWIND_RANGE: f64 = 100.0;

const BERSERKER_COOLDOWN: [Millis; 3] = [45_000, 40_000, 35_000];
const BERSERKER_DURATION: [Millis; 3] = [8_000, 10_000, 12_000];
/// Berserker damage bonus per level.
pub const BERSERKER_DAMAGE_BONUS: [f64; 3] = [0.6, 0.8, 1.0];
/// Berserker fire-rate bonus per level.
pub const BERSERKER_SPEED_BONUS: [f64; 3] = [0.4, 0.6, 0.8];
/// Consecutive kills needed to trigger berserker.
pub const BERSERKER_KILLS_REQUIRED: [u32; 3] = [8, 6, 5];

const BLOODTHIRST_COOLDOWN: [Millis; 3] = [25_000, 20_000, 15_000];
const BLOODTHIRST_DURATION: Millis = 4_000;
const BLOODTHIRST_TRIGGER_RANGE: f64 = 100.0;
/// Enemies within range needed to trigger bloodthirst.
pub const BLOODTHIRST_ENEMIES_REQUIRED: [usize; 3] = [10, 8, 6];

// ===== Bow =====
/// Extra multishot arrows per level.
pub const MULTISHOT_EXTRA_ARROWS: [u32; 3] = [2, 3, 5];
/// Angle between multishot arrows.
pub const MULTISHOT_ARC_STEP: f64 = std::f64::consts::PI / 8.0;
/// Damage fraction of each extra arrow.
pub const MULTISHOT_DAMAGE_FACTOR: f64 = 0.7;

const PIERCING_DURATION: [Millis; 3] = [8_000, 10_000, 12_000];
const PIERCING_COUNT: [u32; 3] = [2, 3, 4];
/// Damage lost per pierce.
pub const PIERCING_DAMAGE_REDUCTION: f64 = 0.8;

const VOLLEY_ARROWS: [u32; 3] = [8, 12, 16];
const VOLLEY_DAMAGE: [f64; 3] = [20.0, 30.0, 40.0];
const VOLLEY_RADIUS: [f64; 3] = [100.0, 120.0, 140.0];
const VOLLEY_IMPACT_RADIUS: f64 = 25.0;
const VOLLEY_DELAY: Millis = 1_000;
const VOLLEY_STAGGER: Millis = 100;

// ===== Staff =====
/// Burn damage per tick for fire-enchanted shots.
pub const FIRESHOT_BURN_DAMAGE: [f64; 3] = [5.0, 8.0, 12.0];
/// Burn window of fire-enchanted shots.
pub const FIRESHOT_BURN_DURATION: Millis = 3_000;

const ARCANE_ORBS: [u32; 3] = [1, 2, 3];
const ARCANE_DAMAGE: [f64; 3] = [80.0, 100.0, 120.0];
const ARCANE_SEEK_RANGE: f64 = 150.0;
const ARCANE_EXPLOSION_RADIUS: f64 = 60.0;
const ARCANE_SPEED: f64 = 2.0;
const ARCANE_LIFETIME: Millis = 8_000;
const ARCANE_SPAWN_DISTANCE: f64 = 50.0;
const ARCANE_DETONATE_DISTANCE: f64 = 5.0;

const MANA_DURATION: [Millis; 3] = [3_000, 4_000, 5_000];
const MANA_EXTRA_PROJECTILES: [u32; 3] = [2, 3, 4];
/// Angle between mana surge projectiles.
pub const MANA_ARC_STEP: f64 = std::f64::consts::PI / 6.0;

// ===== Cannon =====
/// Explosive rounds radius per level.
pub const EXPLOSIVE_RADIUS: [f64; 3] = [50.0, 75.0, 100.0];
/// Explosive rounds damage per level.
pub const EXPLOSIVE_DAMAGE: [f64; 3] = [20.0, 35.0, 50.0];

const LASER_COUNT: [u32; 3] = [1, 2, 3];
const LASER_DAMAGE: [f64; 3] = [60.0, 85.0, 120.0];
const LASER_WIDTH: [f64; 3] = [15.0, 20.0, 25.0];
const LASER_RANGE: [f64; 3] = [400.0, 450.0, 500.0];
const LASER_SPREAD: f64 = std::f64::consts::PI / 3.0;

const OVERCHARGE_SHOTS: [u32; 3] = [3, 4, 5];
const OVERCHARGE_MULTIPLIER: [f64; 3] = [2.0, 2.5, 3.0];
const OVERCHARGE_PIERCE: u32 = 3;

// ===== General =====
const SHIELD_DURATION: [Millis; 3] = [3_000, 4_000, 5_000];
const SHIELD_ABSORPTION: [f64; 3] = [50.0, 75.0, 100.0];

const LIGHTNING_DAMAGE: [f64; 3] = [25.0, 45.0, 70.0];
const LIGHTNING_CHAINS: [u32; 3] = [2, 4, 6];
const LIGHTNING_RANGE: f64 = 150.0;

const HEALING_DURATION: [Millis; 3] = [3_000, 4_000, 5_000];
const HEALING_PER_SECOND: [f64; 3] = [8.0, 12.0, 16.0];

const TIME_STOP_DURATION: [Millis; 3] = [2_000, 3_000, 4_000];
const TIME_STOP_SLOW_FACTOR: [f64; 3] = [0.3, 0.2, 0.1];

const FROST_DAMAGE: [f64; 3] = [15.0, 25.0, 40.0];
const FROST_RANGE: [f64; 3] = [120.0, 150.0, 180.0];
const FROST_FREEZE: [Millis; 3] = [1_500, 2_000, 2_500];
const FROST_SPEED_FACTOR: f64 = 0.1;

const VAMPIRIC_DURATION: [Millis; 3] = [8_000, 10_000, 12_000];
const VAMPIRIC_LIFE_STEAL: [f64; 3] = [0.2, 0.3, 0.4];

const METEOR_DAMAGE: [f64; 3] = [80.0, 120.0, 180.0];
const METEOR_COUNT: [u32; 3] = [3, 4, 5];
const METEOR_RADIUS: [f64; 3] = [60.0, 75.0, 90.0];
const METEOR_STAGGER: Millis = 200;
const METEOR_FALL_TIME: Millis = 1_500;

const SHOCKWAVE_DAMAGE: [f64; 3] = [35.0, 55.0, 80.0];
const SHOCKWAVE_WAVES: [u32; 3] = [2, 3, 4];
const SHOCKWAVE_RADIUS: [f64; 3] = [80.0, 100.0, 120.0];
const SHOCKWAVE_SPEED: f64 = 4.0;
const SHOCKWAVE_STAGGER: Millis = 300;
const SHOCKWAVE_RING_TOLERANCE: f64 = 15.0;
const SHOCKWAVE_MARKER_MS: Millis = 100;

const BLADE_DURATION: [Millis; 3] = [8_000, 10_000, 12_000];
const BLADE_COUNT: [u32; 3] = [3, 4, 5];
const BLADE_DAMAGE: [f64; 3] = [25.0, 40.0, 60.0];
const BLADE_ORBIT: f64 = 60.0;
const BLADE_ROTATION: f64 = 0.08;
const BLADE_HIT_RADIUS: f64 = 20.0;
const BLADE_HIT_COOLDOWN: Millis = 300;

/// Milliseconds per frame assumed by wave expansion.
const FRAME_MS_F: f64 = crate::FRAME_MS as f64;

// =============================================================================
// SUMMONS
// =============================================================================

/// Persistent ability sub-entity advanced every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Summon {
    /// Seeks the nearest enemy and explodes on contact
    ArcaneOrb {
        /// Current position
        position: Vec2,
        /// Explosion damage
        damage: f64,
        /// Fizzles out at this time
        expires_at: Millis,
    },
    /// Lands at `impact_at`, damaging a small area
    VolleyArrow {
        /// Landing point
        position: Vec2,
        /// Impact damage
        damage: f64,
        /// Landing time
        impact_at: Millis,
    },
    /// Lands at `impact_at`, damaging a large area
    Meteor {
        /// Landing point
        position: Vec2,
        /// Impact damage
        damage: f64,
        /// Blast radius
        radius: f64,
        /// Landing time
        impact_at: Millis,
    },
    /// Ring expanding from `origin` between `starts_at` and `ends_at`
    Shockwave {
        /// Centre of the ring
        origin: Vec2,
        /// Damage to each enemy the ring crosses
        damage: f64,
        /// Final ring radius
        max_radius: f64,
        /// Ring appears
        starts_at: Millis,
        /// Ring is gone
        ends_at: Millis,
    },
    /// Orbits the player and strikes one enemy at a time
    SpiritBlade {
        /// Orbit angle (radians)
        angle: f64,
        /// Damage per strike
        damage: f64,
        /// Last strike
        last_hit: Option<Millis>,
        /// Blade vanishes
        ends_at: Millis,
    },
}

impl Summon {
    /// Shift every absolute timestamp by `offset`.
    pub fn rebase(&mut self, offset: Millis) {
        match self {
            Summon::ArcaneOrb { expires_at, .. } => *expires_at += offset,
            Summon::VolleyArrow { impact_at, .. } | Summon::Meteor { impact_at, .. } => {
                *impact_at += offset
            }
            Summon::Shockwave { starts_at, ends_at, .. } => {
                *starts_at += offset;
                *ends_at += offset;
            }
            Summon::SpiritBlade { last_hit, ends_at, .. } => {
                if let Some(t) = last_hit {
                    *t += offset;
                }
                *ends_at += offset;
            }
        }
    }

    /// Current position (blades report their orbit point around `player`).
    pub fn position(&self, player: Vec2) -> Vec2 {
        match self {
            Summon::ArcaneOrb { position, .. }
            | Summon::VolleyArrow { position, .. }
            | Summon::Meteor { position, .. } => *position,
            Summon::Shockwave { origin, .. } => *origin,
            Summon::SpiritBlade { angle, .. } => player + Vec2::from_angle(*angle) * BLADE_ORBIT,
        }
    }
}

// =============================================================================
// ABILITY PHASE
// =============================================================================

/// Run the ability phase of a tick.
///
/// Order: bloodthirst check, berserker check, cooldown-gated triggers,
/// effect expiry and healing, summon advance. Enemies killed by any step
/// are reaped before the next step runs.
pub fn update_abilities(state: &mut SimulationState, now: Millis, config: &SimConfig) {
    check_bloodthirst(state, now);
    check_berserker(state, now);

    let due: Vec<(AbilityId, u8)> = state
        .player
        .abilities
        .iter()
        .filter(|(id, slot)| {
            slot.level > 0
                && id.trigger_class() == TriggerClass::Cooldown
                && id
                    .cooldown_ms(slot.level)
                    .is_some_and(|cd| slot.last_used.map_or(true, |t| now - t >= cd))
        })
        .map(|(id, slot)| (*id, slot.level))
        .collect();

    for (id, level) in due {
        trigger_ability(state, id, level, now, config);
        if let Some(slot) = state.player.abilities.get_mut(&id) {
            slot.last_used = Some(now);
        }
        reap_dead(state, now);
    }

    update_active_effects(state, now);
    advance_summons(state, now);
    reap_dead(state, now);
}

/// Bloodthirst: fires when enough enemies are within range of the player.
fn check_bloodthirst(state: &mut SimulationState, now: Millis) {
    let Some(slot) = state.player.abilities.get(&AbilityId::Execution).copied() else {
        return;
    };
    if slot.level == 0 || state.player.effects.contains(EffectKind::Bloodthirst) {
        return;
    }
    let i = level_index(slot.level);
    if slot.last_used.is_some_and(|t| now - t < BLOODTHIRST_COOLDOWN[i]) {
        return;
    }

    let player_pos = state.player.position;
    let nearby = state
        .enemies
        .iter()
        .filter(|e| !e.is_dead() && e.position.distance(player_pos) <= BLOODTHIRST_TRIGGER_RANGE)
        .count();
    if nearby < BLOODTHIRST_ENEMIES_REQUIRED[i] {
        return;
    }

    state.player.effects.insert(ActiveEffect::Bloodthirst {
        expires_at: now + BLOODTHIRST_DURATION,
    });
    if let Some(slot) = state.player.abilities.get_mut(&AbilityId::Execution) {
        slot.last_used = Some(now);
    }
    debug!(nearby, "bloodthirst activated");
    announce(state, AbilityId::Execution, slot.level, now, 80.0);
}

/// Berserker: fires when the kill streak reaches the level's threshold.
fn check_berserker(state: &mut SimulationState, now: Millis) {
    let Some(slot) = state.player.abilities.get(&AbilityId::Berserker).copied() else {
        return;
    };
    if slot.level == 0 || state.player.effects.contains(EffectKind::Berserker) {
        return;
    }
    let i = level_index(slot.level);
    if state.kill_streak < BERSERKER_KILLS_REQUIRED[i] {
        return;
    }
    if slot.last_used.is_some_and(|t| now - t <= BERSERKER_COOLDOWN[i]) {
        return;
    }

    state.player.effects.insert(ActiveEffect::Berserker {
        damage_bonus: BERSERKER_DAMAGE_BONUS[i],
        speed_bonus: BERSERKER_SPEED_BONUS[i],
        expires_at: now + BERSERKER_DURATION[i],
    });
    if let Some(slot) = state.player.abilities.get_mut(&AbilityId::Berserker) {
        slot.last_used = Some(now);
    }
    debug!(streak = state.kill_streak, "berserker rage activated");
    state.kill_streak = 0;
    announce(state, AbilityId::Berserker, slot.level, now, 50.0);
}

/// Emit the gameplay and visual events for a fired ability.
fn announce(state: &mut SimulationState, ability: AbilityId, level: u8, now: Millis, radius: f64) {
    let position = state.player.position;
    state.push_event(now, GameEventData::AbilityTriggered { ability, level });
    state.push_event(now, GameEventData::AbilityCast { ability, position, radius });
}

/// Insert a timed buff and announce it unless an instance suppressed it.
fn grant_effect(
    state: &mut SimulationState,
    ability: AbilityId,
    level: u8,
    effect: ActiveEffect,
    now: Millis,
    radius: f64,
) {
    if state.player.effects.insert(effect) == InsertOutcome::Suppressed {
        debug!(ability = ability.key(), "effect already active; trigger suppressed");
        return;
    }
    announce(state, ability, level, now, radius);
}

/// Apply one cooldown-gated ability at `level`.
pub fn trigger_ability(
    state: &mut SimulationState,
    id: AbilityId,
    level: u8,
    now: Millis,
    config: &SimConfig,
) {
    let i = level_index(level);
    let player_pos = state.player.position;

    match id {
        AbilityId::Whirlwind => {
            for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
                if enemy.position.distance(player_pos) <= WHIRLWIND_RANGE {
                    enemy.apply_damage(WHIRLWIND_DAMAGE[i]);
                }
            }
            announce(state, id, level, now, WHIRLWIND_RANGE);
        }

        AbilityId::Lightning => {
            let Some(first) = nearest_enemy(&state.enemies, player_pos) else {
                return;
            };
            let mut hit = vec![first];
            let mut current = first;
            let mut path = vec![player_pos];
            for link in 0..LIGHTNING_CHAINS[i] {
                let target = &mut state.enemies[current];
                target.apply_damage(LIGHTNING_DAMAGE[i]);
                path.push(target.position);
                let from = target.position;

                if link + 1 == LIGHTNING_CHAINS[i] {
                    break;
                }
                let next = nearest_enemy_where(&state.enemies, from, |idx, e| {
                    !hit.contains(&idx) && e.position.distance(from) <= LIGHTNING_RANGE
                });
                match next {
                    Some(next) => {
                        hit.push(next);
                        current = next;
                    }
                    None => break,
                }
            }
            state.push_event(now, GameEventData::AbilityTriggered { ability: id, level });
            state.push_event(now, GameEventData::LightningChain { path });
        }

        AbilityId::Healing => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Healing {
                heal_per_second: HEALING_PER_SECOND[i],
                expires_at: now + HEALING_DURATION[i],
            },
            now,
            40.0,
        ),

        AbilityId::Shield => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Shield {
                absorption: SHIELD_ABSORPTION[i],
                remaining: SHIELD_ABSORPTION[i],
                expires_at: now + SHIELD_DURATION[i],
            },
            now,
            config.shield_radius,
        ),

        AbilityId::TimeStop => {
            let resume_at = now + TIME_STOP_DURATION[i];
            for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
                enemy.apply_slow(TIME_STOP_SLOW_FACTOR[i], resume_at);
            }
            announce(state, id, level, now, 200.0);
        }

        AbilityId::Frost => {
            let resume_at = now + FROST_FREEZE[i];
            for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
                if enemy.position.distance(player_pos) <= FROST_RANGE[i] {
                    enemy.apply_damage(FROST_DAMAGE[i]);
                    enemy.apply_slow(FROST_SPEED_FACTOR, resume_at);
                }
            }
            announce(state, id, level, now, FROST_RANGE[i]);
        }

        AbilityId::Vampiric => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Vampiric {
                life_steal: VAMPIRIC_LIFE_STEAL[i],
                expires_at: now + VAMPIRIC_DURATION[i],
            },
            now,
            50.0,
        ),

        AbilityId::Meteor => {
            for n in 0..METEOR_COUNT[i] {
                let position = Vec2::new(
                    state.rng.next_f64() * config.field_width,
                    state.rng.next_f64() * config.field_height,
                );
                let impact_at = now + n as Millis * METEOR_STAGGER + METEOR_FALL_TIME;
                state.summons.push(Summon::Meteor {
                    position,
                    damage: METEOR_DAMAGE[i],
                    radius: METEOR_RADIUS[i],
                    impact_at,
                });
                state.push_event(
                    now,
                    GameEventData::MeteorWarning { position, radius: METEOR_RADIUS[i], impact_at },
                );
            }
            state.push_event(now, GameEventData::AbilityTriggered { ability: id, level });
        }

        AbilityId::Shockwave => {
            let duration = (SHOCKWAVE_RADIUS[i] / SHOCKWAVE_SPEED * FRAME_MS_F).round() as Millis;
            for n in 0..SHOCKWAVE_WAVES[i] {
                let starts_at = now + n as Millis * SHOCKWAVE_STAGGER;
                state.summons.push(Summon::Shockwave {
                    origin: player_pos,
                    damage: SHOCKWAVE_DAMAGE[i],
                    max_radius: SHOCKWAVE_RADIUS[i],
                    starts_at,
                    ends_at: starts_at + duration,
                });
            }
            announce(state, id, level, now, SHOCKWAVE_RADIUS[i]);
        }

        AbilityId::SpiritBlades => {
            let count = BLADE_COUNT[i];
            for n in 0..count {
                state.summons.push(Summon::SpiritBlade {
                    angle: n as f64 / count as f64 * TAU,
                    damage: BLADE_DAMAGE[i],
                    last_hit: None,
                    ends_at: now + BLADE_DURATION[i],
                });
            }
            announce(state, id, level, now, BLADE_ORBIT);
        }

        AbilityId::Piercing => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Piercing {
                pierce_count: PIERCING_COUNT[i],
                damage_reduction: PIERCING_DAMAGE_REDUCTION,
                expires_at: now + PIERCING_DURATION[i],
            },
            now,
            35.0,
        ),

        AbilityId::Volley => {
            let center = nearest_enemy(&state.enemies, player_pos)
                .map(|idx| state.enemies[idx].position)
                .unwrap_or(player_pos);
            for n in 0..VOLLEY_ARROWS[i] {
                let angle = state.rng.next_angle();
                let distance = state.rng.next_f64() * VOLLEY_RADIUS[i];
                state.summons.push(Summon::VolleyArrow {
                    position: center + Vec2::from_angle(angle) * distance,
                    damage: VOLLEY_DAMAGE[i],
                    impact_at: now + VOLLEY_DELAY + n as Millis * VOLLEY_STAGGER,
                });
            }
            state.push_event(now, GameEventData::AbilityTriggered { ability: id, level });
            state.push_event(
                now,
                GameEventData::AbilityCast { ability: id, position: center, radius: VOLLEY_RADIUS[i] },
            );
        }

        AbilityId::Arcane => {
            let count = ARCANE_ORBS[i];
            for n in 0..count {
                let angle = n as f64 / count as f64 * TAU;
                state.summons.push(Summon::ArcaneOrb {
                    position: player_pos + Vec2::from_angle(angle) * ARCANE_SPAWN_DISTANCE,
                    damage: ARCANE_DAMAGE[i],
                    expires_at: now + ARCANE_LIFETIME,
                });
            }
            announce(state, id, level, now, ARCANE_SPAWN_DISTANCE);
        }

        AbilityId::Mana => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Mana {
                extra_projectiles: MANA_EXTRA_PROJECTILES[i],
                expires_at: now + MANA_DURATION[i],
            },
            now,
            50.0,
        ),

        AbilityId::Laser => {
            let count = LASER_COUNT[i];
            for n in 0..count {
                let angle = if count == 1 {
                    match nearest_enemy(&state.enemies, player_pos) {
                        Some(idx) => player_pos.angle_to(state.enemies[idx].position),
                        None => state.rng.next_angle(),
                    }
                } else {
                    let base = state
                        .enemies
                        .iter()
                        .find(|e| !e.is_dead())
                        .map_or(0.0, |e| player_pos.angle_to(e.position));
                    base - LASER_SPREAD / 2.0 + (n as f64 / (count - 1) as f64) * LASER_SPREAD
                };
                fire_laser(state, player_pos, angle, LASER_RANGE[i], LASER_WIDTH[i], LASER_DAMAGE[i], now);
            }
            state.push_event(now, GameEventData::AbilityTriggered { ability: id, level });
        }

        AbilityId::Overcharge => grant_effect(
            state,
            id,
            level,
            ActiveEffect::Overcharge {
                shots_remaining: OVERCHARGE_SHOTS[i],
                damage_multiplier: OVERCHARGE_MULTIPLIER[i],
                pierce_count: OVERCHARGE_PIERCE,
            },
            now,
            40.0,
        ),

        // Conditional and passive abilities never fire on a plain cooldown.
        AbilityId::Berserker
        | AbilityId::Execution
        | AbilityId::Multishot
        | AbilityId::Fireshot
        | AbilityId::Explosive => {}
    }
}

/// Damage every living enemy touched by a beam.
fn fire_laser(
    state: &mut SimulationState,
    start: Vec2,
    angle: f64,
    length: f64,
    width: f64,
    damage: f64,
    now: Millis,
) {
    for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
        if beam_hits(start, angle, length, width, enemy.position, enemy.radius) {
            enemy.apply_damage(damage);
        }
    }
    let end = start + Vec2::from_angle(angle) * length;
    state.push_event(now, GameEventData::LaserBeam { start, end, width });
}

/// Expire timed effects and apply per-tick healing.
pub fn update_active_effects(state: &mut SimulationState, now: Millis) {
    for kind in state.player.effects.expire(now) {
        state.push_event(now, GameEventData::EffectExpired { kind });
    }

    let heal = state.player.effects.heal_per_tick(TICK_RATE as f64);
    if heal > 0.0 {
        let player = &mut state.player;
        player.health = (player.health + heal).min(player.max_health);
    }
}

/// Advance every summon by one tick, dropping the ones that finished.
pub fn advance_summons(state: &mut SimulationState, now: Millis) {
    let summons = std::mem::take(&mut state.summons);
    let mut kept = Vec::with_capacity(summons.len());
    let player_pos = state.player.position;

    for mut summon in summons {
        let alive = match &mut summon {
            Summon::ArcaneOrb { position, damage, expires_at } => {
                if now >= *expires_at {
                    false
                } else {
                    advance_orb(state, position, *damage, now)
                }
            }

            Summon::VolleyArrow { position, damage, impact_at } => {
                if now >= *impact_at {
                    damage_area(state, *position, VOLLEY_IMPACT_RADIUS, *damage);
                    state.push_event(
                        now,
                        GameEventData::VolleyImpact { position: *position, radius: VOLLEY_IMPACT_RADIUS },
                    );
                    false
                } else {
                    true
                }
            }

            Summon::Meteor { position, damage, radius, impact_at } => {
                if now >= *impact_at {
                    damage_area(state, *position, *radius, *damage);
                    state.push_event(now, GameEventData::Explosion { position: *position, radius: *radius });
                    false
                } else {
                    true
                }
            }

            Summon::Shockwave { origin, damage, max_radius, starts_at, ends_at } => {
                if now >= *ends_at {
                    false
                } else {
                    if now >= *starts_at {
                        let elapsed = (now - *starts_at) as f64;
                        let ring = (elapsed * SHOCKWAVE_SPEED / FRAME_MS_F).min(*max_radius);
                        for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
                            let d = enemy.position.distance(*origin);
                            if (d - ring).abs() <= SHOCKWAVE_RING_TOLERANCE && enemy.shockwave_hit_at.is_none() {
                                enemy.apply_damage(*damage);
                                enemy.shockwave_hit_at = Some(now);
                            }
                        }
                    }
                    true
                }
            }

            Summon::SpiritBlade { angle, damage, last_hit, ends_at } => {
                if now >= *ends_at {
                    false
                } else {
                    *angle += BLADE_ROTATION;
                    let blade_pos = player_pos + Vec2::from_angle(*angle) * BLADE_ORBIT;
                    if last_hit.map_or(true, |t| now - t > BLADE_HIT_COOLDOWN) {
                        // One enemy per tick, newest first.
                        let struck = state
                            .enemies
                            .iter_mut()
                            .rev()
                            .find(|e| !e.is_dead() && e.position.distance(blade_pos) <= BLADE_HIT_RADIUS)
                            .map(|enemy| enemy.apply_damage(*damage))
                            .is_some();
                        if struck {
                            *last_hit = Some(now);
                            state.push_event(now, GameEventData::BladeHit { position: blade_pos });
                        }
                    }
                    true
                }
            }
        };

        if alive {
            kept.push(summon);
        }
    }

    // Anything pushed by triggers while we were iterating stays queued.
    kept.append(&mut state.summons);
    state.summons = kept;

    for enemy in &mut state.enemies {
        if enemy.shockwave_hit_at.is_some_and(|t| now - t > SHOCKWAVE_MARKER_MS) {
            enemy.shockwave_hit_at = None;
        }
    }
}

/// Move an orb one step. Returns `false` once it has exploded.
fn advance_orb(state: &mut SimulationState, position: &mut Vec2, damage: f64, now: Millis) -> bool {
    let from = *position;
    let target = nearest_enemy_where(&state.enemies, from, |_, e| {
        e.position.distance(from) <= ARCANE_SEEK_RANGE
    });

    match target {
        Some(idx) => {
            let enemy_pos = state.enemies[idx].position;
            if from.distance(enemy_pos) > ARCANE_DETONATE_DISTANCE {
                *position = from + from.direction_to(enemy_pos) * ARCANE_SPEED;
                true
            } else {
                damage_area(state, from, ARCANE_EXPLOSION_RADIUS, damage);
                state.push_event(now, GameEventData::Explosion { position: from, radius: ARCANE_EXPLOSION_RADIUS });
                false
            }
        }
        None => {
            let dx = (state.rng.next_f64() - 0.5) * 0.5;
            let dy = (state.rng.next_f64() - 0.5) * 0.5;
            *position = from + Vec2::new(dx, dy);
            true
        }
    }
}

/// Damage every living enemy within `radius` of `center`.
pub fn damage_area(state: &mut SimulationState, center: Vec2, radius: f64, damage: f64) {
    for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
        if enemy.position.distance(center) <= radius {
            enemy.apply_damage(damage);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
