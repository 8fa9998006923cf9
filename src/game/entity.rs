//! Entity Model
//!
//! Data definitions for weapons, enemies and projectiles, plus the two
//! factory functions that stamp out enemies and player projectiles.
//! No behavior lives here beyond construction and small accessors.

use serde::{Serialize, Deserialize};

use crate::core::clock::Millis;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::error::SimError;

/// Identifier for enemies and projectiles, unique within a session.
pub type EntityId = u32;

/// Damage-flash duration for any entity that takes damage (ms).
pub const DAMAGE_FLASH_MS: f64 = 200.0;

/// Radius of every player projectile.
pub const PLAYER_PROJECTILE_RADIUS: f64 = 3.0;

// =============================================================================
// WEAPONS
// =============================================================================

/// The weapon chosen for a session. Exactly one per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weapon {
    /// Short range, fast hits
    Sword,
    /// Long range, fast arrows
    Bow,
    /// Medium range, slow bolts
    Staff,
    /// Longest range, heavy shells
    Cannon,
}

/// Base weapon stats. Stat upgrades are derived from these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponStats {
    /// Display name
    pub name: &'static str,
    /// Damage per projectile
    pub damage: f64,
    /// Shots per second
    pub fire_rate: f64,
    /// Max travel distance of a projectile (px)
    pub range: f64,
    /// Projectile speed (px per tick)
    pub projectile_speed: f64,
}

impl Weapon {
    /// All weapons in table order.
    pub const ALL: [Weapon; 4] = [Weapon::Sword, Weapon::Bow, Weapon::Staff, Weapon::Cannon];

    /// Parse an external weapon key.
    pub fn from_key(key: &str) -> Result<Self, SimError> {
        match key {
            "sword" => Ok(Weapon::Sword),
            "bow" => Ok(Weapon::Bow),
            "staff" => Ok(Weapon::Staff),
            "cannon" => Ok(Weapon::Cannon),
            other => Err(SimError::UnknownWeapon(other.to_string())),
        }
    }

    /// External key.
    pub fn key(self) -> &'static str {
        match self {
            Weapon::Sword => "sword",
            Weapon::Bow => "bow",
            Weapon::Staff => "staff",
            Weapon::Cannon => "cannon",
        }
    }

    /// Base stats for this weapon.
    pub fn stats(self) -> WeaponStats {
        match self {
            Weapon::Sword => WeaponStats {
                name: "Sword",
                damage: 35.0,
                fire_rate: 1.25,
                range: 80.0,
                projectile_speed: 12.0,
            },
            Weapon::Bow => WeaponStats {
                name: "Bow",
                damage: 25.0,
                fire_rate: 1.67,
                range: 250.0,
                projectile_speed: 10.0,
            },
            Weapon::Staff => WeaponStats {
                name: "Magic Staff",
                damage: 20.0,
                fire_rate: 0.83,
                range: 200.0,
                projectile_speed: 8.0,
            },
            Weapon::Cannon => WeaponStats {
                name: "Plasma Cannon",
                damage: 45.0,
                fire_rate: 0.5,
                range: 300.0,
                projectile_speed: 15.0,
            },
        }
    }
}

// =============================================================================
// ENEMY TYPES
// =============================================================================

/// Enemy type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyType {
    /// Plain chaser
    Basic,
    /// Quick, fragile chaser
    Fast,
    /// Slow, sturdy chaser
    Tank,
    /// Fast and sturdy chaser
    Elite,
    /// Keeps its distance and shoots
    Ranged,
    /// Chaser with one periodic skill
    Ability,
    /// Predicts the player and dodges shots
    Ai,
}

/// Unscaled enemy stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyBaseStats {
    /// Collision radius
    pub radius: f64,
    /// Movement speed (px per tick)
    pub speed: f64,
    /// Health at T = 0
    pub health: f64,
    /// Score reward at T = 0
    pub score: f64,
    /// XP reward at T = 0
    pub xp: f64,
}

impl EnemyType {
    /// All enemy types in table order.
    pub const ALL: [EnemyType; 7] = [
        EnemyType::Basic,
        EnemyType::Fast,
        EnemyType::Tank,
        EnemyType::Elite,
        EnemyType::Ranged,
        EnemyType::Ability,
        EnemyType::Ai,
    ];

    /// Parse an external type key.
    pub fn from_key(key: &str) -> Result<Self, SimError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.key() == key)
            .ok_or_else(|| SimError::InvalidConfig(format!("unknown enemy type: {key}")))
    }

    /// External key.
    pub fn key(self) -> &'static str {
        match self {
            EnemyType::Basic => "basic",
            EnemyType::Fast => "fast",
            EnemyType::Tank => "tank",
            EnemyType::Elite => "elite",
            EnemyType::Ranged => "ranged",
            EnemyType::Ability => "ability",
            EnemyType::Ai => "ai",
        }
    }

    /// Base stats before time scaling.
    pub fn base_stats(self) -> EnemyBaseStats {
        let (radius, speed, health, score, xp) = match self {
            EnemyType::Basic => (15.0, 1.0, 60.0, 100.0, 50.0),
            EnemyType::Fast => (12.0, 1.8, 40.0, 150.0, 75.0),
            EnemyType::Tank => (20.0, 0.6, 120.0, 200.0, 100.0),
            EnemyType::Elite => (18.0, 1.4, 100.0, 300.0, 150.0),
            EnemyType::Ranged => (12.0, 0.8, 80.0, 400.0, 150.0),
            EnemyType::Ability => (16.0, 1.0, 120.0, 500.0, 180.0),
            EnemyType::Ai => (14.0, 1.6, 90.0, 450.0, 160.0),
        };
        EnemyBaseStats { radius, speed, health, score, xp }
    }
}

// ===== Time Scaling =====

/// Health multiplier after `survival_secs` seconds.
#[inline]
pub fn health_scaling(survival_secs: u32) -> f64 {
    1.0 + (survival_secs as f64 / 30.0) * 0.25
}

/// Score/XP (and ranged bullet damage) multiplier after `survival_secs` seconds.
#[inline]
pub fn reward_scaling(survival_secs: u32) -> f64 {
    1.0 + (survival_secs as f64 / 60.0) * 0.15
}

/// Contact damage after `survival_secs` seconds.
#[inline]
pub fn contact_damage(survival_secs: u32) -> f64 {
    10.0 + (survival_secs / 60) as f64 * 5.0
}

// =============================================================================
// ENEMY STATE
// =============================================================================

/// One of the skills an ability-type enemy may be born with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemySkill {
    /// Temporary damage shield
    Shield,
    /// Jump toward the player
    Dash,
    /// Restore health
    Heal,
    /// Reappear near the player
    Teleport,
    /// Ring of bullets
    Burst,
}

impl EnemySkill {
    /// All skills, in the order used for the random pick.
    pub const ALL: [EnemySkill; 5] = [
        EnemySkill::Shield,
        EnemySkill::Dash,
        EnemySkill::Heal,
        EnemySkill::Teleport,
        EnemySkill::Burst,
    ];
}

/// Type-specific enemy state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Plain chaser
    Basic,
    /// Quick chaser
    Fast,
    /// Sturdy chaser
    Tank,
    /// Fast, sturdy chaser
    Elite,
    /// Distance keeper that shoots
    Ranged {
        /// Time of the last shot (None = never fired)
        last_shot: Option<Millis>,
        /// Damage of each bullet (time-scaled at spawn)
        bullet_damage: f64,
    },
    /// Chaser with a periodic skill
    Ability {
        /// The skill rolled at spawn
        skill: EnemySkill,
        /// Time of last use (None = never used)
        last_used: Option<Millis>,
        /// Remaining shield points
        shield_health: f64,
        /// When the current shield lapses
        shield_expires_at: Option<Millis>,
    },
    /// Predictive dodger
    Ai {
        /// Probability a qualifying hit is dodged
        dodge_chance: f64,
        /// Time of the last dodge (None = never dodged)
        last_dodge: Option<Millis>,
        /// Predicted point the enemy is steering toward
        target: Vec2,
        /// Player position seen at the previous prediction
        last_player_pos: Option<Vec2>,
    },
}

impl EnemyKind {
    /// The type tag of this variant.
    pub fn enemy_type(&self) -> EnemyType {
        match self {
            EnemyKind::Basic => EnemyType::Basic,
            EnemyKind::Fast => EnemyType::Fast,
            EnemyKind::Tank => EnemyType::Tank,
            EnemyKind::Elite => EnemyType::Elite,
            EnemyKind::Ranged { .. } => EnemyType::Ranged,
            EnemyKind::Ability { .. } => EnemyType::Ability,
            EnemyKind::Ai { .. } => EnemyType::Ai,
        }
    }
}

/// Damage-over-time attached by fire-enchanted projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurnState {
    /// Damage per burn tick
    pub damage_per_tick: f64,
    /// Burn window end
    pub ends_at: Millis,
    /// Next scheduled burn tick
    pub next_tick_at: Millis,
}

/// Speed override from frost or time dilation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowState {
    /// Speed restored when the slow ends
    pub original_speed: f64,
    /// When the slow ends
    pub resume_at: Millis,
}

/// A live enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Session-unique id
    pub id: EntityId,
    /// Centre position
    pub position: Vec2,
    /// Collision radius
    pub radius: f64,
    /// Current speed (slow states override it)
    pub speed: f64,
    /// Current health
    pub health: f64,
    /// Health at spawn
    pub max_health: f64,
    /// Damage dealt on contact with the player
    pub contact_damage: f64,
    /// Score granted on death
    pub score_value: u64,
    /// XP granted on death
    pub xp_value: u64,
    /// Remaining damage-flash time (ms)
    pub damage_flash: f64,
    /// Active burn, if any
    pub burn: Option<BurnState>,
    /// Active slow, if any
    pub slow: Option<SlowState>,
    /// Time of the last shockwave hit, cleared 100 ms later
    pub shockwave_hit_at: Option<Millis>,
    /// Type-specific state
    pub kind: EnemyKind,
}

impl Enemy {
    /// The type tag.
    #[inline]
    pub fn enemy_type(&self) -> EnemyType {
        self.kind.enemy_type()
    }

    /// Subtract health and start the damage flash.
    #[inline]
    pub fn apply_damage(&mut self, amount: f64) {
        self.health -= amount;
        self.damage_flash = DAMAGE_FLASH_MS;
    }

    /// Health at or below zero.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Slow this enemy to `factor` of its unslowed speed until `resume_at`.
    ///
    /// Overlapping slows keep the first recorded original speed and the
    /// later of the two resume times.
    pub fn apply_slow(&mut self, factor: f64, resume_at: Millis) {
        let (original_speed, resume_at) = match self.slow {
            Some(existing) => (existing.original_speed, existing.resume_at.max(resume_at)),
            None => (self.speed, resume_at),
        };
        self.speed = original_speed * factor;
        self.slow = Some(SlowState { original_speed, resume_at });
    }

    /// Shift every absolute timestamp by `offset`.
    pub fn rebase(&mut self, offset: Millis) {
        if let Some(burn) = self.burn.as_mut() {
            burn.ends_at += offset;
            burn.next_tick_at += offset;
        }
        if let Some(slow) = self.slow.as_mut() {
            slow.resume_at += offset;
        }
        if let Some(t) = self.shockwave_hit_at.as_mut() {
            *t += offset;
        }
        match &mut self.kind {
            EnemyKind::Ranged { last_shot, .. } => shift(last_shot, offset),
            EnemyKind::Ability { last_used, shield_expires_at, .. } => {
                shift(last_used, offset);
                shift(shield_expires_at, offset);
            }
            EnemyKind::Ai { last_dodge, .. } => shift(last_dodge, offset),
            EnemyKind::Basic | EnemyKind::Fast | EnemyKind::Tank | EnemyKind::Elite => {}
        }
    }
}

fn shift(t: &mut Option<Millis>, offset: Millis) {
    if let Some(t) = t {
        *t += offset;
    }
}

/// Create an enemy of `enemy_type` scaled for `survival_secs`.
///
/// Ability-type enemies roll their skill from `rng`; every other type
/// leaves `rng` untouched.
pub fn create_enemy(
    id: EntityId,
    enemy_type: EnemyType,
    survival_secs: u32,
    position: Vec2,
    rng: &mut DeterministicRng,
) -> Enemy {
    let base = enemy_type.base_stats();
    let rewards = reward_scaling(survival_secs);
    let health = (base.health * health_scaling(survival_secs)).round();

    let kind = match enemy_type {
        EnemyType::Basic => EnemyKind::Basic,
        EnemyType::Fast => EnemyKind::Fast,
        EnemyType::Tank => EnemyKind::Tank,
        EnemyType::Elite => EnemyKind::Elite,
        EnemyType::Ranged => EnemyKind::Ranged {
            last_shot: None,
            bullet_damage: (RANGED_BULLET_DAMAGE * rewards).round(),
        },
        EnemyType::Ability => EnemyKind::Ability {
            skill: *rng.choose(&EnemySkill::ALL).unwrap_or(&EnemySkill::Shield),
            last_used: None,
            shield_health: 0.0,
            shield_expires_at: None,
        },
        EnemyType::Ai => EnemyKind::Ai {
            dodge_chance: AI_DODGE_CHANCE,
            last_dodge: None,
            target: position,
            last_player_pos: None,
        },
    };

    Enemy {
        id,
        position,
        radius: base.radius,
        speed: base.speed,
        health,
        max_health: health,
        contact_damage: contact_damage(survival_secs),
        score_value: (base.score * rewards).round() as u64,
        xp_value: (base.xp * rewards).round() as u64,
        damage_flash: 0.0,
        burn: None,
        slow: None,
        shockwave_hit_at: None,
        kind,
    }
}

/// Unscaled ranged-enemy bullet damage.
pub const RANGED_BULLET_DAMAGE: f64 = 15.0;

/// AI-enemy dodge probability.
pub const AI_DODGE_CHANCE: f64 = 0.7;

// =============================================================================
// PROJECTILES
// =============================================================================

/// Pierce budget carried by a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pierce {
    /// Hits left before the projectile is consumed
    pub remaining: u32,
    /// Fraction of damage lost per pierce (0 = none)
    pub damage_reduction: f64,
}

/// Burn applied to whatever the projectile hits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurnPayload {
    /// Damage per burn tick
    pub damage_per_tick: f64,
    /// Total burn window (ms)
    pub duration_ms: Millis,
}

/// A player projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Session-unique id
    pub id: EntityId,
    /// Centre position
    pub position: Vec2,
    /// Displacement per tick
    pub velocity: Vec2,
    /// Collision radius
    pub radius: f64,
    /// Damage on hit
    pub damage: f64,
    /// Total distance moved so far
    pub distance_traveled: f64,
    /// Weapon that fired it
    pub weapon: Weapon,
    /// Pierce budget, if any
    pub pierce: Option<Pierce>,
    /// Burn payload, if any
    pub burn: Option<BurnPayload>,
}

/// Create a player projectile leaving `origin` along `angle`.
///
/// The projectile starts `muzzle_offset` px from `origin` (the player's
/// radius) and moves `speed` px per tick.
pub fn create_player_projectile(
    id: EntityId,
    origin: Vec2,
    angle: f64,
    muzzle_offset: f64,
    speed: f64,
    damage: f64,
    weapon: Weapon,
) -> Projectile {
    let dir = Vec2::from_angle(angle);
    Projectile {
        id,
        position: origin + dir * muzzle_offset,
        velocity: dir * speed,
        radius: PLAYER_PROJECTILE_RADIUS,
        damage,
        distance_traveled: 0.0,
        weapon,
        pierce: None,
        burn: None,
    }
}

/// An enemy projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyProjectile {
    /// Session-unique id
    pub id: EntityId,
    /// Centre position
    pub position: Vec2,
    /// Displacement per tick
    pub velocity: Vec2,
    /// Damage on hit
    pub damage: f64,
    /// Collision radius
    pub radius: f64,
}

impl EnemyProjectile {
    /// Bullet fired from `origin` along `angle`.
    pub fn new(id: EntityId, origin: Vec2, angle: f64, speed: f64, damage: f64, radius: f64) -> Self {
        Self {
            id,
            position: origin,
            velocity: Vec2::from_angle(angle) * speed,
            damage,
            radius,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
