//! Game Events
//!
//! Transient descriptors emitted during a tick. Visual events only tell a
//! renderer where to draw an effect and are capped per tick; gameplay
//! events (kills, damage, level-ups, game over) are never dropped.

use serde::{Serialize, Deserialize};

use crate::core::clock::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::AbilityId;
use crate::game::effects::EffectKind;
use crate::game::entity::{EnemySkill, EnemyType, EntityId};

/// What hurt the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    /// Enemy body contact
    Contact,
    /// Enemy bullet
    Projectile,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    // ===== Gameplay =====

    /// Enemy died and paid out its rewards
    EnemyKilled {
        enemy_id: EntityId,
        enemy_type: EnemyType,
        score: u64,
        xp: u64,
    },

    /// Player lost health
    PlayerDamaged {
        amount: f64,
        source: DamageSource,
    },

    /// An ability fired
    AbilityTriggered {
        ability: AbilityId,
        level: u8,
    },

    /// A timed effect ran out
    EffectExpired {
        kind: EffectKind,
    },

    /// Player levelled up and the upgrade menu opened
    LevelUp {
        level: u32,
        next_level_xp: u64,
        card_count: usize,
    },

    /// Player died
    GameOver {
        score: u64,
        level: u32,
        survival_secs: u32,
    },

    // ===== Visual =====

    /// Aura or burst centred on the player when an ability fires
    AbilityCast {
        ability: AbilityId,
        position: Vec2,
        radius: f64,
    },

    /// Area damage flash
    Explosion {
        position: Vec2,
        radius: f64,
    },

    /// Chain lightning path, starting at the player
    LightningChain {
        path: Vec<Vec2>,
    },

    /// Laser beam segment
    LaserBeam {
        start: Vec2,
        end: Vec2,
        width: f64,
    },

    /// Meteor target marker
    MeteorWarning {
        position: Vec2,
        radius: f64,
        impact_at: Millis,
    },

    /// Volley arrow landed
    VolleyImpact {
        position: Vec2,
        radius: f64,
    },

    /// Spirit blade struck an enemy
    BladeHit {
        position: Vec2,
    },

    /// Enemy knocked back by the shield
    ShieldPush {
        position: Vec2,
    },

    /// Enemy bullet absorbed by the shield
    ShieldImpact {
        position: Vec2,
    },

    /// Burn tick on an enemy
    BurnTick {
        position: Vec2,
    },

    /// Projectile pierced an enemy
    PierceImpact {
        position: Vec2,
    },

    /// Bloodthirst execution
    BloodthirstKill {
        position: Vec2,
    },

    /// AI enemy sidestepped a projectile
    EnemyDodged {
        enemy_id: EntityId,
        position: Vec2,
    },

    /// Ability enemy used its skill
    EnemySkillUsed {
        enemy_id: EntityId,
        skill: EnemySkill,
        position: Vec2,
    },
}

impl GameEventData {
    /// Visual events are subject to the per-tick cap.
    pub fn is_visual(&self) -> bool {
        !matches!(
            self,
            GameEventData::EnemyKilled { .. }
                | GameEventData::PlayerDamaged { .. }
                | GameEventData::AbilityTriggered { .. }
                | GameEventData::EffectExpired { .. }
                | GameEventData::LevelUp { .. }
                | GameEventData::GameOver { .. }
        )
    }
}

/// A game event with its timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Clock time when the event occurred
    pub at: Millis,
    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(at: Millis, data: GameEventData) -> Self {
        Self { at, data }
    }

    /// Shorthand for [`GameEventData::is_visual`].
    #[inline]
    pub fn is_visual(&self) -> bool {
        self.data.is_visual()
    }
}

/// Per-tick event buffer that enforces the visual-event cap.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBuffer {
    events: Vec<GameEvent>,
    visual_count: usize,
    dropped_visual: usize,
}

impl EventBuffer {
    /// Append an event. Visual events past `visual_cap` are silently dropped.
    pub fn push(&mut self, event: GameEvent, visual_cap: usize) {
        if event.is_visual() {
            if self.visual_count >= visual_cap {
                self.dropped_visual += 1;
                return;
            }
            self.visual_count += 1;
        }
        self.events.push(event);
    }

    /// Drain all buffered events and reset the counters.
    pub fn take(&mut self) -> Vec<GameEvent> {
        self.visual_count = 0;
        self.dropped_visual = 0;
        std::mem::take(&mut self.events)
    }

    /// Buffered events.
    pub fn as_slice(&self) -> &[GameEvent] {
        &self.events
    }

    /// Visual events dropped since the last drain.
    pub fn dropped_visual(&self) -> usize {
        self.dropped_visual
    }
}

// =============================================================================
// TESTS
// =============================================================================
