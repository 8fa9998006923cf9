//! Game Logic Module
//!
//! The survival-shooter simulation. Deterministic given a seed and the
//! timestamps handed to each tick.
//!
//! ## Module Structure
//!
//! - `entity`: Weapons, enemy variants, projectiles
//! - `effects`: Timed player buffs
//! - `spawner`: Enemy spawn pacing and placement
//! - `collision`: Overlap tests, targeting, enemy separation
//! - `behavior`: Enemy movement and type-specific actions
//! - `combat`: Auto-fire, hits, contact damage, death reaping
//! - `ability`: Ability triggers and summoned effects
//! - `progression`: XP, level-ups, upgrade cards
//! - `state`: Session and player state
//! - `tick`: Frame driver and session boundary
//! - `snapshot`: Versioned export/import
//! - `events`: Gameplay and visual events

pub mod ability;
pub mod behavior;
pub mod collision;
pub mod combat;
pub mod effects;
pub mod entity;
pub mod error;
pub mod events;
pub mod input;
pub mod progression;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod tick;

// Re-export key types
pub use ability::{AbilityId, Summon};
pub use effects::{ActiveEffect, ActiveEffects, EffectKind};
pub use entity::{Enemy, EnemyKind, EnemyType, EntityId, Projectile, EnemyProjectile, Weapon};
pub use error::{SimError, SimResult};
pub use events::{GameEvent, GameEventData};
pub use input::{InputFrame, UpgradeCategory};
pub use progression::{StatKind, UpgradeCard, UpgradeChoice};
pub use snapshot::{StateSnapshot, SNAPSHOT_VERSION};
pub use state::{PlayerState, SessionPhase, SimulationState};
pub use tick::{tick, SimConfig, Simulation, TickResult};
