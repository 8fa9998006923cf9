//! # Ember Siege
//!
//! Simulation core for a single-player top-down survival shooter: waves of
//! enemies close in, the player's weapon fires automatically, and level-ups
//! offer stat and ability upgrades.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       EMBER SIEGE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Simulation-independent primitives        │
//! │  ├── vec2.rs      - 2D vector math                           │
//! │  ├── rng.rs       - Seeded Xorshift128+ PRNG                 │
//! │  ├── hash.rs      - SHA-256 state hashing                    │
//! │  └── clock.rs     - Injected millisecond clock               │
//! │                                                              │
//! │  game/            - The simulation                           │
//! │  ├── entity.rs    - Weapons, enemies, projectiles            │
//! │  ├── effects.rs   - Timed player buffs                       │
//! │  ├── spawner.rs   - Spawn pacing and placement               │
//! │  ├── behavior.rs  - Enemy movement and skills                │
//! │  ├── combat.rs    - Auto-fire, hits, contact, rewards        │
//! │  ├── ability.rs   - Ability triggers and summons             │
//! │  ├── progression.rs - XP, level-ups, upgrade cards           │
//! │  ├── state.rs     - Session state                            │
//! │  ├── tick.rs      - Frame driver, session boundary           │
//! │  └── snapshot.rs  - Versioned export/import                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Time is never read inside the simulation. Each tick receives a
//! millisecond timestamp from a [`Clock`](core::clock::Clock), all
//! randomness comes from the seeded PRNG owned by the state, and ordered
//! maps keep iteration stable. A seed plus a recorded sequence of
//! `(timestamp, input)` pairs replays to the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::clock::{Clock, ManualClock, Millis, SystemClock};
pub use core::rng::DeterministicRng;
pub use core::vec2::Vec2;
pub use game::error::{SimError, SimResult};
pub use game::input::InputFrame;
pub use game::state::{SessionPhase, SimulationState};
pub use game::tick::{SimConfig, Simulation, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Nominal frame length in milliseconds, used for per-frame decays
pub const FRAME_MS: Millis = 16;

/// Maximum live player projectiles
pub const MAX_PLAYER_PROJECTILES: usize = 100;

/// Maximum live enemy projectiles
pub const MAX_ENEMY_PROJECTILES: usize = 50;

/// Maximum visual events recorded per tick
pub const MAX_VISUAL_EVENTS: usize = 30;
