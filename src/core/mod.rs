//! Core primitives.
//!
//! Simulation-independent building blocks: vector math, the seeded PRNG,
//! state hashing and the injected clock.

pub mod vec2;
pub mod rng;
pub mod hash;
pub mod clock;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
