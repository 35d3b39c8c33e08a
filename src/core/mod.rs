//! Core primitives.
//!
//! Seeded randomness, hitbox geometry and state hashing shared by the
//! simulation and the sync layer.

pub mod rng;
pub mod rect;
pub mod hash;

// Re-export core types
pub use rng::SimRng;
pub use rect::{Bounded, Rect};
pub use hash::{compute_state_hash, StateHash, StateHasher};
