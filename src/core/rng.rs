//! Seeded Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. Every random decision the host
//! makes (arena clutter, referee wander, powerup rolls, burst spreads) draws
//! from one of these, so a session replays identically from its seed.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Xorshift128+ generator.
///
/// # Example
///
/// ```
/// use arena_brawl::core::rng::SimRng;
///
/// let mut a = SimRng::new(7);
/// let mut b = SimRng::new(7);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimRng {
    state: [u64; 2],
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SimRng {
    /// Create a new generator from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // All-zero state would lock the generator at zero
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create a generator for a session identifier.
    pub fn for_session(session_id: &str) -> Self {
        Self::new(derive_session_seed(session_id))
    }

    /// Next raw 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Integer in `[0, max)`.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Float in `[0, 1)` built from the top 24 bits.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Float in `[min, max)`.
    #[inline]
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    /// Float in `[-0.5, 0.5)`, the spread used for bursts and sprays.
    #[inline]
    pub fn centered(&mut self) -> f32 {
        self.next_f32() - 0.5
    }

    /// True with the given probability.
    #[inline]
    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Current internal state (for checkpointing).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore a checkpointed state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a seed from a session identifier.
///
/// Every participant derives the same seed for the same session, so whoever
/// ends up holding the host role builds the same arena.
pub fn derive_session_seed(session_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"ARENA_BRAWL_SEED_V1");
    hasher.update(session_id.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(bytes)
}
