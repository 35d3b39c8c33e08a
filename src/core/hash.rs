//! State Hashing
//!
//! SHA-256 digests of simulation state. The host stamps every snapshot with
//! one; clients recompute it after applying the snapshot to spot drift.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Domain-separated SHA-256 hasher.
///
/// Order of updates matters.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Hasher for arena snapshots.
    pub fn for_snapshot() -> Self {
        Self::new(b"ARENA_BRAWL_SNAPSHOT_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 by bit pattern.
    ///
    /// `-0.0` and `0.0` hash differently; both sides run the same arithmetic
    /// so that never matters in practice.
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a snapshot hash.
///
/// The tick goes in first, then whatever the closure adds.
pub fn compute_state_hash<F>(tick: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_snapshot();
    hasher.update_u64(tick);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Short hex prefix for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_snapshot();
            hasher.update_u32(100);
            hasher.update_f32(5.5);
            hasher.update_bool(true);
            hasher.update_str("austin");
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_f32(1.0);
            h.update_f32(2.0);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_f32(2.0);
            h.update_f32(1.0);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let mut a = StateHasher::new(b"DOMAIN_A");
        a.update_bytes(&[1, 2, 3, 4]);
        let mut b = StateHasher::new(b"DOMAIN_B");
        b.update_bytes(&[1, 2, 3, 4]);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(100, |h| h.update_f32(5.0));
        let hash2 = compute_state_hash(100, |h| h.update_f32(5.0));
        let hash3 = compute_state_hash(101, |h| h.update_f32(5.0));

        assert_eq!(hash, hash2);
        assert_ne!(hash, hash3);
        assert_eq!(short_hex(&hash).len(), 12);
    }
}
