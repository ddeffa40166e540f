//! World Digest
//!
//! SHA-256 over the replicated parts of a peer's world. Two peers that
//! observed the same throws produce the same digest.

use sha2::{Sha256, Digest};
use super::vec3::{Vec3, Rotator};

/// Hash output type (256 bits / 32 bytes)
pub type WorldHash = [u8; 32];

/// Hasher for world state.
///
/// Order of updates is significant.
pub struct WorldHasher {
    hasher: Sha256,
}

impl WorldHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for the bomb field.
    pub fn for_bomb_field() -> Self {
        Self::new(b"BLAST_ARENA_BOMBS_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a position, bit-exact.
    #[inline]
    pub fn update_vec3(&mut self, value: Vec3) {
        for bits in value.to_bits() {
            self.update_u32(bits);
        }
    }

    /// Update with an orientation, bit-exact.
    #[inline]
    pub fn update_rotator(&mut self, value: Rotator) {
        for bits in value.to_bits() {
            self.update_u32(bits);
        }
    }

    /// Update with a 16-byte id.
    #[inline]
    pub fn update_id(&mut self, id: &[u8; 16]) {
        self.hasher.update(id);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> WorldHash {
        self.hasher.finalize().into()
    }
}
