//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(model, index)`
//! pair, e.g. `("isolation_forest", 17)` for the 18th isolation tree. Sub-seeds
//! are derived via BLAKE3 hashing, so every tree's randomness is fixed by the
//! master seed and its own position alone.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Stream label for isolation trees.
pub const ISOLATION_STREAM: &str = "isolation_forest";
/// Stream label for classifier trees.
pub const CLASSIFIER_STREAM: &str = "direction_forest";

/// Deterministic RNG hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (stream, index).
    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Create a seeded StdRng from a sub-seed.
    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}
