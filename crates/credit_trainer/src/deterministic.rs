//! Deterministic utilities for reproducible training
//!
//! Every random stream in the trainer (per-tree bootstrap, per-bin shuffle,
//! the generator itself) is derived from the single pipeline seed, so a run
//! is reproducible regardless of thread scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;

/// Stream tags keep independent consumers of the same base seed apart
pub mod stream {
    pub const SPLIT: u64 = 1;
    pub const RANDOM_FOREST: u64 = 2;
    pub const EXTRA_TREES: u64 = 3;
}

/// xxhash64-style mix of a base seed with a sequence of words
pub fn mix_seed(seed: u64, words: &[u64]) -> u64 {
    const PRIME1: u64 = 0x9E37_79B1_85EB_CA87;
    const PRIME2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    const PRIME3: u64 = 0x1656_67B1_9E37_79F9;
    const PRIME5: u64 = 0x85EB_CA77_C2B2_AE63;

    let mut h = seed.wrapping_add(PRIME5);

    for &word in words {
        h = h.wrapping_add(word.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// RNG for item `index` of stream `tag` under `seed`
pub fn derived_rng(seed: u64, tag: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(mix_seed(seed, &[tag, index]))
}

/// Deterministic ordering for equal-gain split candidates:
/// lower feature index first, then lower threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }

    pub fn ordering(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then_with(|| self.threshold.total_cmp(&other.threshold))
    }
}
