//! Seeded sampling for numeric corroboration.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;

/// Source of sample points for residual checks and local search.
///
/// Each verifier owns a substream of the policy seed so that adding draws in
/// one verifier never shifts the points another one sees.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Handle seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for substream `substream` of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Uniform draw in `[low, high)`; returns `low` when the interval is empty.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }

    /// Raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// Seed of substream `substream`: SipHash-1-3 with zero keys over both words.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    for word in [master_seed, substream] {
        hasher.write_u64(word);
    }
    hasher.finish()
}
