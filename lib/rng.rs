//! Seeded random-number streams.
//!
//! Every sampling routine takes an explicit `&mut impl Rng`. For parallel work,
//! each worker gets its own [`StdRng`] whose seed is derived from a master seed
//! and the worker's substream index with SipHash-1-3 under fixed zero keys, so
//! results depend only on `(master, index)` and not on scheduling.

use std::hash::Hasher;
use rand::{ rngs::StdRng, SeedableRng };
use siphasher::sip::SipHasher13;

/// Derive the seed for substream `index` of `master`.
pub fn substream_seed(master: u64, index: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master);
    hasher.write_u64(index);
    hasher.finish()
}

/// Create a seeded generator.
pub fn seeded(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

/// Create the generator for substream `index` of `master`.
pub fn substream(master: u64, index: u64) -> StdRng {
    seeded(substream_seed(master, index))
}
