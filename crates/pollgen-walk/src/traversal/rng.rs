//! Seeded RNG construction with ChaCha8.
//!
//! The walk engine draws from one generator seeded once, so the same seed and
//! the same graph always reproduce the same walks. Node actions that need
//! their own randomness take a separate stream so they never perturb the
//! engine's draws.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator for the walk engine itself.
pub fn walk_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generator for an independent stream derived from `(seed + stream)`.
pub fn walk_rng_for(seed: u64, stream: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_add(stream))
}

/// True with probability `value`.
///
/// Meant for branching inside node actions. Values at or above 1 are always
/// true; values at or below 0 are always false.
pub fn chance<R: Rng>(rng: &mut R, value: f64) -> bool {
    rng.gen::<f64>() < value
}
