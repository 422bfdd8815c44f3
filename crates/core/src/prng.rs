//! Randomness for synthesis: the [`RandomSource`] capability and the
//! deterministic [`Xorshift64`] generator that implements it.
//!
//! Every synthesis function takes `&mut impl RandomSource` instead of reaching
//! for a global generator. Tests inject a seeded `Xorshift64` and get
//! bit-identical output; production code seeds one from [`entropy_seed`].

use serde::{Deserialize, Serialize};

/// Uniform random draws consumed by the synthesis pipeline.
///
/// A source is owned by one generation call at a time (`&mut`), so parallel
/// workers each hold their own and never share draws.
pub trait RandomSource: Send {
    /// Returns a uniformly distributed f64 in [0, 1).
    fn next_f64(&mut self) -> f64;

    /// Returns a uniformly distributed usize in [0, max), or 0 when `max` is 0.
    fn next_usize(&mut self, max: usize) -> usize;

    /// Returns a uniformly distributed f64 in [min, max).
    fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns a uniformly distributed usize in [min, max), or `min` when the
    /// range is empty.
    fn next_usize_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + self.next_usize(max - min)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }

    fn next_usize(&mut self, max: usize) -> usize {
        (**self).next_usize(max)
    }
}

/// Xorshift64 deterministic PRNG. Same seed always produces the same sequence.
///
/// Uses the standard shift parameters (13, 7, 17). Seed of 0 is automatically
/// replaced with a non-zero fallback to avoid the all-zeros fixed point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Fallback seed used when the caller provides 0, which is a fixed point
    /// of the xorshift algorithm.
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a new PRNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Creates a PRNG seeded from [`entropy_seed`].
    pub fn from_entropy() -> Self {
        Self::new(entropy_seed())
    }

    /// Advances the state and returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

impl RandomSource for Xorshift64 {
    /// Uses the upper 53 bits of `next_u64()` divided by 2^53 for full
    /// mantissa precision.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Simple modulo reduction; the bias is negligible at 64-bit state width.
    fn next_usize(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }
}

/// Produces a non-deterministic seed from the thread-local OS-seeded RNG.
pub fn entropy_seed() -> u64 {
    rand::random::<u64>()
}

/// Derives an independent seed for stream `index` from a base seed.
///
/// Uses the splitmix64 finalizer so adjacent indices land far apart in the
/// xorshift state space.
pub fn derive_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
