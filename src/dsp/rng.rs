//! Per-instance pseudorandom numbers for noise and random waveforms.

use std::sync::atomic::{AtomicU64, Ordering};

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// A small, allocation-free PRNG. Not cryptographically secure.
///
/// `Rng::new()` draws its seed from a process-wide instance counter, so two
/// voices never share a noise stream.
#[derive(Debug, Clone)]
pub struct Rng(oorandom::Rand32);

impl Default for Rng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng {
    pub fn new() -> Self {
        let instance = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::with_seed(instance.wrapping_mul(SEED_STRIDE))
    }

    /// Same seed, same stream. Used for reproducible tables and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self(oorandom::Rand32::new(seed))
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn unipolar(&mut self) -> f32 {
        self.0.rand_float()
    }

    /// Uniform value in [-1, 1).
    #[inline]
    pub fn bipolar(&mut self) -> f32 {
        self.0.rand_float() * 2.0 - 1.0
    }
}
