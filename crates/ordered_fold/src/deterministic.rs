//! Deterministic randomness for reproducible permutations
//!
//! Provides a seedable 64-bit generator whose full state can be captured
//! and restored, so an interrupted training run rebuilds the exact same
//! permutations on resume.

use rand_core::{impls, Error, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::num::Wrapping;

/// Snapshot of a [`RestorableRng`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub state: u64,
    pub calls: u64,
}

/// SplitMix64 generator with save/restore of its internal state
#[derive(Clone, Debug)]
pub struct RestorableRng {
    seed: u64,
    state: Wrapping<u64>,
    calls: u64,
}

impl RestorableRng {
    // Weyl increment and finalizer constants from SplitMix64
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    const MIX1: u64 = 0xBF58_476D_1CE4_E5B9;
    const MIX2: u64 = 0x94D0_49BB_1331_11EB;

    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            state: Wrapping(seed),
            calls: 0,
        }
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of 64-bit draws since construction
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn state(&self) -> RngState {
        RngState {
            seed: self.seed,
            state: self.state.0,
            calls: self.calls,
        }
    }

    pub fn restore(&mut self, snapshot: RngState) {
        self.seed = snapshot.seed;
        self.state = Wrapping(snapshot.state);
        self.calls = snapshot.calls;
    }

    pub fn from_state(snapshot: RngState) -> Self {
        let mut rng = Self::new(snapshot.seed);
        rng.restore(snapshot);
        rng
    }

    fn advance(&mut self) -> u64 {
        self.state += Wrapping(Self::GAMMA);
        self.calls += 1;
        let mut z = self.state.0;
        z = (z ^ (z >> 30)).wrapping_mul(Self::MIX1);
        z = (z ^ (z >> 27)).wrapping_mul(Self::MIX2);
        z ^ (z >> 31)
    }
}

impl RngCore for RestorableRng {
    fn next_u32(&mut self) -> u32 {
        (self.advance() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.advance()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RestorableRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
