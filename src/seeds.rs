//! Seed management for world generation
//!
//! Every generation pass reseeds the generator's RNG from the master seed and
//! draws three sub-seeds from it, one per synthesized field. Domain warps are
//! seeded from pairwise sums so each field's warp is independent of the field
//! it perturbs.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Weyl increment used to spread per-octave seeds.
const OCTAVE_SEED_STEP: u32 = 0x9E37_79B9;

/// Default master seed for generators constructed without one.
pub const DEFAULT_SEED: u64 = 0x1337_BABE_1337_D00D;

/// The three field sub-seeds of one generation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSeeds {
    /// Terrain (height) seed
    pub a: u32,
    /// Heat seed
    pub b: u32,
    /// Moisture seed
    pub c: u32,
}

impl FieldSeeds {
    /// Draw the sub-seeds from an RNG that was just reseeded with the master seed.
    pub fn draw(rng: &mut ChaCha8Rng) -> Self {
        Self {
            a: rng.gen(),
            b: rng.gen(),
            c: rng.gen(),
        }
    }

    pub fn terrain(&self) -> u32 {
        self.a
    }

    pub fn terrain_warp(&self) -> u32 {
        self.a.wrapping_add(self.b)
    }

    pub fn heat(&self) -> u32 {
        self.b
    }

    pub fn heat_warp(&self) -> u32 {
        self.b.wrapping_add(self.c)
    }

    pub fn moisture(&self) -> u32 {
        self.c
    }

    pub fn moisture_warp(&self) -> u32 {
        self.c.wrapping_add(self.a)
    }
}

/// Seed for one octave of a multi-octave noise generator.
pub fn octave_seed(base: u32, octave: usize) -> u32 {
    base.wrapping_add(OCTAVE_SEED_STEP.wrapping_mul(octave as u32 + 1))
}
