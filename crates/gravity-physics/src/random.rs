//! Counter-based random streams.
//!
//! Every planet and ship draws from its own stream, seeded purely from
//! `(seed, index, salt)`. The same hash runs in `common.wgsl`, so a stream is
//! independent of dispatch grouping and reproducible on the CPU.

use glam::Vec3;

/// Salt for the planet population's streams
pub const PLANET_STREAM_SALT: u32 = 0x9e37_79b9;
/// Salt for the ship population's streams
pub const SHIP_STREAM_SALT: u32 = 0x85eb_ca6b;

/// PCG-RXS-M-XS style 32-bit hash
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRng {
    state: u32,
}

impl IndexRng {
    pub fn new(seed: u32, index: u32, salt: u32) -> Self {
        Self {
            state: pcg_hash(pcg_hash(seed ^ salt).wrapping_add(index)),
        }
    }

    pub fn planet(seed: u32, index: u32) -> Self {
        Self::new(seed, index, PLANET_STREAM_SALT)
    }

    pub fn ship(seed: u32, index: u32) -> Self {
        Self::new(seed, index, SHIP_STREAM_SALT)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = pcg_hash(self.state);
        self.state
    }

    /// Uniform in `[0, 1)` with 24 bits of precision
    pub fn next_unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    pub fn next_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_unit()
    }

    /// Uniform point in the axis-aligned box, sampled x then y then z
    pub fn next_in_box(&mut self, min: Vec3, max: Vec3) -> Vec3 {
        let x = self.next_range(min.x, max.x);
        let y = self.next_range(min.y, max.y);
        let z = self.next_range(min.z, max.z);
        Vec3::new(x, y, z)
    }

    /// Uniform direction on the unit sphere (Archimedes' projection)
    pub fn next_direction(&mut self) -> Vec3 {
        let z = self.next_unit() * 2.0 - 1.0;
        let phi = self.next_unit() * std::f32::consts::TAU;
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }
}
