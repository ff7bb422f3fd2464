//! Packed parameter block uploaded as the kernels' uniform buffer

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// `counts.w` bit: reflect ships off the area bounds
pub const FLAG_BOUNCE: u32 = 1;
/// `counts.w` bit: wrap ships around the area bounds (only without bounce)
pub const FLAG_WRAP: u32 = 1 << 1;
/// `counts.w` bit: re-sample ship spawn positions that fall inside a planet
pub const FLAG_AVOID_PLANETS: u32 = 1 << 2;

/// Maximum number of spawn positions drawn per ship when avoiding planets
pub const SPAWN_ATTEMPTS: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuParams {
    // xyz: area_min, w: G
    pub area_min: [f32; 4],

    // xyz: area_max, w: delta_time
    pub area_max: [f32; 4],

    // x: radius_min, y: radius_max, z: speed_min, w: speed_max
    pub ranges: [f32; 4],

    // x: mass_per_radius, y: bounce_damping, z: min_distance, w: padding
    pub physics: [f32; 4],

    // x: planet_count, y: ship_count, z: seed, w: flags
    pub counts: [u32; 4],
}

impl GpuParams {
    /// Byte offset of the delta time word, rewritten before every update dispatch
    pub const DELTA_TIME_OFFSET: u64 = 28;

    pub fn area_min(&self) -> Vec3 {
        Vec3::new(self.area_min[0], self.area_min[1], self.area_min[2])
    }

    pub fn area_max(&self) -> Vec3 {
        Vec3::new(self.area_max[0], self.area_max[1], self.area_max[2])
    }

    pub fn gravitational_constant(&self) -> f32 {
        self.area_min[3]
    }

    pub fn delta_time(&self) -> f32 {
        self.area_max[3]
    }

    pub fn set_delta_time(&mut self, delta_time: f32) {
        self.area_max[3] = delta_time;
    }

    pub fn radius_range(&self) -> (f32, f32) {
        (self.ranges[0], self.ranges[1])
    }

    pub fn speed_range(&self) -> (f32, f32) {
        (self.ranges[2], self.ranges[3])
    }

    pub fn mass_per_radius(&self) -> f32 {
        self.physics[0]
    }

    pub fn bounce_damping(&self) -> f32 {
        self.physics[1]
    }

    pub fn min_distance(&self) -> f32 {
        self.physics[2]
    }

    pub fn planet_count(&self) -> u32 {
        self.counts[0]
    }

    pub fn ship_count(&self) -> u32 {
        self.counts[1]
    }

    pub fn seed(&self) -> u32 {
        self.counts[2]
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.counts[3] & flag != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn params_size_matches_wgsl() {
        assert_eq!(size_of::<GpuParams>(), 80);
    }

    #[test]
    fn delta_time_offset_points_at_area_max_w() {
        assert_eq!(
            GpuParams::DELTA_TIME_OFFSET as usize,
            offset_of!(GpuParams, area_max) + 3 * size_of::<f32>()
        );

        let mut params = GpuParams::zeroed();
        params.set_delta_time(0.25);
        let bytes = bytemuck::bytes_of(&params);
        let offset = GpuParams::DELTA_TIME_OFFSET as usize;
        assert_eq!(&bytes[offset..offset + 4], &0.25f32.to_ne_bytes());
    }

    #[test]
    fn flags_are_independent_bits() {
        let mut params = GpuParams::zeroed();
        params.counts[3] = FLAG_BOUNCE | FLAG_AVOID_PLANETS;
        assert!(params.has_flag(FLAG_BOUNCE));
        assert!(!params.has_flag(FLAG_WRAP));
        assert!(params.has_flag(FLAG_AVOID_PLANETS));
    }
}
