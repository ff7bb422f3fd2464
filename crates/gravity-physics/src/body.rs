//! Planet and ship records shared with the compute shaders

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// GPU-compatible planet record.
///
/// Layout: 24 bytes (6 x f32). The WGSL side declares the position as three
/// scalars so the storage array stride stays at 24 bytes instead of being
/// rounded up to a `vec3` alignment.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Planet {
    /// Position in world space
    pub position: [f32; 3],
    /// Planet radius
    pub radius: f32,
    /// Mass, always `radius * mass_per_radius`
    pub mass: f32,
    pub _padding: f32,
}

impl Planet {
    pub fn new(position: Vec3, radius: f32, mass_per_radius: f32) -> Self {
        Self {
            position: position.to_array(),
            radius,
            mass: radius * mass_per_radius,
            _padding: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Whether `point` lies strictly inside this planet's radius
    pub fn contains(&self, point: Vec3) -> bool {
        self.position().distance(point) < self.radius
    }
}

/// GPU-compatible ship record.
///
/// Layout: 32 bytes (8 x f32), matching two 16-byte aligned `vec3<f32>` + pad
/// pairs in WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Ship {
    /// Position in world space
    pub position: [f32; 3],
    pub _padding0: f32,
    /// Velocity vector
    pub velocity: [f32; 3],
    pub _padding1: f32,
}

impl Ship {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: position.to_array(),
            _padding0: 0.0,
            velocity: velocity.to_array(),
            _padding1: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }

    pub fn speed(&self) -> f32 {
        self.velocity().length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn planet_is_six_floats() {
        assert_eq!(size_of::<Planet>(), 24, "Planet must be 24 bytes for WGSL");
        assert_eq!(offset_of!(Planet, radius), 12);
        assert_eq!(offset_of!(Planet, mass), 16);
    }

    #[test]
    fn ship_is_eight_floats() {
        assert_eq!(size_of::<Ship>(), 32, "Ship must be 32 bytes for WGSL");
        assert_eq!(offset_of!(Ship, velocity), 16);
    }

    #[test]
    fn planet_mass_follows_radius() {
        let planet = Planet::new(Vec3::ZERO, 2.5, 40.0);
        assert_eq!(planet.mass, 100.0);
        assert!(planet.contains(Vec3::new(2.0, 0.0, 0.0)));
        assert!(!planet.contains(Vec3::new(2.5, 0.0, 0.0)));
    }

    #[test]
    fn ship_padding_stays_zeroed() {
        let ship = Ship::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 0.0));
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&ship));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, -1.0, 0.0, 0.0, 0.0]);
        assert_eq!(ship.speed(), 1.0);
    }
}
