//! Renderer-side proxies driven by the simulation snapshots
//!
//! The scene owns no simulation state. Proxies start on a grid so something
//! sensible is drawn before the first readback, then planets are placed once
//! and ships are copied from every ship snapshot.

use glam::Vec3;
use gravity_physics::{Planet, Ship};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: f32,
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            scale: 1.0,
        }
    }
}

/// Smallest cube side that holds `count` cells
pub fn grid_side(count: usize) -> usize {
    let mut side = (count as f64).cbrt().floor() as usize;
    while side * side * side < count {
        side += 1;
    }
    side
}

/// `count` points on a cubic grid centred on the origin, x fastest
pub fn grid_layout(count: usize, spacing: f32) -> Vec<Vec3> {
    let side = grid_side(count);
    let offset = (side.saturating_sub(1)) as f32 * spacing * 0.5;

    (0..count)
        .map(|i| {
            let x = i % side;
            let y = (i / side) % side;
            let z = i / (side * side);
            Vec3::new(x as f32, y as f32, z as f32) * spacing - Vec3::splat(offset)
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct ProxyScene {
    pub planets: Vec<Transform>,
    pub ships: Vec<Transform>,
}

impl ProxyScene {
    pub fn with_grid(planet_count: usize, ship_count: usize, spacing: f32) -> Self {
        Self {
            planets: grid_layout(planet_count, spacing)
                .into_iter()
                .map(Transform::at)
                .collect(),
            ships: grid_layout(ship_count, spacing)
                .into_iter()
                .map(Transform::at)
                .collect(),
        }
    }

    /// Planets never move, so this runs once after initialize
    pub fn place_planets(&mut self, planets: &[Planet]) {
        self.planets.clear();
        self.planets.extend(planets.iter().map(|planet| Transform {
            translation: planet.position(),
            scale: planet.radius,
        }));
    }

    pub fn sync_ships(&mut self, ships: &[Ship]) {
        self.ships.resize(ships.len(), Transform::at(Vec3::ZERO));
        for (proxy, ship) in self.ships.iter_mut().zip(ships) {
            proxy.translation = ship.position();
        }
    }
}
