//! Summary statistics over a ship snapshot

use glam::Vec3;

use crate::body::Ship;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShipStats {
    pub count: usize,
    pub centroid: Vec3,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Ships whose position lies outside `[area_min, area_max]`
    pub outside_area: usize,
}

impl ShipStats {
    pub fn from_ships(ships: &[Ship], area_min: Vec3, area_max: Vec3) -> Self {
        if ships.is_empty() {
            return Self {
                count: 0,
                centroid: Vec3::ZERO,
                min_speed: 0.0,
                max_speed: 0.0,
                outside_area: 0,
            };
        }

        let mut sum = Vec3::ZERO;
        let mut min_speed = f32::INFINITY;
        let mut max_speed = 0.0f32;
        let mut outside_area = 0;

        for ship in ships {
            let position = ship.position();
            sum += position;

            let speed = ship.speed();
            min_speed = min_speed.min(speed);
            max_speed = max_speed.max(speed);

            if !(position.cmpge(area_min).all() && position.cmple(area_max).all()) {
                outside_area += 1;
            }
        }

        Self {
            count: ships.len(),
            centroid: sum / ships.len() as f32,
            min_speed,
            max_speed,
            outside_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_all_zero() {
        let stats = ShipStats::from_ships(&[], Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.centroid, Vec3::ZERO);
    }

    #[test]
    fn summarises_positions_and_speeds() {
        let ships = [
            Ship::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 0.0)),
            Ship::new(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO),
        ];
        let stats = ShipStats::from_ships(&ships, Vec3::splat(-2.0), Vec3::splat(2.0));
        assert_eq!(stats.count, 2);
        assert_eq!(stats.centroid, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(stats.min_speed, 0.0);
        assert_eq!(stats.max_speed, 5.0);
        assert_eq!(stats.outside_area, 1);
    }
}
