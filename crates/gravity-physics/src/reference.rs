//! CPU versions of the three compute kernels
//!
//! NOTE: These mirror `init.wgsl` and `update.wgsl` statement for statement
//! (same random streams, same operation order) and exist for documentation and
//! testing. The simulation itself runs on the GPU. Results agree with the GPU
//! within float tolerance; transcendental functions and fused multiply-adds may
//! differ in the last bits.

use glam::Vec3;

use crate::body::{Planet, Ship};
use crate::params::{GpuParams, FLAG_AVOID_PLANETS, FLAG_BOUNCE, FLAG_WRAP, SPAWN_ATTEMPTS};
use crate::random::IndexRng;

/// Planet `index` as written by the `init_planets` kernel
pub fn init_planet(params: &GpuParams, index: u32) -> Planet {
    let mut rng = IndexRng::planet(params.seed(), index);
    let position = rng.next_in_box(params.area_min(), params.area_max());
    let (radius_min, radius_max) = params.radius_range();
    let radius = rng.next_range(radius_min, radius_max);
    Planet::new(position, radius, params.mass_per_radius())
}

pub fn init_planets(params: &GpuParams) -> Vec<Planet> {
    (0..params.planet_count())
        .map(|index| init_planet(params, index))
        .collect()
}

fn inside_any_planet(planets: &[Planet], point: Vec3) -> bool {
    planets.iter().any(|planet| planet.contains(point))
}

/// Ship `index` as written by the `init_ships` kernel
pub fn init_ship(params: &GpuParams, planets: &[Planet], index: u32) -> Ship {
    let mut rng = IndexRng::ship(params.seed(), index);
    let (area_min, area_max) = (params.area_min(), params.area_max());

    let mut position = rng.next_in_box(area_min, area_max);
    if params.has_flag(FLAG_AVOID_PLANETS) {
        let mut attempt = 1;
        while attempt < SPAWN_ATTEMPTS && inside_any_planet(planets, position) {
            position = rng.next_in_box(area_min, area_max);
            attempt += 1;
        }
    }

    let (speed_min, speed_max) = params.speed_range();
    let speed = rng.next_range(speed_min, speed_max);
    let direction = rng.next_direction();
    Ship::new(position, direction * speed)
}

pub fn init_ships(params: &GpuParams, planets: &[Planet]) -> Vec<Ship> {
    (0..params.ship_count())
        .map(|index| init_ship(params, planets, index))
        .collect()
}

/// Gravitational acceleration at `position` from every planet.
///
/// The distance in the force law never drops below `min_distance`; a ship
/// sitting exactly on a planet centre gets no pull from it.
pub fn planet_acceleration(params: &GpuParams, planets: &[Planet], position: Vec3) -> Vec3 {
    let g = params.gravitational_constant();
    let min_distance = params.min_distance();

    let mut accel = Vec3::ZERO;
    for planet in planets {
        let d = planet.position() - position;
        let len = d.length();
        let dist = len.max(min_distance);
        let dir = if len > 0.0 { d / len } else { Vec3::ZERO };
        accel += g * planet.mass * dir / (dist * dist);
    }
    accel
}

fn bounce(params: &GpuParams, position: &mut Vec3, velocity: &mut Vec3) {
    let (min, max) = (params.area_min(), params.area_max());
    let damping = params.bounce_damping();
    for axis in 0..3 {
        if position[axis] > max[axis] {
            position[axis] = max[axis];
            velocity[axis] = -velocity[axis].abs() * damping;
        } else if position[axis] < min[axis] {
            position[axis] = min[axis];
            velocity[axis] = velocity[axis].abs() * damping;
        }
    }
}

fn wrap(params: &GpuParams, position: &mut Vec3) {
    let (min, max) = (params.area_min(), params.area_max());
    for axis in 0..3 {
        if position[axis] < min[axis] || position[axis] >= max[axis] {
            let size = max[axis] - min[axis];
            let offset = position[axis] - min[axis];
            position[axis] = min[axis] + offset - size * (offset / size).floor();
        }
    }
}

/// One `update_ships` invocation: semi-implicit Euler, then edge handling
pub fn update_ship(params: &GpuParams, planets: &[Planet], ship: &mut Ship) {
    let dt = params.delta_time();
    let mut position = ship.position();
    let mut velocity = ship.velocity();

    let accel = planet_acceleration(params, planets, position);
    velocity += accel * dt;
    position += velocity * dt;

    if params.has_flag(FLAG_BOUNCE) {
        bounce(params, &mut position, &mut velocity);
    } else if params.has_flag(FLAG_WRAP) {
        wrap(params, &mut position);
    }

    *ship = Ship::new(position, velocity);
}

pub fn update_ships(params: &GpuParams, planets: &[Planet], ships: &mut [Ship]) {
    let count = params.ship_count() as usize;
    for ship in ships.iter_mut().take(count) {
        update_ship(params, planets, ship);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> GpuParams {
        GpuParams {
            area_min: [-10.0, -10.0, -10.0, 1.0],
            area_max: [10.0, 10.0, 10.0, 1.0],
            ranges: [1.0, 3.0, 0.5, 2.0],
            physics: [100.0, 0.5, 0.1, 0.0],
            counts: [4, 32, 1234, 0],
        }
    }

    #[test]
    fn planets_are_deterministic_and_massed_by_radius() {
        let params = params();
        let first = init_planets(&params);
        let second = init_planets(&params);
        assert_eq!(first, second);
        for planet in &first {
            assert_eq!(planet.mass, planet.radius * 100.0);
            assert!((1.0..=3.0).contains(&planet.radius));
        }
    }

    #[test]
    fn ships_spawn_in_box_with_speed_in_range() {
        let params = params();
        let planets = init_planets(&params);
        for ship in init_ships(&params, &planets) {
            let p = ship.position();
            assert!(p.cmpge(params.area_min()).all() && p.cmple(params.area_max()).all());
            assert!(ship.speed() >= 0.5 - 1e-4 && ship.speed() <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn spawn_avoidance_moves_ships_out_of_planets() {
        let mut params = params();
        // one huge planet swallowing half the box
        params.ranges[0] = 9.0;
        params.ranges[1] = 9.0;
        params.counts[0] = 1;
        params.counts[1] = 256;
        let planets = init_planets(&params);

        let inside = |ships: &[Ship]| {
            ships
                .iter()
                .filter(|s| inside_any_planet(&planets, s.position()))
                .count()
        };

        let plain = init_ships(&params, &planets);
        params.counts[3] |= FLAG_AVOID_PLANETS;
        let avoided = init_ships(&params, &planets);
        assert!(inside(&avoided) < inside(&plain));
    }

    #[test]
    fn single_planet_pull_uses_updated_velocity() {
        let mut params = params();
        params.area_min = [-100.0, -100.0, -100.0, 1.0];
        params.area_max = [100.0, 100.0, 100.0, 1.0];
        params.counts = [1, 1, 0, 0];
        let planets = [Planet::new(Vec3::ZERO, 1.0, 100.0)];
        let mut ship = Ship::new(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO);

        update_ship(&params, &planets, &mut ship);

        assert_eq!(ship.velocity(), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(ship.position(), Vec3::new(9.0, 0.0, 0.0));
    }

    #[test]
    fn coincident_ship_gets_finite_acceleration() {
        let params = params();
        let planets = [Planet::new(Vec3::new(1.0, 2.0, 3.0), 2.0, 100.0)];
        let accel = planet_acceleration(&params, &planets, Vec3::new(1.0, 2.0, 3.0));
        assert!(accel.is_finite());
        assert_eq!(accel, Vec3::ZERO);

        // just off-centre the clamp caps the magnitude at G * m / min_distance^2
        let near = planet_acceleration(&params, &planets, Vec3::new(1.0, 2.0, 3.001));
        assert_relative_eq!(near.length(), 200.0 / (0.1 * 0.1), max_relative = 1e-4);
    }

    #[test]
    fn zero_gravity_moves_ballistically() {
        let mut params = params();
        params.area_min[3] = 0.0;
        params.set_delta_time(0.5);
        let planets = init_planets(&params);
        let mut ship = Ship::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, -4.0, 0.0));

        update_ship(&params, &planets, &mut ship);

        assert_eq!(ship.velocity(), Vec3::new(2.0, -4.0, 0.0));
        assert_eq!(ship.position(), Vec3::new(2.0, -1.0, 1.0));
    }

    #[test]
    fn bounce_clamps_and_damps() {
        let mut params = params();
        params.area_min[3] = 0.0;
        params.counts[3] = FLAG_BOUNCE;
        let mut ship = Ship::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0));

        update_ship(&params, &[], &mut ship);

        assert_eq!(ship.position().x, 10.0);
        assert_eq!(ship.velocity().x, -2.0);
    }

    #[test]
    fn bounce_keeps_ships_in_box() {
        let mut params = params();
        params.counts[3] = FLAG_BOUNCE;
        params.set_delta_time(0.05);
        let planets = init_planets(&params);
        let mut ships = init_ships(&params, &planets);

        for _ in 0..500 {
            update_ships(&params, &planets, &mut ships);
            for ship in &ships {
                let p = ship.position();
                assert!(p.cmpge(params.area_min()).all() && p.cmple(params.area_max()).all());
            }
        }
    }

    #[test]
    fn wrap_reenters_from_opposite_side() {
        let mut params = params();
        params.area_min[3] = 0.0;
        params.counts[3] = FLAG_WRAP;
        let mut ship = Ship::new(Vec3::new(9.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));

        update_ship(&params, &[], &mut ship);

        assert_relative_eq!(ship.position().x, -8.0, epsilon = 1e-5);
        assert_eq!(ship.velocity().x, 3.0);
    }

    #[test]
    fn drift_lets_ships_leave() {
        let mut params = params();
        params.area_min[3] = 0.0;
        let mut ship = Ship::new(Vec3::new(9.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));

        update_ship(&params, &[], &mut ship);

        assert_eq!(ship.position().x, 12.0);
    }
}
