//! Run configuration and its packing into the GPU parameter block

use glam::Vec3;
use gravity_physics::{GpuParams, FLAG_AVOID_PLANETS, FLAG_BOUNCE, FLAG_WRAP};

use crate::error::ConfigError;

/// What happens at the area bounds when `bounce` is off
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeMode {
    /// Ships are free to leave the area
    #[default]
    Drift,
    /// Ships leaving one face re-enter through the opposite one
    Wrap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    // Populations
    pub planet_count: u32,
    pub ship_count: u32,

    // Spawn area, also the bounce/wrap box
    pub area_min: Vec3,
    pub area_max: Vec3,

    // Planet generation
    pub radius_range: (f32, f32),
    pub mass_per_radius: f32,

    // Ship generation
    pub speed_range: (f32, f32),
    pub avoid_planets_on_spawn: bool,

    // Physics
    pub gravitational_constant: f32,
    pub bounce: bool,
    pub bounce_damping: f32,
    pub edge_mode: EdgeMode,
    pub min_distance: f32,

    pub seed: u32,

    /// Upper bound on `planet_count * ship_count`, the per-frame work of the update kernel
    pub max_interactions_per_step: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            planet_count: 8,
            ship_count: 4096,
            area_min: Vec3::splat(-50.0),
            area_max: Vec3::splat(50.0),
            radius_range: (1.0, 5.0),
            mass_per_radius: 100.0,
            speed_range: (0.0, 5.0),
            avoid_planets_on_spawn: false,
            gravitational_constant: 1.0,
            bounce: true,
            bounce_damping: 0.8,
            edge_mode: EdgeMode::Drift,
            min_distance: 1.0,
            seed: 0,
            max_interactions_per_step: 1 << 26,
        }
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name })
    }
}

fn ordered_non_negative(name: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    finite(name, min)?;
    finite(name, max)?;
    if min < 0.0 || min > max {
        return Err(ConfigError::InvalidRange { name, min, max });
    }
    Ok(())
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.planet_count == 0 {
            return Err(ConfigError::ZeroCount {
                what: "planet_count",
            });
        }
        if self.ship_count == 0 {
            return Err(ConfigError::ZeroCount { what: "ship_count" });
        }

        for (axis, (min, max)) in ['x', 'y', 'z']
            .into_iter()
            .zip(self.area_min.to_array().into_iter().zip(self.area_max.to_array()))
        {
            finite("area_min", min)?;
            finite("area_max", max)?;
            if min >= max {
                return Err(ConfigError::EmptyArea { axis, min, max });
            }
        }

        ordered_non_negative("radius_range", self.radius_range)?;
        ordered_non_negative("speed_range", self.speed_range)?;

        finite("mass_per_radius", self.mass_per_radius)?;
        if self.mass_per_radius < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "mass_per_radius",
                value: self.mass_per_radius,
                min: 0.0,
                max: f32::INFINITY,
            });
        }

        finite("gravitational_constant", self.gravitational_constant)?;

        finite("bounce_damping", self.bounce_damping)?;
        if !(0.0..=1.0).contains(&self.bounce_damping) {
            return Err(ConfigError::OutOfRange {
                name: "bounce_damping",
                value: self.bounce_damping,
                min: 0.0,
                max: 1.0,
            });
        }

        finite("min_distance", self.min_distance)?;
        if self.min_distance <= 0.0 {
            return Err(ConfigError::NonPositiveMinDistance(self.min_distance));
        }

        let interactions = u64::from(self.planet_count) * u64::from(self.ship_count);
        if interactions > self.max_interactions_per_step {
            return Err(ConfigError::WorkloadTooLarge {
                interactions,
                limit: self.max_interactions_per_step,
            });
        }

        Ok(())
    }

    fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.bounce {
            flags |= FLAG_BOUNCE;
        } else if self.edge_mode == EdgeMode::Wrap {
            flags |= FLAG_WRAP;
        }
        if self.avoid_planets_on_spawn {
            flags |= FLAG_AVOID_PLANETS;
        }
        flags
    }

    /// Pack into the uniform block layout shared with the shaders
    pub fn to_gpu_params(&self, delta_time: f32) -> GpuParams {
        GpuParams {
            area_min: self.area_min.extend(self.gravitational_constant).to_array(),
            area_max: self.area_max.extend(delta_time).to_array(),
            ranges: [
                self.radius_range.0,
                self.radius_range.1,
                self.speed_range.0,
                self.speed_range.1,
            ],
            physics: [self.mass_per_radius, self.bounce_damping, self.min_distance, 0.0],
            counts: [self.planet_count, self.ship_count, self.seed, self.flags()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config = SimulationConfig {
            planet_count: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCount {
                what: "planet_count"
            })
        );

        let config = SimulationConfig {
            ship_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCount { .. })));
    }

    #[test]
    fn flat_area_is_rejected() {
        let config = SimulationConfig {
            area_min: Vec3::new(-1.0, 2.0, -1.0),
            area_max: Vec3::new(1.0, 2.0, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyArea { axis: 'y', .. })
        ));
    }

    #[test]
    fn inverted_and_negative_ranges_are_rejected() {
        let inverted = SimulationConfig {
            radius_range: (3.0, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidRange {
                name: "radius_range",
                ..
            })
        ));

        let negative = SimulationConfig {
            speed_range: (-1.0, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidRange {
                name: "speed_range",
                ..
            })
        ));
    }

    #[test]
    fn physics_constants_are_checked() {
        let damping = SimulationConfig {
            bounce_damping: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            damping.validate(),
            Err(ConfigError::OutOfRange {
                name: "bounce_damping",
                ..
            })
        ));

        let softening = SimulationConfig {
            min_distance: 0.0,
            ..Default::default()
        };
        assert_eq!(
            softening.validate(),
            Err(ConfigError::NonPositiveMinDistance(0.0))
        );

        let nan = SimulationConfig {
            gravitational_constant: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(nan.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn workload_budget_is_enforced() {
        let config = SimulationConfig {
            planet_count: 1024,
            ship_count: 1 << 20,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::WorkloadTooLarge {
                interactions: 1 << 30,
                limit: 1 << 26,
            })
        );
    }

    #[test]
    fn packs_parameter_block() {
        let config = SimulationConfig {
            planet_count: 3,
            ship_count: 10,
            gravitational_constant: 2.0,
            seed: 77,
            bounce: false,
            edge_mode: EdgeMode::Wrap,
            avoid_planets_on_spawn: true,
            ..Default::default()
        };
        let params = config.to_gpu_params(0.5);

        assert_eq!(params.gravitational_constant(), 2.0);
        assert_eq!(params.delta_time(), 0.5);
        assert_eq!(params.area_min(), Vec3::splat(-50.0));
        assert_eq!(params.radius_range(), (1.0, 5.0));
        assert_eq!(params.min_distance(), 1.0);
        assert_eq!(params.counts[..3], [3, 10, 77]);
        assert!(!params.has_flag(FLAG_BOUNCE));
        assert!(params.has_flag(FLAG_WRAP));
        assert!(params.has_flag(FLAG_AVOID_PLANETS));
    }

    #[test]
    fn bounce_overrides_edge_mode() {
        let config = SimulationConfig {
            bounce: true,
            edge_mode: EdgeMode::Wrap,
            ..Default::default()
        };
        let params = config.to_gpu_params(0.0);
        assert!(params.has_flag(FLAG_BOUNCE));
        assert!(!params.has_flag(FLAG_WRAP));
    }
}
