//! Simulation parameters and scenario configuration.
//!
//! [`SimConstants`] is fixed when the simulator is built. [`DomainParams`] is
//! replaced as a whole on reset or when the enforced box changes. Kernels only
//! ever see both through shared references.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;
use crate::fixed_point::FixedPoint;

/// Material and integration constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConstants {
    /// Equation-of-state stiffness
    pub stiffness: f32,
    /// Density at which pressure vanishes
    pub rest_density: f32,
    /// Viscosity applied to the strain rate (C + Cᵀ)
    pub dynamic_viscosity: f32,
    /// Sub-step timestep
    pub dt: f32,
    /// Fixed-point multiplier for grid accumulators
    pub fixed_point_multiplier: f32,
    /// Gravity along Y
    pub gravity: f32,
    /// Tait exponent (1.0 = linear equation of state)
    pub eos_exponent: f32,
    /// Scale applied to the interaction velocity
    pub interaction_strength: f32,
}

impl Default for SimConstants {
    fn default() -> Self {
        Self {
            stiffness: constants::STIFFNESS,
            rest_density: constants::REST_DENSITY,
            dynamic_viscosity: constants::DYNAMIC_VISCOSITY,
            dt: constants::DT,
            fixed_point_multiplier: constants::FIXED_POINT_MULTIPLIER,
            gravity: constants::GRAVITY,
            eos_exponent: constants::EOS_EXPONENT,
            interaction_strength: constants::INTERACTION_STRENGTH,
        }
    }
}

impl SimConstants {
    /// Reject values the kernels cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                "fixed_point_multiplier",
                self.fixed_point_multiplier,
                self.fixed_point_multiplier.is_finite() && self.fixed_point_multiplier > 0.0,
                "finite and > 0",
            ),
            (
                "rest_density",
                self.rest_density,
                self.rest_density.is_finite() && self.rest_density > 0.0,
                "finite and > 0",
            ),
            ("dt", self.dt, self.dt.is_finite() && self.dt >= 0.0, "finite and >= 0"),
        ];
        for (name, value, ok, expected) in checks {
            if !ok {
                log::error!("Constant {} = {} must be {}", name, value, expected);
                return Err(ConfigError::InvalidConstant {
                    name,
                    value,
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Fixed-point encoding for these constants.
    pub fn fixed_point(&self) -> FixedPoint {
        FixedPoint::new(self.fixed_point_multiplier)
    }

    /// Pressure from density: `max(0, stiffness * ((ρ/ρ₀)^γ - 1))`.
    #[inline]
    pub fn pressure(&self, density: f32) -> f32 {
        let ratio = density / self.rest_density;
        (self.stiffness * (ratio.powf(self.eos_exponent) - 1.0)).max(0.0)
    }
}

/// Spherical obstacle particles are pushed out of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
}

impl Obstacle {
    /// Whether `p` lies strictly inside the sphere.
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        self.radius > 0.0 && (p - self.center).length_squared() < self.radius * self.radius
    }
}

/// Domain extents for one scenario run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainParams {
    logical: Vec3,
    real: Vec3,
    obstacle_radius: f32,
}

impl DomainParams {
    /// Real box starts equal to the logical box.
    pub fn new(logical: Vec3, obstacle_radius: f32) -> Self {
        Self {
            logical,
            real: logical,
            obstacle_radius: obstacle_radius.max(0.0),
        }
    }

    /// Copy with a different enforced box.
    ///
    /// The grid is laid out for the logical box, so the real box may shrink
    /// below it but never grow past it.
    pub fn with_real_box(&self, real: Vec3) -> Result<Self, ConfigError> {
        if !real.is_finite() || real.min_element() <= 0.0 {
            log::error!("Invalid real box size {}", real);
            return Err(ConfigError::InvalidDomain { size: real });
        }
        if real.ceil().cmpgt(self.logical.ceil()).any() {
            log::error!("Real box {} exceeds logical box {}", real, self.logical);
            return Err(ConfigError::RealBoxExceedsGrid {
                real,
                logical: self.logical,
            });
        }
        Ok(Self { real, ..*self })
    }

    /// Box used to seed particles and index the grid.
    pub fn logical_box(&self) -> Vec3 {
        self.logical
    }

    /// Box whose faces are enforced as boundaries.
    pub fn real_box(&self) -> Vec3 {
        self.real
    }

    pub fn obstacle_radius(&self) -> f32 {
        self.obstacle_radius
    }

    /// Obstacle sphere, centered in the real box.
    pub fn obstacle(&self) -> Obstacle {
        Obstacle {
            center: self.real * 0.5,
            radius: self.obstacle_radius,
        }
    }
}

/// Outward-facing tuning for one scenario size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub name: String,
    /// Particle count the spawner grows toward
    pub target_particles: usize,
    #[serde(with = "crate::serde_utils::vec3")]
    pub box_size: Vec3,
    pub obstacle_radius: f32,
    /// Pointer/hand effect radius
    pub interaction_radius: f32,
    /// Renderer hint, carried for the display side
    pub stretch_strength: f32,
}

impl ScenarioPreset {
    pub fn small() -> Self {
        Self {
            name: "small".into(),
            target_particles: 30_000,
            box_size: Vec3::splat(52.0),
            obstacle_radius: 15.0,
            interaction_radius: 5.0,
            stretch_strength: 2.5,
        }
    }

    pub fn medium() -> Self {
        Self {
            name: "medium".into(),
            target_particles: 60_000,
            box_size: Vec3::splat(60.0),
            obstacle_radius: 20.0,
            interaction_radius: 6.0,
            stretch_strength: 2.0,
        }
    }

    pub fn large() -> Self {
        Self {
            name: "large".into(),
            target_particles: 100_000,
            box_size: Vec3::splat(72.0),
            obstacle_radius: 25.0,
            interaction_radius: 8.0,
            stretch_strength: 1.5,
        }
    }

    /// All built-in presets, smallest first.
    pub fn all() -> [Self; 3] {
        [Self::small(), Self::medium(), Self::large()]
    }
}

impl Default for ScenarioPreset {
    fn default() -> Self {
        Self::medium()
    }
}

/// Complete simulator configuration, loadable from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub constants: SimConstants,
    /// Particle arena capacity
    pub num_particles_max: usize,
    pub scenario: ScenarioPreset,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            constants: SimConstants::default(),
            num_particles_max: constants::NUM_PARTICLES_MAX,
            scenario: ScenarioPreset::default(),
        }
    }
}

impl SimConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from JSON file
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_vanishes_below_rest() {
        let c = SimConstants::default();
        assert_eq!(c.pressure(c.rest_density), 0.0);
        assert_eq!(c.pressure(c.rest_density * 0.5), 0.0);
        assert!(c.pressure(c.rest_density * 1.1) > 0.0);
    }

    #[test]
    fn test_linear_eos() {
        let c = SimConstants {
            eos_exponent: 1.0,
            ..SimConstants::default()
        };
        let p = c.pressure(c.rest_density * 1.5);
        assert!((p - c.stiffness * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_real_box_cannot_outgrow_grid() {
        let d = DomainParams::new(Vec3::splat(40.0), 10.0);
        assert!(d.with_real_box(Vec3::new(30.0, 40.0, 40.0)).is_ok());
        assert!(matches!(
            d.with_real_box(Vec3::new(41.0, 40.0, 40.0)),
            Err(ConfigError::RealBoxExceedsGrid { .. })
        ));
    }

    #[test]
    fn test_obstacle_follows_real_box() {
        let d = DomainParams::new(Vec3::splat(40.0), 5.0)
            .with_real_box(Vec3::new(20.0, 40.0, 40.0))
            .unwrap();
        assert_eq!(d.obstacle().center, Vec3::new(10.0, 20.0, 20.0));
        assert!(d.obstacle().contains(Vec3::new(10.0, 22.0, 20.0)));
        assert!(!d.obstacle().contains(Vec3::new(10.0, 26.0, 20.0)));
    }

    #[test]
    fn test_zero_radius_obstacle_contains_nothing() {
        let d = DomainParams::new(Vec3::splat(10.0), 0.0);
        assert!(!d.obstacle().contains(Vec3::splat(5.0)));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{ "constants": { "stiffness": 5.0 } }"#).unwrap();
        assert_eq!(config.constants.stiffness, 5.0);
        assert_eq!(config.constants.rest_density, constants::REST_DENSITY);
        assert_eq!(config.num_particles_max, constants::NUM_PARTICLES_MAX);
        assert_eq!(config.scenario, ScenarioPreset::medium());
    }

    #[test]
    fn test_constants_validation() {
        assert!(SimConstants::default().validate().is_ok());

        let bad_density = SimConstants {
            rest_density: 0.0,
            ..SimConstants::default()
        };
        assert!(matches!(
            bad_density.validate(),
            Err(ConfigError::InvalidConstant {
                name: "rest_density",
                ..
            })
        ));

        let bad_dt = SimConstants {
            dt: -0.1,
            ..SimConstants::default()
        };
        assert!(matches!(
            bad_dt.validate(),
            Err(ConfigError::InvalidConstant { name: "dt", .. })
        ));

        let bad_multiplier = SimConstants {
            fixed_point_multiplier: f32::NAN,
            ..SimConstants::default()
        };
        assert!(bad_multiplier.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(matches!(
            SimConfig::from_json_str("{ not json"),
            Err(ConfigError::Config(_))
        ));
    }

    #[test]
    fn test_presets_fit_default_grid() {
        for preset in ScenarioPreset::all() {
            assert!(crate::grid::dims_for_domain(preset.box_size).is_ok(), "{}", preset.name);
        }
    }
}
