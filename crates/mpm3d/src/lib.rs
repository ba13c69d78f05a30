//! Real-time 3D MLS-MPM fluid simulation.
//!
//! Moving-Least-Squares Material Point Method with APIC transfers. Particle to
//! grid scatter goes through fixed-point atomic accumulators, so a step gives
//! the same result however the parallel work is scheduled.
//!
//! # Example
//!
//! ```
//! use mpm3d::{InteractionInput, MlsMpm3D, SimConstants};
//! use glam::Vec3;
//!
//! let mut sim = MlsMpm3D::new(SimConstants::default(), 20_000);
//! sim.reset(Vec3::splat(32.0), 8.0).unwrap();
//!
//! // Grow toward 500 particles while stepping
//! for _ in 0..10 {
//!     sim.step(&InteractionInput::none(), 500, None);
//! }
//! assert_eq!(sim.num_particles(), 500);
//! assert_eq!(sim.output().len(), 500);
//! ```

pub mod advection;
pub mod constants;
pub mod error;
pub mod fixed_point;
pub mod grid;
pub mod grid_update;
pub mod interaction;
pub mod kernels;
pub mod layout;
pub mod output;
pub mod params;
pub mod particle;
pub mod schedule;
pub mod serde_utils;
pub mod transfer;

pub use error::ConfigError;
pub use fixed_point::FixedPoint;
pub use glam::{Mat3, Vec3};
pub use grid::Grid;
pub use interaction::{
    CameraMatrices, DepthMap, DepthSurface, FarSurface, InteractionForce, InteractionInput,
    Occlusion, PointerSample, PointerTracker, UniformDepth,
};
pub use layout::DamBreakLayout;
pub use output::{OutputBuffer, PosVel};
pub use params::{DomainParams, Obstacle, ScenarioPreset, SimConfig, SimConstants};
pub use particle::{Particle, ParticleStore};
pub use schedule::{Schedule, Stage, SUBSTEP};

use crate::constants::{LAYOUT_SEED, SPAWN_BATCH, SPAWN_FRAME_INTERVAL, SUBSTEPS};

/// 3D MLS-MPM fluid simulation.
pub struct MlsMpm3D {
    constants: SimConstants,
    fixed_point: FixedPoint,
    domain: DomainParams,

    particles: ParticleStore,
    grid: Grid,
    /// Per-particle density from the last stress pass
    densities: Vec<f32>,
    output: OutputBuffer,

    /// Seed for the dam-break jitter
    layout_seed: u64,
    frame: u32,
}

impl MlsMpm3D {
    /// Allocate a simulator for up to `num_particles_max` particles.
    ///
    /// Nothing is simulated until [`MlsMpm3D::reset`] lays out a domain.
    pub fn new(constants: SimConstants, num_particles_max: usize) -> Self {
        debug_assert_eq!(SUBSTEP.validate(), Ok(()));
        Self {
            fixed_point: constants.fixed_point(),
            constants,
            domain: DomainParams::new(glam::Vec3::ZERO, 0.0),
            particles: ParticleStore::with_capacity(num_particles_max),
            grid: Grid::default(),
            densities: vec![0.0; num_particles_max],
            output: OutputBuffer::with_capacity(num_particles_max),
            layout_seed: LAYOUT_SEED,
            frame: 0,
        }
    }

    /// Use a different seed for the dam-break jitter on the next reset.
    pub fn with_layout_seed(mut self, seed: u64) -> Self {
        self.layout_seed = seed;
        self
    }

    /// Build from a loaded configuration and reset to its scenario.
    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        config.constants.validate()?;
        let mut sim = Self::new(config.constants, config.num_particles_max);
        sim.reset(config.scenario.box_size, config.scenario.obstacle_radius)?;
        Ok(sim)
    }

    /// Start over with a fresh dam-break layout.
    pub fn reset(&mut self, domain_size: Vec3, obstacle_radius: f32) -> Result<(), ConfigError> {
        grid::dims_for_domain(domain_size)?;
        let domain = DomainParams::new(domain_size, obstacle_radius);
        let layout = DamBreakLayout::new(domain_size, domain.obstacle()).generate(self.layout_seed);
        self.reset_with_layout(domain_size, obstacle_radius, &layout)
    }

    /// Start over with caller-provided seed positions.
    ///
    /// On error nothing is changed.
    pub fn reset_with_layout(
        &mut self,
        domain_size: Vec3,
        obstacle_radius: f32,
        layout: &[Vec3],
    ) -> Result<(), ConfigError> {
        let dims = grid::dims_for_domain(domain_size)?;
        self.grid.set_dims(dims)?;
        self.grid.clear();

        self.domain = DomainParams::new(domain_size, obstacle_radius);
        self.particles.seed(layout);
        self.output.clear();
        self.frame = 0;

        if layout.len() > self.particles.capacity() {
            log::warn!(
                "Layout has {} positions, only {} fit",
                layout.len(),
                self.particles.capacity()
            );
        }
        log::info!(
            "Reset: box {}, grid {}, obstacle radius {}, {} seeded",
            domain_size,
            dims,
            obstacle_radius,
            self.particles.seeded()
        );
        Ok(())
    }

    /// Move the enforced boundary without reseeding.
    pub fn change_box_size(&mut self, real_box: Vec3) -> Result<(), ConfigError> {
        self.domain = self.domain.with_real_box(real_box)?;
        log::debug!("Real box now {}", real_box);
        Ok(())
    }

    /// Advance one visible frame.
    ///
    /// The interaction is resolved once and held for every sub-step. Without
    /// an occlusion source there is no fluid surface to touch, so nothing is
    /// pushed.
    pub fn step(
        &mut self,
        interaction: &InteractionInput,
        target_particles: usize,
        occlusion: Option<&Occlusion<'_>>,
    ) {
        let force = occlusion.and_then(|o| o.resolve(interaction));

        for substep in 0..SUBSTEPS {
            for &stage in SUBSTEP.stages() {
                self.run_stage(stage, substep, target_particles, force.as_ref());
            }
        }

        self.frame = self.frame.wrapping_add(1);
    }

    fn run_stage(
        &mut self,
        stage: Stage,
        substep: usize,
        target_particles: usize,
        force: Option<&InteractionForce>,
    ) {
        let n = self.particles.len();
        log::trace!("frame {} substep {}: {}", self.frame, substep, stage.name());
        match stage {
            Stage::Clear => self.grid.clear(),
            Stage::Spawn => {
                if substep == 0 && self.frame % SPAWN_FRAME_INTERVAL == 0 && n < target_particles {
                    let limit = target_particles.min(self.particles.capacity());
                    let spawned = self.particles.activate(SPAWN_BATCH, limit);
                    if spawned > 0 {
                        log::debug!(
                            "Frame {}: spawned {} ({} active)",
                            self.frame,
                            spawned,
                            self.particles.len()
                        );
                    }
                }
            }
            Stage::P2gMassMomentum => {
                transfer::p2g_mass_momentum(self.particles.active(), &self.grid, &self.fixed_point)
            }
            Stage::P2gStress => transfer::p2g_stress(
                self.particles.active(),
                &mut self.densities[..n],
                &self.grid,
                &self.constants,
                &self.fixed_point,
            ),
            Stage::UpdateGrid => {
                grid_update::update_grid(&mut self.grid, &self.constants, &self.domain, force)
            }
            Stage::G2p => transfer::grid_to_particles(
                self.particles.active_mut(),
                &self.grid,
                &self.constants,
                &self.domain,
            ),
            Stage::CopyOutput => self.output.write(self.particles.active(), &self.densities[..n]),
        }
    }

    /// Number of active particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Particle arena capacity.
    pub fn num_particles_max(&self) -> usize {
        self.particles.capacity()
    }

    /// Density the renderer normalizes against.
    pub fn reference_density(&self) -> f32 {
        self.constants.rest_density
    }

    /// Frames stepped since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame
    }

    /// Constants fixed at construction.
    pub fn constants(&self) -> &SimConstants {
        &self.constants
    }

    /// Logical and enforced box of the current run.
    pub fn domain(&self) -> &DomainParams {
        &self.domain
    }

    /// Encoding used by the grid accumulators.
    pub fn fixed_point(&self) -> &FixedPoint {
        &self.fixed_point
    }

    /// Active particles.
    pub fn particles(&self) -> &[Particle] {
        self.particles.active()
    }

    /// Seeded layout, active or waiting.
    pub fn seeded_particles(&self) -> &[Particle] {
        self.particles.seeded_slots()
    }

    /// Per-particle density from the last sub-step.
    pub fn densities(&self) -> &[f32] {
        &self.densities[..self.particles.len()]
    }

    /// Grid state after the last sub-step.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Renderer output from the last sub-step.
    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Total particle momentum (unit mass per particle).
    pub fn total_momentum(&self) -> Vec3 {
        self.particles.active().iter().map(|p| p.velocity).sum()
    }

    /// Mean active particle position, or `None` when empty.
    pub fn centroid(&self) -> Option<Vec3> {
        let active = self.particles.active();
        if active.is_empty() {
            return None;
        }
        let sum: Vec3 = active.iter().map(|p| p.position).sum();
        Some(sum / active.len() as f32)
    }
}
