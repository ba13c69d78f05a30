//! Particle-Grid transfer passes for MLS-MPM.
//!
//! P2G runs in two passes. The first scatters mass and APIC momentum. The
//! second reads the finished mass field back to get each particle's density,
//! then scatters the pressure/viscosity stress as a momentum change. Both
//! passes go through the fixed-point atomic accumulators, so the result does
//! not depend on the order particles are processed in.
//!
//! G2P gathers the resolved grid velocity back to particles, rebuilds the
//! affine matrix and advects.

use glam::{Mat3, Vec3};
use rayon::prelude::*;

use crate::advection;
use crate::fixed_point::FixedPoint;
use crate::grid::Grid;
use crate::kernels::{apic_d_inverse, Stencil};
use crate::params::{DomainParams, SimConstants};
use crate::particle::Particle;

/// Every particle carries unit mass; cell volume is 1.
const PARTICLE_MASS: f32 = 1.0;

/// P2G pass 1: scatter mass and APIC momentum.
///
/// Node `i` receives `w` mass and `w * (v + C * (x_i - x_p))` momentum.
pub fn p2g_mass_momentum(particles: &[Particle], grid: &Grid, fp: &FixedPoint) {
    let cells = grid.cells();
    particles.par_iter().for_each(|p| {
        let c_mat = p.affine_velocity();
        for node in Stencil::new(p.position).nodes() {
            let Some(idx) = grid.checked_index(node.cell) else {
                continue;
            };
            let mass = node.weight * PARTICLE_MASS;
            let cell = &cells[idx];
            cell.add_mass(fp, mass);
            cell.add_momentum(fp, (p.velocity + c_mat * node.offset) * mass);
        }
    });
}

/// Density at a particle: `Σ w * mass_i` over its stencil.
#[inline]
pub fn particle_density(position: Vec3, grid: &Grid, fp: &FixedPoint) -> f32 {
    let cells = grid.cells();
    Stencil::new(position)
        .nodes()
        .filter_map(|node| {
            grid.checked_index(node.cell)
                .map(|idx| node.weight * cells[idx].mass(fp))
        })
        .sum()
}

/// Cauchy stress `-p I + μ (C + Cᵀ)`.
#[inline]
pub fn stress(constants: &SimConstants, pressure: f32, c_mat: Mat3) -> Mat3 {
    let strain = c_mat + c_mat.transpose();
    Mat3::from_diagonal(Vec3::splat(-pressure)) + strain * constants.dynamic_viscosity
}

/// P2G pass 2: per-particle density, then stress scattered as momentum.
///
/// Writes each particle's density into `densities` (same order as
/// `particles`). Must run after pass 1 has finished.
pub fn p2g_stress(
    particles: &[Particle],
    densities: &mut [f32],
    grid: &Grid,
    constants: &SimConstants,
    fp: &FixedPoint,
) {
    let cells = grid.cells();
    let d_inv = apic_d_inverse(1.0);

    particles
        .par_iter()
        .zip(densities.par_iter_mut())
        .for_each(|(p, density_out)| {
            let density = particle_density(p.position, grid, fp);
            *density_out = density;
            if density <= 0.0 {
                return;
            }

            let volume = PARTICLE_MASS / density;
            let pressure = constants.pressure(density);
            let sigma = stress(constants, pressure, p.affine_velocity());
            // Momentum per unit (offset * weight)
            let term = sigma * (-volume * d_inv * constants.dt);

            for node in Stencil::new(p.position).nodes() {
                if let Some(idx) = grid.checked_index(node.cell) {
                    cells[idx].add_momentum(fp, term * node.offset * node.weight);
                }
            }
        });
}

/// G2P: gather velocity and affine matrix, advect, apply particle boundaries.
pub fn grid_to_particles(
    particles: &mut [Particle],
    grid: &Grid,
    constants: &SimConstants,
    domain: &DomainParams,
) {
    let velocity = grid.velocity();
    let d_inv = apic_d_inverse(1.0);
    let obstacle = domain.obstacle();
    let real = domain.real_box();

    particles.par_iter_mut().for_each(|p| {
        let mut new_velocity = Vec3::ZERO;
        let mut b_mat = Mat3::ZERO;

        for node in Stencil::new(p.position).nodes() {
            let Some(idx) = grid.checked_index(node.cell) else {
                continue;
            };
            let weighted = velocity[idx] * node.weight;
            new_velocity += weighted;
            // Outer product: weighted * offsetᵀ
            b_mat += Mat3::from_cols(
                weighted * node.offset.x,
                weighted * node.offset.y,
                weighted * node.offset.z,
            );
        }

        p.velocity = new_velocity;
        p.set_affine_velocity(b_mat * d_inv);
        advection::advect(p, constants.dt);
        advection::push_out_of_obstacle(p, &obstacle);
        advection::clamp_to_box(p, real);
        advection::apply_soft_walls(p, real, constants.dt);
    });
}
