//! Grid update: momentum to velocity, body forces, interaction and walls.

use glam::{IVec3, Vec3};
use rayon::prelude::*;

use crate::constants::GRID_BOUNDARY_CELLS;
use crate::grid::{index_to_coords, Grid};
use crate::interaction::InteractionForce;
use crate::params::{DomainParams, SimConstants};

/// Resolve grid velocity for every active cell.
///
/// Cells with no mass get zero velocity. Everything else gets
/// `momentum / mass`, gravity, the interaction push (if any) and the
/// face boundary, in that order.
pub fn update_grid(
    grid: &mut Grid,
    constants: &SimConstants,
    domain: &DomainParams,
    interaction: Option<&InteractionForce>,
) {
    let fp = constants.fixed_point();
    let dims = grid.dims();
    let upper = domain.real_box().ceil().as_ivec3() - IVec3::splat(GRID_BOUNDARY_CELLS + 1);
    let gravity_dv = constants.gravity * constants.dt;
    let (cells, velocity) = grid.split_mut();

    velocity
        .par_iter_mut()
        .zip(cells.par_iter())
        .enumerate()
        .for_each(|(idx, (v, cell))| {
            let mass = cell.mass(&fp);
            if mass <= 0.0 {
                *v = Vec3::ZERO;
                return;
            }

            let mut vel = cell.momentum(&fp) / mass;
            vel.y += gravity_dv;

            let coords = index_to_coords(idx, dims);
            if let Some(force) = interaction {
                if force.reaches(coords.as_vec3() + Vec3::splat(0.5)) {
                    vel += force.velocity * constants.interaction_strength;
                }
            }

            *v = enforce_boundary(vel, coords, upper);
        });
}

/// Zero the velocity component normal to any face the cell is too close to.
#[inline]
pub fn enforce_boundary(mut vel: Vec3, coords: IVec3, upper: IVec3) -> Vec3 {
    for axis in 0..3 {
        if coords[axis] < GRID_BOUNDARY_CELLS || coords[axis] > upper[axis] {
            vel[axis] = 0.0;
        }
    }
    vel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::FixedPoint;
    use glam::UVec3;

    fn setup(n: u32) -> (Grid, SimConstants, DomainParams) {
        let mut grid = Grid::with_max_cells((n * n * n) as usize);
        grid.set_dims(UVec3::splat(n)).unwrap();
        (
            grid,
            SimConstants::default(),
            DomainParams::new(Vec3::splat(n as f32), 0.0),
        )
    }

    fn deposit(grid: &Grid, fp: &FixedPoint, cell: IVec3, mass: f32, momentum: Vec3) -> usize {
        let idx = grid.checked_index(cell).unwrap();
        grid.cells()[idx].add_mass(fp, mass);
        grid.cells()[idx].add_momentum(fp, momentum);
        idx
    }

    #[test]
    fn test_empty_cells_stay_still() {
        let (mut grid, constants, domain) = setup(8);
        update_grid(&mut grid, &constants, &domain, None);
        assert!(grid.velocity().iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_velocity_from_momentum_with_gravity() {
        let (mut grid, constants, domain) = setup(10);
        let fp = constants.fixed_point();
        let idx = deposit(&grid, &fp, IVec3::splat(5), 2.0, Vec3::new(1.0, 0.0, -0.5));

        update_grid(&mut grid, &constants, &domain, None);

        let expected = Vec3::new(0.5, constants.gravity * constants.dt, -0.25);
        assert!(grid.velocity()[idx].distance(expected) < 1e-5);
    }

    #[test]
    fn test_boundary_zeroes_normal_component() {
        let (mut grid, constants, domain) = setup(10);
        let fp = constants.fixed_point();
        // Low X face: index 1 < 2
        let low = deposit(&grid, &fp, IVec3::new(1, 5, 5), 1.0, Vec3::new(-1.0, 0.0, 1.0));
        // High Y face: index 8 > 10 - 3
        let high = deposit(&grid, &fp, IVec3::new(5, 8, 5), 1.0, Vec3::new(1.0, 1.0, 0.0));
        // Just inside: index 7 == 10 - 3
        let inside = deposit(&grid, &fp, IVec3::new(5, 7, 5), 1.0, Vec3::new(0.0, 1.0, 0.0));

        update_grid(&mut grid, &constants, &domain, None);

        assert_eq!(grid.velocity()[low].x, 0.0);
        assert!((grid.velocity()[low].z - 1.0).abs() < 1e-5);
        assert_eq!(grid.velocity()[high].y, 0.0);
        assert!((grid.velocity()[high].x - 1.0).abs() < 1e-5);
        assert!(grid.velocity()[inside].y > 0.9);
    }

    #[test]
    fn test_shrunk_real_box_moves_boundary() {
        let (mut grid, constants, domain) = setup(10);
        let domain = domain.with_real_box(Vec3::new(7.0, 10.0, 10.0)).unwrap();
        let fp = constants.fixed_point();
        let idx = deposit(&grid, &fp, IVec3::new(5, 5, 5), 1.0, Vec3::new(1.0, 0.0, 0.0));

        update_grid(&mut grid, &constants, &domain, None);

        // 5 > ceil(7) - 3
        assert_eq!(grid.velocity()[idx].x, 0.0);
    }

    #[test]
    fn test_interaction_pushes_cells_in_radius() {
        let (mut grid, constants, domain) = setup(12);
        let fp = constants.fixed_point();
        let near = deposit(&grid, &fp, IVec3::splat(6), 1.0, Vec3::ZERO);
        let far = deposit(&grid, &fp, IVec3::new(6, 6, 2), 1.0, Vec3::ZERO);
        let force = InteractionForce {
            center: Vec3::splat(6.5),
            radius: 2.0,
            velocity: Vec3::new(0.4, 0.0, 0.0),
        };

        update_grid(&mut grid, &constants, &domain, Some(&force));

        assert!((grid.velocity()[near].x - 0.4).abs() < 1e-5);
        assert_eq!(grid.velocity()[far].x, 0.0);
    }
}
