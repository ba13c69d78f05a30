//! Background grid with fixed-point atomic accumulators.
//!
//! Nodes sit at cell centers. Each cell stores:
//! - mass and momentum as `AtomicI32` fixed-point accumulators (written by P2G)
//! - a float velocity resolved by the grid update (read by G2P)
//!
//! The arrays are allocated once for the maximum grid. Only the first
//! `dims.x * dims.y * dims.z` cells, laid out as `x * ny * nz + y * nz + z`,
//! belong to the current domain.

use std::sync::atomic::{AtomicI32, Ordering};

use glam::{IVec3, UVec3, Vec3};
use rayon::prelude::*;

use crate::constants::{MAX_GRID_AXIS, MAX_GRID_CELLS};
use crate::error::ConfigError;
use crate::fixed_point::FixedPoint;

/// One grid node's accumulators (16 bytes).
#[derive(Debug, Default)]
pub struct GridCell {
    pub mass: AtomicI32,
    pub momentum: [AtomicI32; 3],
}

impl GridCell {
    /// Zero all accumulators.
    #[inline]
    pub fn clear(&self) {
        self.mass.store(0, Ordering::Relaxed);
        for m in &self.momentum {
            m.store(0, Ordering::Relaxed);
        }
    }

    /// Raw fixed-point mass.
    #[inline]
    pub fn raw_mass(&self) -> i32 {
        self.mass.load(Ordering::Relaxed)
    }

    /// Decoded mass.
    #[inline]
    pub fn mass(&self, fp: &FixedPoint) -> f32 {
        fp.load(&self.mass)
    }

    /// Decoded momentum.
    #[inline]
    pub fn momentum(&self, fp: &FixedPoint) -> Vec3 {
        Vec3::new(
            fp.load(&self.momentum[0]),
            fp.load(&self.momentum[1]),
            fp.load(&self.momentum[2]),
        )
    }

    /// Scatter a mass contribution.
    #[inline]
    pub fn add_mass(&self, fp: &FixedPoint, mass: f32) {
        fp.atomic_add(&self.mass, mass);
    }

    /// Scatter a momentum contribution.
    #[inline]
    pub fn add_momentum(&self, fp: &FixedPoint, momentum: Vec3) {
        fp.atomic_add(&self.momentum[0], momentum.x);
        fp.atomic_add(&self.momentum[1], momentum.y);
        fp.atomic_add(&self.momentum[2], momentum.z);
    }
}

/// Grid dimensions covering a domain: `ceil` of each axis.
pub fn dims_for_domain(size: Vec3) -> Result<UVec3, ConfigError> {
    if !size.is_finite() || size.min_element() <= 0.0 {
        log::error!("Invalid domain size {}", size);
        return Err(ConfigError::InvalidDomain { size });
    }

    let ceil = size.ceil();
    for (axis, cells) in [('x', ceil.x), ('y', ceil.y), ('z', ceil.z)] {
        if cells > MAX_GRID_AXIS as f32 {
            log::error!("Grid axis {} needs {} cells (max {})", axis, cells, MAX_GRID_AXIS);
            return Err(ConfigError::GridAxisTooLarge {
                axis,
                cells: cells as u32,
                max: MAX_GRID_AXIS,
            });
        }
    }

    Ok(ceil.as_uvec3())
}

/// Integer coordinates of flat `index` in a grid of `dims`.
#[inline]
pub fn index_to_coords(index: usize, dims: UVec3) -> IVec3 {
    let ny = dims.y as usize;
    let nz = dims.z as usize;
    IVec3::new(
        (index / nz / ny) as i32,
        ((index / nz) % ny) as i32,
        (index % nz) as i32,
    )
}

/// Uniform background grid.
pub struct Grid {
    dims: UVec3,
    cells: Vec<GridCell>,
    velocity: Vec<Vec3>,
}

impl Grid {
    /// Allocate a grid able to hold `max_cells` cells. No cell is active yet.
    pub fn with_max_cells(max_cells: usize) -> Self {
        let mut cells = Vec::with_capacity(max_cells);
        cells.resize_with(max_cells, GridCell::default);
        Self {
            dims: UVec3::ZERO,
            cells,
            velocity: vec![Vec3::ZERO; max_cells],
        }
    }

    /// Maximum number of cells.
    pub fn max_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Set the active sub-box. Fails if it does not fit the allocation.
    pub fn set_dims(&mut self, dims: UVec3) -> Result<(), ConfigError> {
        let cell_count = dims.x as usize * dims.y as usize * dims.z as usize;
        if cell_count > self.max_cell_count() {
            log::error!(
                "Grid {} needs {} cells, only {} allocated",
                dims,
                cell_count,
                self.max_cell_count()
            );
            return Err(ConfigError::GridTooLarge {
                dims,
                cell_count,
                max_cell_count: self.max_cell_count(),
            });
        }
        self.dims = dims;
        Ok(())
    }

    /// Active grid dimensions.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Number of active cells.
    pub fn cell_count(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// Flat index of an in-range cell.
    #[inline]
    pub fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        let ny = self.dims.y as usize;
        let nz = self.dims.z as usize;
        x * ny * nz + y * nz + z
    }

    /// Flat index of `cell`, or `None` when it lies outside the active grid.
    #[inline]
    pub fn checked_index(&self, cell: IVec3) -> Option<usize> {
        if cell.cmplt(IVec3::ZERO).any() || cell.as_uvec3().cmpge(self.dims).any() {
            return None;
        }
        Some(self.cell_index(cell.x as usize, cell.y as usize, cell.z as usize))
    }

    /// Integer coordinates of a flat index.
    #[inline]
    pub fn cell_coords(&self, index: usize) -> IVec3 {
        index_to_coords(index, self.dims)
    }

    /// Zero every accumulator and velocity of the active region.
    pub fn clear(&mut self) {
        let count = self.cell_count();
        self.cells[..count].par_iter().for_each(GridCell::clear);
        self.velocity[..count].par_iter_mut().for_each(|v| *v = Vec3::ZERO);
    }

    /// Active cells.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells[..self.cell_count()]
    }

    /// Resolved velocities of the active cells.
    pub fn velocity(&self) -> &[Vec3] {
        &self.velocity[..self.cell_count()]
    }

    /// Accumulators and the writable velocity field, borrowed together.
    pub fn split_mut(&mut self) -> (&[GridCell], &mut [Vec3]) {
        let count = self.cell_count();
        (&self.cells[..count], &mut self.velocity[..count])
    }

    /// Raw fixed-point mass of every active cell.
    pub fn mass_accumulators(&self) -> Vec<i32> {
        self.cells().iter().map(GridCell::raw_mass).collect()
    }

    /// Sum of decoded mass over the active grid.
    pub fn total_mass(&self, fp: &FixedPoint) -> f32 {
        self.cells().iter().map(|c| c.mass(fp)).sum()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::with_max_cells(MAX_GRID_CELLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_round_up() {
        let dims = dims_for_domain(Vec3::new(52.0, 59.5, 60.1)).unwrap();
        assert_eq!(dims, UVec3::new(52, 60, 61));
    }

    #[test]
    fn test_dims_reject_oversized_axis() {
        let err = dims_for_domain(Vec3::new(81.0, 10.0, 10.0)).unwrap_err();
        assert!(matches!(err, ConfigError::GridAxisTooLarge { axis: 'x', .. }));
    }

    #[test]
    fn test_dims_reject_degenerate_domain() {
        assert!(matches!(
            dims_for_domain(Vec3::new(10.0, 0.0, 10.0)),
            Err(ConfigError::InvalidDomain { .. })
        ));
        assert!(matches!(
            dims_for_domain(Vec3::new(10.0, f32::NAN, 10.0)),
            Err(ConfigError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_set_dims_rejects_too_many_cells() {
        let mut grid = Grid::with_max_cells(1000);
        assert!(grid.set_dims(UVec3::new(10, 10, 10)).is_ok());
        let err = grid.set_dims(UVec3::new(10, 10, 11)).unwrap_err();
        assert!(matches!(err, ConfigError::GridTooLarge { cell_count: 1100, .. }));
        // Failed resize leaves the previous dims in place
        assert_eq!(grid.dims(), UVec3::new(10, 10, 10));
    }

    #[test]
    fn test_index_coords_roundtrip() {
        let mut grid = Grid::with_max_cells(4 * 5 * 6);
        grid.set_dims(UVec3::new(4, 5, 6)).unwrap();
        for idx in 0..grid.cell_count() {
            let c = grid.cell_coords(idx);
            assert_eq!(grid.checked_index(c), Some(idx));
        }
        assert_eq!(grid.cell_index(1, 0, 0), 30);
        assert_eq!(grid.cell_index(0, 1, 0), 6);
    }

    #[test]
    fn test_checked_index_rejects_outside() {
        let mut grid = Grid::with_max_cells(64);
        grid.set_dims(UVec3::new(4, 4, 4)).unwrap();
        assert_eq!(grid.checked_index(IVec3::new(-1, 0, 0)), None);
        assert_eq!(grid.checked_index(IVec3::new(0, 4, 0)), None);
        assert!(grid.checked_index(IVec3::new(3, 3, 3)).is_some());
    }

    #[test]
    fn test_clear_zeroes_accumulators() {
        let fp = FixedPoint::default();
        let mut grid = Grid::with_max_cells(8);
        grid.set_dims(UVec3::new(2, 2, 2)).unwrap();
        grid.cells()[3].add_mass(&fp, 1.5);
        grid.cells()[3].add_momentum(&fp, Vec3::ONE);
        grid.split_mut().1[3] = Vec3::ONE;

        grid.clear();

        assert!(grid.mass_accumulators().iter().all(|&m| m == 0));
        assert_eq!(grid.cells()[3].momentum(&fp), Vec3::ZERO);
        assert_eq!(grid.velocity()[3], Vec3::ZERO);
    }
}
