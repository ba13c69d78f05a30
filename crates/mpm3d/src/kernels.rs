//! 3D Quadratic B-spline kernel functions for MLS-MPM transfers.
//!
//! Grid nodes sit at cell centers `(i + 0.5, j + 0.5, k + 0.5)` in grid units.
//! A particle touches the 3x3x3 block of nodes around the cell it is in.

use glam::{IVec3, Vec3};

use crate::constants::BSPLINE_SUPPORT_RADIUS;

/// 1D Quadratic B-spline weight.
/// Support: [-1.5, 1.5] (covers 3 grid nodes)
#[inline]
pub fn quadratic_bspline_1d(r: f32) -> f32 {
    let r_abs = r.abs();
    if r_abs < 0.5 {
        0.75 - r_abs * r_abs
    } else if r_abs < BSPLINE_SUPPORT_RADIUS {
        let t = BSPLINE_SUPPORT_RADIUS - r_abs;
        0.5 * t * t
    } else {
        0.0
    }
}

/// 3D Quadratic B-spline (tensor product of 1D).
/// Returns weight for position delta from grid node.
#[inline]
pub fn quadratic_bspline_3d(delta: Vec3) -> f32 {
    quadratic_bspline_1d(delta.x) * quadratic_bspline_1d(delta.y) * quadratic_bspline_1d(delta.z)
}

/// APIC D matrix inverse for quadratic B-splines.
/// D = (1/4) * dx^2 * I, so D_inv = 4 / dx^2
#[inline]
pub fn apic_d_inverse(cell_size: f32) -> f32 {
    4.0 / (cell_size * cell_size)
}

/// One node of a particle's stencil.
#[derive(Clone, Copy, Debug)]
pub struct StencilNode {
    /// Integer cell coordinate of the node
    pub cell: IVec3,
    /// Interpolation weight
    pub weight: f32,
    /// Node center minus particle position
    pub offset: Vec3,
}

/// Precomputed 3x3x3 quadratic stencil around a particle.
#[derive(Clone, Copy, Debug)]
pub struct Stencil {
    base: IVec3,
    position: Vec3,
    /// Per-axis weights for node offsets -1, 0, +1
    weights: [Vec3; 3],
}

impl Stencil {
    /// Build the stencil for a particle at `position` (grid units).
    #[inline]
    pub fn new(position: Vec3) -> Self {
        let cell = position.floor();
        // Distance from the containing cell's center, in [-0.5, 0.5)
        let diff = position - (cell + Vec3::splat(0.5));

        let weights = [
            Vec3::new(
                quadratic_bspline_1d(diff.x + 1.0),
                quadratic_bspline_1d(diff.y + 1.0),
                quadratic_bspline_1d(diff.z + 1.0),
            ),
            Vec3::new(
                quadratic_bspline_1d(diff.x),
                quadratic_bspline_1d(diff.y),
                quadratic_bspline_1d(diff.z),
            ),
            Vec3::new(
                quadratic_bspline_1d(diff.x - 1.0),
                quadratic_bspline_1d(diff.y - 1.0),
                quadratic_bspline_1d(diff.z - 1.0),
            ),
        ];

        Self {
            base: cell.as_ivec3(),
            position,
            weights,
        }
    }

    /// Cell containing the particle.
    pub fn base(&self) -> IVec3 {
        self.base
    }

    /// Iterate the 27 nodes (x outermost, z innermost).
    #[inline]
    pub fn nodes(&self) -> impl Iterator<Item = StencilNode> + '_ {
        (0..3).flat_map(move |gx| {
            (0..3).flat_map(move |gy| {
                (0..3).map(move |gz| {
                    let cell = self.base + IVec3::new(gx - 1, gy - 1, gz - 1);
                    let weight = self.weights[gx as usize].x
                        * self.weights[gy as usize].y
                        * self.weights[gz as usize].z;
                    let offset = cell.as_vec3() + Vec3::splat(0.5) - self.position;
                    StencilNode {
                        cell,
                        weight,
                        offset,
                    }
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bspline_at_zero() {
        // At node center, weight should be 0.75
        assert!((quadratic_bspline_1d(0.0) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_bspline_at_half() {
        let w = quadratic_bspline_1d(0.5);
        assert!((w - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bspline_zero_outside_support() {
        assert_eq!(quadratic_bspline_1d(BSPLINE_SUPPORT_RADIUS), 0.0);
        assert_eq!(quadratic_bspline_1d(2.0), 0.0);
        assert_eq!(quadratic_bspline_1d(-BSPLINE_SUPPORT_RADIUS), 0.0);
    }

    #[test]
    fn test_stencil_partition_of_unity() {
        for pos in [
            Vec3::new(5.5, 5.5, 5.5),
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(7.13, 2.91, 4.62),
            Vec3::new(3.99, 8.01, 6.5),
        ] {
            let sum: f32 = Stencil::new(pos).nodes().map(|n| n.weight).sum();
            assert!((sum - 1.0).abs() < 1e-5, "sum={} at {:?}", sum, pos);
        }
    }

    #[test]
    fn test_stencil_first_moment_vanishes() {
        // Quadratic B-splines reproduce linear functions, so the weighted
        // offsets cancel. This is what makes the stress scatter momentum-free.
        let pos = Vec3::new(10.3, 4.8, 7.05);
        let moment: Vec3 = Stencil::new(pos)
            .nodes()
            .map(|n| n.offset * n.weight)
            .sum();
        assert!(moment.length() < 1e-5, "moment={:?}", moment);
    }

    #[test]
    fn test_stencil_matches_tensor_product() {
        let pos = Vec3::new(2.2, 3.7, 1.4);
        for node in Stencil::new(pos).nodes() {
            let expected = quadratic_bspline_3d(-node.offset);
            assert!((node.weight - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stencil_covers_27_nodes_around_cell() {
        let stencil = Stencil::new(Vec3::new(4.2, 4.9, 4.5));
        assert_eq!(stencil.base(), IVec3::new(4, 4, 4));
        let nodes: Vec<_> = stencil.nodes().collect();
        assert_eq!(nodes.len(), 27);
        assert_eq!(nodes[0].cell, IVec3::new(3, 3, 3));
        assert_eq!(nodes[26].cell, IVec3::new(5, 5, 5));
    }

    #[test]
    fn test_apic_d_inverse_unit_cell() {
        assert_eq!(apic_d_inverse(1.0), 4.0);
    }
}
