//! Dam-break initial layout.
//!
//! A jittered lattice filling the lower-front part of the box. Positions are
//! emitted top layer first, so activating a prefix of the layout spawns fluid
//! from the top and lets it fall.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::{LAYOUT_JITTER, LAYOUT_SPACING};
use crate::params::Obstacle;

/// Lattice starts this far from the low faces.
const LATTICE_START: f32 = 3.0;
/// Lattice stops this far short of the high X face.
const LATTICE_X_INSET: f32 = 4.0;
/// Fraction of the box height that is filled.
const FILL_HEIGHT: f32 = 0.8;
/// Fraction of the box depth that is filled.
const FILL_DEPTH: f32 = 0.5;
/// Extra clearance kept around the obstacle.
const OBSTACLE_MARGIN: f32 = 1.0;

/// Deterministic dam-break generator.
#[derive(Clone, Copy, Debug)]
pub struct DamBreakLayout {
    pub box_size: Vec3,
    pub obstacle: Obstacle,
    pub spacing: f32,
    pub jitter: f32,
}

impl DamBreakLayout {
    pub fn new(box_size: Vec3, obstacle: Obstacle) -> Self {
        Self {
            box_size,
            obstacle,
            spacing: LAYOUT_SPACING,
            jitter: LAYOUT_JITTER,
        }
    }

    /// Generate every lattice position, top layer first.
    ///
    /// The same seed always yields the same layout.
    pub fn generate(&self, seed: u64) -> Vec<Vec3> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let xs = lattice(LATTICE_START, self.box_size.x - LATTICE_X_INSET, self.spacing);
        let zs = lattice(LATTICE_START, self.box_size.z * FILL_DEPTH, self.spacing);
        let mut ys = lattice(LATTICE_START, self.box_size.y * FILL_HEIGHT, self.spacing);
        ys.reverse();

        let clearance = Obstacle {
            radius: self.obstacle.radius + OBSTACLE_MARGIN,
            ..self.obstacle
        };

        let mut positions = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &y in &ys {
            for &x in &xs {
                for &z in &zs {
                    // One offset shared by all three axes
                    let offset = if self.jitter > 0.0 {
                        rng.gen_range(0.0..self.jitter)
                    } else {
                        0.0
                    };
                    let p = Vec3::new(x, y, z) + Vec3::splat(offset);
                    if self.obstacle.radius > 0.0 && clearance.contains(p) {
                        continue;
                    }
                    positions.push(p);
                }
            }
        }

        log::debug!(
            "Dam-break layout: {} positions in box {} (seed {:#x})",
            positions.len(),
            self.box_size,
            seed
        );
        positions
    }
}

/// `start, start + step, ...` strictly below `end`.
fn lattice(start: f32, end: f32, step: f32) -> Vec<f32> {
    if step <= 0.0 || end <= start {
        return Vec::new();
    }
    let count = ((end - start) / step).ceil() as usize + 1;
    (0..count)
        .map(|n| start + n as f32 * step)
        .filter(|&v| v < end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_layout(size: f32) -> DamBreakLayout {
        DamBreakLayout::new(
            Vec3::splat(size),
            Obstacle {
                center: Vec3::splat(size * 0.5),
                radius: 0.0,
            },
        )
    }

    #[test]
    fn test_layout_is_deterministic() {
        let layout = open_layout(20.0);
        assert_eq!(layout.generate(7), layout.generate(7));
        assert_ne!(layout.generate(7), layout.generate(8));
    }

    #[test]
    fn test_layout_is_top_down() {
        let positions = open_layout(20.0).generate(1);
        let first = positions.first().unwrap();
        let last = positions.last().unwrap();
        assert!(first.y > last.y + 5.0, "first={} last={}", first, last);
    }

    #[test]
    fn test_layout_fills_lower_front_region() {
        let size = 20.0;
        let layout = open_layout(size);
        for p in layout.generate(3) {
            let lo = LATTICE_START;
            assert!(p.x >= lo && p.x < size - LATTICE_X_INSET + layout.jitter);
            assert!(p.y >= lo && p.y < size * FILL_HEIGHT + layout.jitter);
            assert!(p.z >= lo && p.z < size * FILL_DEPTH + layout.jitter);
        }
    }

    #[test]
    fn test_layout_skips_obstacle() {
        let size = 40.0;
        let obstacle = Obstacle {
            center: Vec3::splat(size * 0.5),
            radius: 8.0,
        };
        let positions = DamBreakLayout::new(Vec3::splat(size), obstacle).generate(11);
        assert!(!positions.is_empty());
        assert!(positions
            .iter()
            .all(|p| p.distance(obstacle.center) >= obstacle.radius + OBSTACLE_MARGIN));
    }

    #[test]
    fn test_lattice_bounds() {
        assert_eq!(lattice(3.0, 4.0, 0.5), vec![3.0, 3.5]);
        assert!(lattice(5.0, 4.0, 0.5).is_empty());
    }
}
