//! Compact per-particle output for the renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rayon::prelude::*;

use crate::particle::Particle;

/// Position, velocity and density of one particle (32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PosVel {
    pub position: Vec3,
    _pad: f32,
    pub velocity: Vec3,
    pub density: f32,
}

impl PosVel {
    pub const STRIDE: usize = 32;

    pub fn new(position: Vec3, velocity: Vec3, density: f32) -> Self {
        Self {
            position,
            _pad: 0.0,
            velocity,
            density,
        }
    }
}

/// Fixed-capacity buffer the renderer reads from.
pub struct OutputBuffer {
    records: Vec<PosVel>,
    len: usize,
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: vec![PosVel::zeroed(); capacity],
            len: 0,
        }
    }

    /// Overwrite the buffer with the active particles.
    ///
    /// `densities` pairs with `particles` by index.
    pub fn write(&mut self, particles: &[Particle], densities: &[f32]) {
        let len = particles.len().min(self.records.len());
        self.records[..len]
            .par_iter_mut()
            .zip(particles[..len].par_iter())
            .enumerate()
            .for_each(|(i, (out, p))| {
                let density = densities.get(i).copied().unwrap_or(0.0);
                *out = PosVel::new(p.position, p.velocity, density);
            });
        self.len = len;
    }

    /// Forget all records.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn records(&self) -> &[PosVel] {
        &self.records[..self.len]
    }

    /// Raw bytes of the written records, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.records())
    }
}
