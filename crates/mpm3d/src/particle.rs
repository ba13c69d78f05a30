//! Particle records and the fixed-capacity particle arena.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3, Vec4};

/// A single fluid sample.
///
/// Stored at a fixed 80-byte stride: each vec3 is padded to 16 bytes and the
/// affine matrix is three padded columns.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Particle {
    /// Position in grid units
    pub position: Vec3,
    _pad0: f32,
    /// Current velocity
    pub velocity: Vec3,
    _pad1: f32,
    /// APIC affine velocity matrix, column-major with a padding lane per column
    affine: [Vec4; 3],
}

impl Particle {
    /// Byte stride of one record.
    pub const STRIDE: usize = 80;

    /// Create a new particle at the given position with initial velocity.
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            _pad0: 0.0,
            velocity,
            _pad1: 0.0,
            affine: [Vec4::ZERO; 3],
        }
    }

    /// Create a stationary particle at the given position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO)
    }

    /// APIC affine velocity matrix (captures local velocity gradient).
    #[inline]
    pub fn affine_velocity(&self) -> Mat3 {
        Mat3::from_cols(
            self.affine[0].truncate(),
            self.affine[1].truncate(),
            self.affine[2].truncate(),
        )
    }

    /// Replace the affine velocity matrix.
    #[inline]
    pub fn set_affine_velocity(&mut self, c: Mat3) {
        self.affine = [
            c.x_axis.extend(0.0),
            c.y_axis.extend(0.0),
            c.z_axis.extend(0.0),
        ];
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// Fixed-capacity particle arena with an active prefix.
///
/// Slots `[0, len)` are live. Slots `[len, seeded)` hold the pre-seeded
/// layout waiting to be activated. Nothing past `seeded` is ever read.
pub struct ParticleStore {
    slots: Vec<Particle>,
    seeded: usize,
    active: usize,
}

impl ParticleStore {
    /// Allocate an arena with the given capacity. No particle is seeded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Particle::zeroed(); capacity],
            seeded: 0,
            active: 0,
        }
    }

    /// Arena capacity (`num_particles_max`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active particles.
    pub fn len(&self) -> usize {
        self.active
    }

    /// Check if no particle is active.
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Number of seeded slots (active or waiting).
    pub fn seeded(&self) -> usize {
        self.seeded
    }

    /// Replace the seeded layout and deactivate every particle.
    ///
    /// Positions beyond the arena capacity are dropped.
    pub fn seed(&mut self, layout: &[Vec3]) {
        let count = layout.len().min(self.capacity());
        for (slot, &position) in self.slots.iter_mut().zip(&layout[..count]) {
            *slot = Particle::at(position);
        }
        self.seeded = count;
        self.active = 0;
    }

    /// Activate up to `batch` seeded particles without passing `limit`.
    ///
    /// Newly activated particles start at rest with a zero affine matrix.
    /// Returns the number of particles activated.
    pub fn activate(&mut self, batch: usize, limit: usize) -> usize {
        let cap = limit.min(self.seeded);
        let new_len = (self.active + batch).min(cap).max(self.active);
        for p in &mut self.slots[self.active..new_len] {
            p.velocity = Vec3::ZERO;
            p.set_affine_velocity(Mat3::ZERO);
        }
        let activated = new_len - self.active;
        self.active = new_len;
        activated
    }

    /// Active particles.
    pub fn active(&self) -> &[Particle] {
        &self.slots[..self.active]
    }

    /// Mutable active particles.
    pub fn active_mut(&mut self) -> &mut [Particle] {
        &mut self.slots[..self.active]
    }

    /// Seeded positions, active or not, for diagnostics.
    pub fn seeded_slots(&self) -> &[Particle] {
        &self.slots[..self.seeded]
    }

    /// Raw bytes of the active prefix.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.active())
    }
}
