//! Default constants for the MLS-MPM fluid.
//!
//! ## Units
//!
//! The simulation runs in grid units: one grid cell is one unit wide and the
//! cell volume is 1. Densities are "particles per cell" (each particle carries
//! unit mass), so `REST_DENSITY = 4.0` means four particles per cell at rest.
//!
//! Time is also in simulation units. `DT = 0.2` is large compared to a
//! physical solver; `SUBSTEPS` passes per frame keep it stable.

/// Gravity acceleration along Y (grid units / time²)
pub const GRAVITY: f32 = -0.3;

/// Equation-of-state stiffness
pub const STIFFNESS: f32 = 3.0;

/// Rest density (particles per unit cell volume)
pub const REST_DENSITY: f32 = 4.0;

/// Dynamic viscosity applied to the symmetric part of C
pub const DYNAMIC_VISCOSITY: f32 = 0.1;

/// Timestep per sub-step
pub const DT: f32 = 0.2;

/// Exponent of the Tait-style equation of state.
/// `1.0` gives the linear form `stiffness * (density / rest_density - 1)`.
pub const EOS_EXPONENT: f32 = 5.0;

/// Integer multiplier for the fixed-point grid accumulators
pub const FIXED_POINT_MULTIPLIER: f32 = 1.0e7;

/// Scale applied to the interaction velocity when it perturbs the grid
pub const INTERACTION_STRENGTH: f32 = 1.0;

// =============================================================================
// CAPACITIES
// =============================================================================

/// Maximum grid cells per axis
pub const MAX_GRID_AXIS: u32 = 80;

/// Maximum grid cell count (80 x 80 x 80)
pub const MAX_GRID_CELLS: usize =
    (MAX_GRID_AXIS * MAX_GRID_AXIS * MAX_GRID_AXIS) as usize;

/// Particle arena capacity
pub const NUM_PARTICLES_MAX: usize = 200_000;

// =============================================================================
// STEPPING
// =============================================================================

/// Sub-steps executed per visible frame
pub const SUBSTEPS: usize = 2;

/// Particles activated per spawn batch
pub const SPAWN_BATCH: usize = 100;

/// Spawn runs on every `SPAWN_FRAME_INTERVAL`-th frame
pub const SPAWN_FRAME_INTERVAL: u32 = 2;

// =============================================================================
// BOUNDARIES
// =============================================================================

/// Grid cells this close to a face have their normal velocity zeroed.
/// Low faces: index < GRID_BOUNDARY_CELLS.
/// High faces: index > ceil(real) - GRID_BOUNDARY_CELLS - 1.
pub const GRID_BOUNDARY_CELLS: i32 = 2;

/// Particle positions are clamped to [PARTICLE_CLAMP_MIN, real - PARTICLE_CLAMP_MAX_INSET]
pub const PARTICLE_CLAMP_MIN: f32 = 1.0;
pub const PARTICLE_CLAMP_MAX_INSET: f32 = 2.0;

/// Look-ahead factor (in timesteps) for the soft wall impulse
pub const WALL_LOOKAHEAD: f32 = 3.0;

/// Strength of the soft wall impulse
pub const WALL_STIFFNESS: f32 = 0.3;

/// Soft walls sit at WALL_MIN and real - WALL_MAX_INSET
pub const WALL_MIN: f32 = 3.0;
pub const WALL_MAX_INSET: f32 = 4.0;

// =============================================================================
// DAM-BREAK LAYOUT
// =============================================================================

/// Lattice spacing of the seeded layout
pub const LAYOUT_SPACING: f32 = 0.55;

/// Maximum per-particle jitter added to all three axes
pub const LAYOUT_JITTER: f32 = 2.0;

/// Default seed for the layout jitter
pub const LAYOUT_SEED: u64 = 0x5EED_F1D0;

// =============================================================================
// KERNEL
// =============================================================================

/// Support radius of the quadratic B-spline (covers 3 grid nodes per axis)
pub const BSPLINE_SUPPORT_RADIUS: f32 = 1.5;
