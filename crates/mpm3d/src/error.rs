//! Configuration errors.
//!
//! The kernels themselves cannot fail. Everything here is raised while a
//! scenario is being set up and must stop the simulation from starting.

use glam::{UVec3, Vec3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid {dims} has {cell_count} cells, maximum is {max_cell_count}")]
    GridTooLarge {
        dims: UVec3,
        cell_count: usize,
        max_cell_count: usize,
    },

    #[error("grid axis {axis} needs {cells} cells, maximum is {max}")]
    GridAxisTooLarge { axis: char, cells: u32, max: u32 },

    #[error("domain size {size} must be finite and positive on every axis")]
    InvalidDomain { size: Vec3 },

    #[error("real box {real} does not fit the grid laid out for {logical}")]
    RealBoxExceedsGrid { real: Vec3, logical: Vec3 },

    #[error("constant {name} = {value} is out of range ({expected})")]
    InvalidConstant {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
