//! Pointer/hand interaction and depth-gated coupling into the grid.
//!
//! The input is a normalized screen point (origin top-left, y down) and a
//! velocity measured on the camera's focal plane. The renderer's depth surface
//! decides whether the point lands on fluid. If it does, the point is lifted
//! to a world position and nearby grid cells are pushed.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Near plane of the interaction camera.
const NEAR: f32 = 0.1;
/// Far plane of the interaction camera.
const FAR: f32 = 300.0;

/// Interaction sample for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InteractionInput {
    /// Normalized screen coordinate in [0, 1]²
    pub point: Vec2,
    /// Velocity on the camera focal plane
    pub velocity: Vec2,
    /// Effect radius in grid units
    pub radius: f32,
}

impl InteractionInput {
    /// No device reports a position.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this input can perturb anything.
    pub fn is_active(&self) -> bool {
        self.radius > 0.0 && self.velocity != Vec2::ZERO
    }
}

/// View and projection of the camera that sees the fluid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width over height
    pub aspect: f32,
    /// Distance from eye to target
    pub distance: f32,
}

impl CameraMatrices {
    /// Camera at `eye` looking at `target`, Y up.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y, aspect, NEAR, FAR),
            fov_y,
            aspect,
            distance: eye.distance(target),
        }
    }

    /// Map a normalized screen point onto the focal plane.
    ///
    /// `ndc * tan(fov / 2) * distance`, with aspect applied to X.
    pub fn plane_coord(&self, point: Vec2) -> Vec2 {
        let ndc = to_ndc(point);
        let half = (self.fov_y * 0.5).tan();
        Vec2::new(ndc.x * half * self.aspect, ndc.y * half) * self.distance
    }

    /// World position of a screen point at the given view-space depth.
    pub fn unproject(&self, point: Vec2, depth: f32) -> Vec3 {
        let ndc = to_ndc(point);
        let clip = self.projection.inverse() * Vec4::new(ndc.x, ndc.y, 0.5, 1.0);
        let ray = clip.truncate() / clip.w;
        // Camera looks down -Z in view space
        let view_pos = ray * (depth / -ray.z);
        self.view.inverse().transform_point3(view_pos)
    }

    /// Rotate a focal-plane velocity into world space.
    pub fn plane_velocity_to_world(&self, velocity: Vec2) -> Vec3 {
        (self.view.inverse() * Vec4::new(velocity.x, velocity.y, 0.0, 0.0)).truncate()
    }
}

fn to_ndc(point: Vec2) -> Vec2 {
    Vec2::new(point.x * 2.0 - 1.0, 1.0 - point.y * 2.0)
}

/// Nearest visible fluid depth per screen point.
pub trait DepthSurface: Sync {
    /// View-space depth at `point`, or `None` where nothing was drawn.
    fn sample(&self, point: Vec2) -> Option<f32>;
}

/// Row-major depth buffer as produced by the renderer.
#[derive(Clone, Debug)]
pub struct DepthMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthMap {
    /// Cleared value. Anything at or beyond this is empty.
    pub const FAR: f32 = 1.0e4;

    /// Cleared map of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Self::FAR; width * height],
        }
    }

    /// Wrap existing depth values. `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Write one pixel. Out-of-range pixels are ignored.
    pub fn set(&mut self, x: usize, y: usize, depth: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = depth;
        }
    }

    /// Reset every pixel to [`DepthMap::FAR`].
    pub fn clear(&mut self) {
        self.data.fill(Self::FAR);
    }
}

impl DepthSurface for DepthMap {
    fn sample(&self, point: Vec2) -> Option<f32> {
        if self.width == 0 || self.height == 0 || !point.is_finite() {
            return None;
        }
        let x = ((point.x * self.width as f32) as isize).clamp(0, self.width as isize - 1);
        let y = ((point.y * self.height as f32) as isize).clamp(0, self.height as isize - 1);
        let depth = self.data[y as usize * self.width + x as usize];
        (depth.is_finite() && depth > 0.0 && depth < Self::FAR).then_some(depth)
    }
}

/// Same depth everywhere.
#[derive(Clone, Copy, Debug)]
pub struct UniformDepth(pub f32);

impl DepthSurface for UniformDepth {
    fn sample(&self, _point: Vec2) -> Option<f32> {
        Some(self.0)
    }
}

/// Nothing drawn anywhere.
#[derive(Clone, Copy, Debug)]
pub struct FarSurface;

impl DepthSurface for FarSurface {
    fn sample(&self, _point: Vec2) -> Option<f32> {
        None
    }
}

/// What the grid update needs to know about the viewer.
#[derive(Clone, Copy)]
pub struct Occlusion<'a> {
    pub camera: &'a CameraMatrices,
    pub surface: &'a dyn DepthSurface,
}

impl<'a> Occlusion<'a> {
    pub fn new(camera: &'a CameraMatrices, surface: &'a dyn DepthSurface) -> Self {
        Self { camera, surface }
    }

    /// Resolve the input into a world-space force, if it touches fluid.
    pub fn resolve(&self, input: &InteractionInput) -> Option<InteractionForce> {
        if !input.is_active() {
            return None;
        }
        let depth = self.surface.sample(input.point)?;
        Some(InteractionForce {
            center: self.camera.unproject(input.point, depth),
            radius: input.radius,
            velocity: self.camera.plane_velocity_to_world(input.velocity),
        })
    }
}

/// World-space push applied by the grid update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionForce {
    pub center: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
}

impl InteractionForce {
    /// Whether a cell center lies inside the effect radius.
    #[inline]
    pub fn reaches(&self, cell_center: Vec3) -> bool {
        cell_center.distance_squared(self.center) < self.radius * self.radius
    }
}

/// Pointer or hand sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerSample {
    /// Normalized screen coordinate
    pub point: Vec2,
    pub detected: bool,
}

impl PointerSample {
    pub fn detected(point: Vec2) -> Self {
        Self {
            point,
            detected: true,
        }
    }

    pub fn lost() -> Self {
        Self::default()
    }
}

/// Keeps the last two pointer samples and turns them into an input.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerTracker {
    current: PointerSample,
    previous: PointerSample,
    /// Camera drag in progress; the pointer rotates the view instead
    pub dragging: bool,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this frame's sample.
    pub fn push(&mut self, sample: PointerSample) {
        self.previous = self.current;
        self.current = sample;
    }

    /// Input for this frame. Undetected samples give [`InteractionInput::none`].
    pub fn input(&self, camera: &CameraMatrices, radius: f32) -> InteractionInput {
        if !self.current.detected || !self.previous.detected {
            return InteractionInput::none();
        }
        let velocity = if self.dragging {
            Vec2::ZERO
        } else {
            camera.plane_coord(self.current.point) - camera.plane_coord(self.previous.point)
        };
        InteractionInput {
            point: self.current.point,
            velocity,
            radius,
        }
    }
}
