//! Particle advection and boundary handling.
//!
//! Applied per particle at the end of G2P, in this order: advect, obstacle
//! push-out, hard clamp, then the predictive soft wall.

use glam::Vec3;

use crate::constants::{
    PARTICLE_CLAMP_MAX_INSET, PARTICLE_CLAMP_MIN, WALL_LOOKAHEAD, WALL_MAX_INSET, WALL_MIN,
    WALL_STIFFNESS,
};
use crate::params::Obstacle;
use crate::particle::Particle;

/// Advect using simple Euler integration.
#[inline]
pub fn advect(particle: &mut Particle, dt: f32) {
    particle.position += particle.velocity * dt;
}

/// Project a particle inside the obstacle back onto its surface.
///
/// Velocity into the sphere is removed, tangential velocity is kept.
#[inline]
pub fn push_out_of_obstacle(particle: &mut Particle, obstacle: &Obstacle) {
    if !obstacle.contains(particle.position) {
        return;
    }
    let offset = particle.position - obstacle.center;
    let dist = offset.length();
    let normal = if dist > 1e-6 { offset / dist } else { Vec3::Y };
    particle.position = obstacle.center + normal * obstacle.radius;

    let vel_into_solid = particle.velocity.dot(normal);
    if vel_into_solid < 0.0 {
        particle.velocity -= normal * vel_into_solid;
    }
}

/// Clamp position to `[1, real - 2]` on every axis.
#[inline]
pub fn clamp_to_box(particle: &mut Particle, real_box: Vec3) {
    let min = Vec3::splat(PARTICLE_CLAMP_MIN);
    let max = real_box - Vec3::splat(PARTICLE_CLAMP_MAX_INSET);
    particle.position = particle.position.clamp(min, max.max(min));
}

/// Predictive soft wall.
///
/// Looks `WALL_LOOKAHEAD` steps ahead and pulls velocity back toward the
/// wall planes at `3` and `real - 4` when the predicted position crosses them.
#[inline]
pub fn apply_soft_walls(particle: &mut Particle, real_box: Vec3, dt: f32) {
    let predicted = particle.position + particle.velocity * dt * WALL_LOOKAHEAD;
    let wall_min = Vec3::splat(WALL_MIN);
    let wall_max = real_box - Vec3::splat(WALL_MAX_INSET);

    let below = (wall_min - predicted).max(Vec3::ZERO);
    let above = (wall_max - predicted).min(Vec3::ZERO);
    particle.velocity += (below + above) * WALL_STIFFNESS;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advect() {
        let mut p = Particle::new(Vec3::ONE, Vec3::new(1.0, -2.0, 0.5));
        advect(&mut p, 0.5);
        assert_eq!(p.position, Vec3::new(1.5, 0.0, 1.25));
    }

    #[test]
    fn test_obstacle_push_out_removes_inward_velocity() {
        let obstacle = Obstacle {
            center: Vec3::splat(10.0),
            radius: 4.0,
        };
        let mut p = Particle::new(Vec3::new(12.0, 10.0, 10.0), Vec3::new(-1.0, 0.5, 0.0));
        push_out_of_obstacle(&mut p, &obstacle);
        assert!((p.position - Vec3::new(14.0, 10.0, 10.0)).length() < 1e-5);
        assert_eq!(p.velocity, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn test_obstacle_keeps_outward_velocity() {
        let obstacle = Obstacle {
            center: Vec3::splat(10.0),
            radius: 4.0,
        };
        let mut p = Particle::new(Vec3::new(10.0, 8.0, 10.0), -Vec3::Y);
        push_out_of_obstacle(&mut p, &obstacle);
        assert!((p.position.y - 6.0).abs() < 1e-5);
        // Moving away from the center along -Y is outward here
        assert_eq!(p.velocity, -Vec3::Y);
    }

    #[test]
    fn test_outside_obstacle_untouched() {
        let obstacle = Obstacle {
            center: Vec3::splat(10.0),
            radius: 4.0,
        };
        let mut p = Particle::new(Vec3::new(2.0, 2.0, 2.0), Vec3::X);
        push_out_of_obstacle(&mut p, &obstacle);
        assert_eq!(p.position, Vec3::splat(2.0));
        assert_eq!(p.velocity, Vec3::X);
    }

    #[test]
    fn test_clamp_to_box() {
        let mut p = Particle::at(Vec3::new(-3.0, 50.0, 5.0));
        clamp_to_box(&mut p, Vec3::splat(20.0));
        assert_eq!(p.position, Vec3::new(1.0, 18.0, 5.0));
    }

    #[test]
    fn test_soft_wall_pushes_back() {
        let real = Vec3::splat(20.0);
        // Heading into the high X wall at 16
        let mut p = Particle::new(Vec3::new(15.5, 10.0, 10.0), Vec3::new(2.0, 0.0, 0.0));
        apply_soft_walls(&mut p, real, 0.2);
        // predicted x = 15.5 + 2 * 0.2 * 3 = 16.7
        assert!((p.velocity.x - (2.0 - 0.3 * 0.7)).abs() < 1e-5);
        assert_eq!(p.velocity.y, 0.0);

        // Heading into the low Y wall at 3
        let mut q = Particle::new(Vec3::new(10.0, 3.5, 10.0), Vec3::new(0.0, -2.0, 0.0));
        apply_soft_walls(&mut q, real, 0.2);
        // predicted y = 3.5 - 2 * 0.2 * 3 = 2.3
        assert!((q.velocity.y - (-2.0 + 0.3 * 0.7)).abs() < 1e-5);
        assert_eq!(q.velocity.x, 0.0);
    }

    #[test]
    fn test_soft_wall_idle_in_interior() {
        let mut p = Particle::new(Vec3::splat(10.0), Vec3::new(0.1, -0.1, 0.1));
        apply_soft_walls(&mut p, Vec3::splat(20.0), 0.2);
        assert_eq!(p.velocity, Vec3::new(0.1, -0.1, 0.1));
    }
}
