//! Boundary collision detection and response
//!
//! The arena is axis-aligned: a ground line, optional side walls and an
//! optional ceiling. Every check is per axis, so a ball in a corner collides
//! with both surfaces in the same step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Side walls bounding the arena horizontally
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Walls {
    pub min_x: f32,
    pub max_x: f32,
}

impl Walls {
    pub fn new(min_x: f32, max_x: f32) -> Self {
        Self { min_x, max_x }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }
}

/// Static boundaries a body collides against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    /// Height of the ground line (y axis points up)
    pub ground_y: f32,
    /// Optional left/right walls
    pub walls: Option<Walls>,
    /// Optional ceiling line
    pub ceiling_y: Option<f32>,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            ground_y: 0.0,
            walls: None,
            ceiling_y: None,
        }
    }
}

impl Bounds {
    /// Ground only, at the given height
    pub fn ground(ground_y: f32) -> Self {
        Self {
            ground_y,
            ..Default::default()
        }
    }

    /// Closed box: ground, both walls and a ceiling
    pub fn boxed(min_x: f32, max_x: f32, ground_y: f32, ceiling_y: f32) -> Self {
        Self {
            ground_y,
            walls: Some(Walls::new(min_x, max_x)),
            ceiling_y: Some(ceiling_y),
        }
    }

    pub fn with_walls(mut self, min_x: f32, max_x: f32) -> Self {
        self.walls = Some(Walls::new(min_x, max_x));
        self
    }

    pub fn with_ceiling(mut self, ceiling_y: f32) -> Self {
        self.ceiling_y = Some(ceiling_y);
        self
    }

    /// Whether all configured values are finite numbers
    pub fn is_finite(&self) -> bool {
        self.ground_y.is_finite()
            && self
                .walls
                .is_none_or(|w| w.min_x.is_finite() && w.max_x.is_finite())
            && self.ceiling_y.is_none_or(f32::is_finite)
    }
}

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the boundary (if hit)
    pub point: Vec2,
    /// Surface normal, pointing back into the arena
    pub normal: Vec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
        }
    }
}

/// Check a ball against the ground line
pub fn ball_ground_collision(ball_pos: Vec2, ball_radius: f32, ground_y: f32) -> CollisionResult {
    let bottom = ball_pos.y - ball_radius;
    if bottom < ground_y {
        return CollisionResult {
            hit: true,
            point: Vec2::new(ball_pos.x, ground_y),
            normal: Vec2::Y,
        };
    }

    CollisionResult::miss()
}

/// Check a ball against the ceiling line
pub fn ball_ceiling_collision(ball_pos: Vec2, ball_radius: f32, ceiling_y: f32) -> CollisionResult {
    let top = ball_pos.y + ball_radius;
    if top > ceiling_y {
        return CollisionResult {
            hit: true,
            point: Vec2::new(ball_pos.x, ceiling_y),
            normal: Vec2::NEG_Y,
        };
    }

    CollisionResult::miss()
}

/// Check a ball against the side walls
///
/// Only one wall can be touched at a time as long as the arena is wider than
/// the ball, which body construction guarantees.
pub fn ball_wall_collision(ball_pos: Vec2, ball_radius: f32, walls: &Walls) -> CollisionResult {
    let left = ball_pos.x - ball_radius;
    if left < walls.min_x {
        return CollisionResult {
            hit: true,
            point: Vec2::new(walls.min_x, ball_pos.y),
            normal: Vec2::X,
        };
    }

    let right = ball_pos.x + ball_radius;
    if right > walls.max_x {
        return CollisionResult {
            hit: true,
            point: Vec2::new(walls.max_x, ball_pos.y),
            normal: Vec2::NEG_X,
        };
    }

    CollisionResult::miss()
}

/// Bounce velocity off a surface, keeping `restitution` of the normal speed
///
/// v' = v - (1 + e)(v·n)n, applied only while moving into the surface. With
/// `restitution == 1.0` this is a mirror reflection.
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let into_surface = velocity.dot(normal);
    if into_surface >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * into_surface * normal
}

/// Scale the tangential part of `velocity` by `1 - friction`
#[inline]
pub fn apply_surface_friction(velocity: Vec2, normal: Vec2, friction: f32) -> Vec2 {
    let normal_part = velocity.dot(normal) * normal;
    let tangent_part = velocity - normal_part;
    normal_part + tangent_part * (1.0 - friction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_collision_contact() {
        let result = ball_ground_collision(Vec2::new(3.0, 0.5), 1.0, 0.0);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::Y);
        assert_eq!(result.point, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_ground_collision_miss_when_touching() {
        // Exactly resting on the ground is not a collision
        let result = ball_ground_collision(Vec2::new(0.0, 1.0), 1.0, 0.0);
        assert!(!result.hit);
    }

    #[test]
    fn test_ceiling_collision() {
        let result = ball_ceiling_collision(Vec2::new(0.0, 9.5), 1.0, 10.0);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::NEG_Y);
        assert_eq!(result.point, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn test_wall_collision_left_and_right() {
        let walls = Walls::new(0.0, 10.0);

        let left = ball_wall_collision(Vec2::new(0.25, 5.0), 0.5, &walls);
        assert!(left.hit);
        assert_eq!(left.normal, Vec2::X);
        assert_eq!(left.point, Vec2::new(0.0, 5.0));

        let right = ball_wall_collision(Vec2::new(9.75, 5.0), 0.5, &walls);
        assert!(right.hit);
        assert_eq!(right.normal, Vec2::NEG_X);

        let inside = ball_wall_collision(Vec2::new(5.0, 5.0), 0.5, &walls);
        assert!(!inside.hit);
    }

    #[test]
    fn test_bounce_velocity_scales_normal_speed() {
        let v = bounce_velocity(Vec2::new(2.0, -4.0), Vec2::Y, 0.5);
        assert!((v.x - 2.0).abs() < 1e-6);
        assert!((v.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounce_velocity_ignores_separating_motion() {
        let v = Vec2::new(1.0, 3.0);
        assert_eq!(bounce_velocity(v, Vec2::Y, 0.5), v);
    }

    #[test]
    fn test_full_restitution_mirrors_velocity() {
        let v = Vec2::new(1.5, -2.5);
        assert!((bounce_velocity(v, Vec2::Y, 1.0) - Vec2::new(1.5, 2.5)).length() < 1e-6);
    }

    #[test]
    fn test_surface_friction_only_touches_tangent() {
        let v = apply_surface_friction(Vec2::new(4.0, 2.0), Vec2::Y, 0.25);
        assert!((v.x - 3.0).abs() < 1e-6);
        assert!((v.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_finite_check() {
        assert!(Bounds::boxed(0.0, 10.0, 0.0, 10.0).is_finite());
        assert!(!Bounds::ground(f32::NAN).is_finite());
        assert!(!Bounds::ground(0.0).with_walls(0.0, f32::INFINITY).is_finite());
    }
}
