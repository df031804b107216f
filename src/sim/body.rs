//! Rigid ball body with gravity, quadratic drag and boundary response
//!
//! Integration is explicit Euler in the order velocity-then-position, so the
//! position update always uses the freshly integrated velocity.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    Bounds, CollisionResult, apply_surface_friction, ball_ceiling_collision,
    ball_ground_collision, ball_wall_collision, bounce_velocity,
};
use crate::consts::*;
use crate::{clamp_unit, snap_to_zero};

/// Environment constants shared by every body in a simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravitational acceleration magnitude (applied along -y)
    pub gravity: f32,
    /// Contact snap threshold as a multiple of `gravity * dt`
    pub rest_threshold_scale: f32,
    /// Below this speed drag is treated as zero
    pub min_drag_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            rest_threshold_scale: REST_THRESHOLD_SCALE,
            min_drag_speed: MIN_DRAG_SPEED,
        }
    }
}

impl PhysicsConfig {
    /// No gravity, so nothing ever snaps to rest
    pub fn zero_gravity() -> Self {
        Self {
            gravity: 0.0,
            ..Default::default()
        }
    }

    /// Speed below which a velocity component snaps to zero after contact
    #[inline]
    pub fn rest_threshold(&self, dt: f32) -> f32 {
        self.rest_threshold_scale * self.gravity * dt
    }

    pub fn validate(&self) -> Result<(), BodyError> {
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(BodyError::InvalidPhysics("gravity must be finite and non-negative"));
        }
        if !self.rest_threshold_scale.is_finite() || self.rest_threshold_scale < 0.0 {
            return Err(BodyError::InvalidPhysics(
                "rest_threshold_scale must be finite and non-negative",
            ));
        }
        if !self.min_drag_speed.is_finite() || self.min_drag_speed < 0.0 {
            return Err(BodyError::InvalidPhysics(
                "min_drag_speed must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Construction parameters for a [`RigidBody2D`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDesc {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Fraction of normal speed kept on bounce, clamped to [0, 1]
    pub restitution: f32,
    /// Tangential damping on ground contact, clamped to [0, 1]
    pub friction: f32,
    /// Quadratic air resistance coefficient
    pub drag: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
            mass: BALL_MASS,
            restitution: BALL_RESTITUTION,
            friction: BALL_FRICTION,
            drag: 0.0,
        }
    }
}

impl BodyDesc {
    /// A default ball centered at `pos`
    pub fn at(pos: Vec2) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }
}

/// Ways that body construction can fail
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum BodyError {
    #[error("radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("mass must be positive and finite, got {0}")]
    InvalidMass(f32),
    #[error("drag coefficient must be non-negative and finite, got {0}")]
    InvalidDrag(f32),
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f32 },
    #[error("arena width {width} cannot fit a ball of radius {radius}")]
    ArenaTooNarrow { width: f32, radius: f32 },
    #[error("arena height {height} cannot fit a ball of radius {radius}")]
    ArenaTooLow { height: f32, radius: f32 },
    #[error("bounds must be finite")]
    NonFiniteBounds,
    #[error("invalid physics config: {0}")]
    InvalidPhysics(&'static str),
}

/// Contacts made during one [`RigidBody2D::advance`] call
///
/// Each field holds the speed into the surface just before the response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    pub ground_impact: Option<f32>,
    pub wall_impact: Option<f32>,
    pub ceiling_impact: Option<f32>,
}

impl StepOutcome {
    /// Whether any boundary was touched
    pub fn collided(&self) -> bool {
        self.ground_impact.is_some() || self.wall_impact.is_some() || self.ceiling_impact.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Ground,
    Wall,
    Ceiling,
}

/// A ball moving under gravity and drag inside static bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigidBody2D {
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    mass: f32,
    restitution: f32,
    friction: f32,
    drag: f32,
    #[serde(skip)]
    physics: PhysicsConfig,
    #[serde(skip)]
    bounds: Bounds,
}

impl RigidBody2D {
    /// Validate `desc` against the environment and build a body
    pub fn new(desc: BodyDesc, physics: PhysicsConfig, bounds: Bounds) -> Result<Self, BodyError> {
        for (name, value) in [
            ("pos.x", desc.pos.x),
            ("pos.y", desc.pos.y),
            ("vel.x", desc.vel.x),
            ("vel.y", desc.vel.y),
            ("restitution", desc.restitution),
            ("friction", desc.friction),
        ] {
            if !value.is_finite() {
                return Err(BodyError::NonFinite { name, value });
            }
        }
        if !desc.radius.is_finite() || desc.radius <= 0.0 {
            return Err(BodyError::InvalidRadius(desc.radius));
        }
        if !desc.mass.is_finite() || desc.mass <= 0.0 {
            return Err(BodyError::InvalidMass(desc.mass));
        }
        if !desc.drag.is_finite() || desc.drag < 0.0 {
            return Err(BodyError::InvalidDrag(desc.drag));
        }
        physics.validate()?;
        check_bounds_fit(&bounds, desc.radius)?;

        Ok(Self {
            pos: desc.pos,
            vel: desc.vel,
            radius: desc.radius,
            mass: desc.mass,
            restitution: clamp_unit(desc.restitution),
            friction: clamp_unit(desc.friction),
            drag: desc.drag,
            physics,
            bounds,
        })
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn drag(&self) -> f32 {
        self.drag
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Teleport the body; the next `advance` resolves any overlap
    pub fn set_pos(&mut self, pos: Vec2) {
        if pos.is_finite() {
            self.pos = pos;
        }
    }

    pub fn set_vel(&mut self, vel: Vec2) {
        if vel.is_finite() {
            self.vel = vel;
        }
    }

    /// Instantaneous change in momentum
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if impulse.is_finite() {
            self.vel += impulse / self.mass;
        }
    }

    /// Gravity plus drag acting on the body at its current velocity
    pub fn net_force(&self) -> Vec2 {
        Vec2::new(0.0, -self.mass * self.physics.gravity) + self.drag_force()
    }

    /// Quadratic drag: -c·|v|²·v̂, zero below `min_drag_speed`
    pub fn drag_force(&self) -> Vec2 {
        let speed = self.vel.length();
        if speed < self.physics.min_drag_speed || speed == 0.0 {
            return Vec2::ZERO;
        }
        -(self.drag * speed) * self.vel
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.vel.length_squared()
    }

    /// Potential energy relative to resting on the ground
    pub fn potential_energy(&self) -> f32 {
        let height = self.pos.y - (self.bounds.ground_y + self.radius);
        self.mass * self.physics.gravity * height
    }

    /// Sitting on the ground with no velocity
    pub fn is_resting(&self) -> bool {
        // Same expression `respond` writes, so a settled ball compares equal
        self.vel == Vec2::ZERO && self.pos.y <= self.bounds.ground_y + self.radius
    }

    /// Advance the body by one timestep
    ///
    /// Non-positive or non-finite `dt` leaves the body untouched.
    pub fn advance(&mut self, dt: f32) -> StepOutcome {
        if !(dt > 0.0 && dt.is_finite()) {
            return StepOutcome::default();
        }

        let accel = self.net_force() / self.mass;
        self.vel += accel * dt;
        self.pos += self.vel * dt;

        let threshold = self.physics.rest_threshold(dt);
        let mut outcome = StepOutcome::default();

        let ground = ball_ground_collision(self.pos, self.radius, self.bounds.ground_y);
        if ground.hit {
            outcome.ground_impact = Some(self.respond(&ground, Surface::Ground, threshold));
        }

        if let Some(walls) = self.bounds.walls {
            let wall = ball_wall_collision(self.pos, self.radius, &walls);
            if wall.hit {
                outcome.wall_impact = Some(self.respond(&wall, Surface::Wall, threshold));
            }
        }

        if let Some(ceiling_y) = self.bounds.ceiling_y {
            let ceiling = ball_ceiling_collision(self.pos, self.radius, ceiling_y);
            if ceiling.hit {
                outcome.ceiling_impact = Some(self.respond(&ceiling, Surface::Ceiling, threshold));
            }
        }

        outcome
    }

    /// Push the ball out of the surface, bounce and damp; returns impact speed
    fn respond(&mut self, contact: &CollisionResult, surface: Surface, threshold: f32) -> f32 {
        let impact_speed = (-self.vel.dot(contact.normal)).max(0.0);

        self.pos = contact.point + contact.normal * self.radius;
        self.vel = bounce_velocity(self.vel, contact.normal, self.restitution);

        match surface {
            Surface::Ground => {
                self.vel = apply_surface_friction(self.vel, contact.normal, self.friction);
                self.vel.x = snap_to_zero(self.vel.x, threshold);
                self.vel.y = snap_to_zero(self.vel.y, threshold);
            }
            Surface::Wall => {
                self.vel.x = snap_to_zero(self.vel.x, threshold);
            }
            Surface::Ceiling => {
                self.vel.y = snap_to_zero(self.vel.y, threshold);
            }
        }

        impact_speed
    }
}

/// Check that a ball of `radius` fits inside `bounds`
pub(crate) fn check_bounds_fit(bounds: &Bounds, radius: f32) -> Result<(), BodyError> {
    if !bounds.is_finite() {
        return Err(BodyError::NonFiniteBounds);
    }
    if let Some(walls) = bounds.walls {
        if walls.width() <= 2.0 * radius {
            return Err(BodyError::ArenaTooNarrow {
                width: walls.width(),
                radius,
            });
        }
    }
    if let Some(ceiling_y) = bounds.ceiling_y {
        let height = ceiling_y - bounds.ground_y;
        if height <= 2.0 * radius {
            return Err(BodyError::ArenaTooLow { height, radius });
        }
    }
    Ok(())
}
