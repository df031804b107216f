//! World state: an ordered set of independent balls
//!
//! Balls never collide with each other, only with the shared bounds. Everything
//! needed to reproduce a run (seed, tick counter, body states) lives here.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{BodyDesc, BodyError, PhysicsConfig, RigidBody2D, check_bounds_fit};
use super::collision::Bounds;

/// Something noteworthy that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// Ball bounced off the ground
    Bounced { id: u32, impact_speed: f32 },
    /// Ball bounced off a side wall or the ceiling
    HitBoundary { id: u32, impact_speed: f32 },
    /// Ball settled on the ground
    CameToRest { id: u32 },
}

/// A ball entity
#[derive(Debug, Clone, Serialize)]
pub struct Ball {
    pub id: u32,
    pub body: RigidBody2D,
    /// Resting state as of the last tick
    pub resting: bool,
}

/// How to populate a world with randomly placed balls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterSpec {
    /// Seed for reproducible placement
    pub seed: u64,
    pub count: u32,
    /// Spawn heights, measured above the ground line
    pub min_height: f32,
    pub max_height: f32,
    /// Horizontal spread around x = 0 (narrowed to fit walls)
    pub half_width: f32,
    /// Maximum initial speed along each axis
    pub max_speed: f32,
    /// Material and size shared by every ball
    pub template: BodyDesc,
}

impl Default for ScatterSpec {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            count: 8,
            min_height: 2.0,
            max_height: 10.0,
            half_width: 8.0,
            max_speed: 4.0,
            template: BodyDesc::default(),
        }
    }
}

/// Complete simulation state (deterministic)
#[derive(Debug, Clone, Serialize)]
pub struct World {
    pub physics: PhysicsConfig,
    pub bounds: Bounds,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Balls sorted by id
    pub balls: Vec<Ball>,
    /// Events produced since the last drain
    #[serde(skip)]
    pub events: Vec<SimEvent>,
    next_id: u32,
}

impl World {
    /// Create an empty world
    pub fn new(physics: PhysicsConfig, bounds: Bounds) -> Result<Self, BodyError> {
        physics.validate()?;
        check_bounds_fit(&bounds, 0.0)?;
        Ok(Self {
            physics,
            bounds,
            time_ticks: 0,
            balls: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        })
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a ball and return its id
    pub fn spawn(&mut self, desc: BodyDesc) -> Result<u32, BodyError> {
        let body = RigidBody2D::new(desc, self.physics, self.bounds)?;
        let id = self.next_entity_id();
        let resting = body.is_resting();
        self.balls.push(Ball { id, body, resting });
        Ok(id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Ball> {
        let index = self.balls.iter().position(|b| b.id == id)?;
        Some(self.balls.remove(index))
    }

    pub fn get(&self, id: u32) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    /// Spawn `spec.count` balls at seeded random positions and velocities
    pub fn scatter(&mut self, spec: &ScatterSpec) -> Result<Vec<u32>, BodyError> {
        let mut rng = Pcg32::seed_from_u64(spec.seed);
        let radius = spec.template.radius;

        // Spread around the arena's middle, never past the walls
        let half_width = spec.half_width.abs();
        let (min_x, max_x) = match self.bounds.walls {
            Some(walls) => {
                let center = 0.5 * (walls.min_x + walls.max_x);
                (
                    (center - half_width).max(walls.min_x + radius),
                    (center + half_width).min(walls.max_x - radius),
                )
            }
            None => (-half_width, half_width),
        };
        let floor = self.bounds.ground_y + radius;
        let (mut min_y, mut max_y) = (
            floor + spec.min_height.min(spec.max_height).max(0.0),
            floor + spec.max_height.max(spec.min_height).max(0.0),
        );
        if let Some(ceiling_y) = self.bounds.ceiling_y {
            max_y = max_y.min(ceiling_y - radius);
            min_y = min_y.min(max_y);
        }

        let mut ids = Vec::with_capacity(spec.count as usize);
        for _ in 0..spec.count {
            let pos = Vec2::new(
                lerp(min_x, max_x, rng.random::<f32>()),
                lerp(min_y, max_y, rng.random::<f32>()),
            );
            let vel = Vec2::new(
                lerp(-spec.max_speed, spec.max_speed, rng.random::<f32>()),
                lerp(-spec.max_speed, spec.max_speed, rng.random::<f32>()),
            );
            ids.push(self.spawn(BodyDesc {
                pos,
                vel,
                ..spec.template
            })?);
        }

        log::debug!(
            "Scattered {} balls (seed {:#x}), world now holds {}",
            spec.count,
            spec.seed,
            self.balls.len()
        );
        Ok(ids)
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn resting_count(&self) -> usize {
        self.balls.iter().filter(|b| b.resting).count()
    }

    /// Whether every ball has settled
    pub fn all_resting(&self) -> bool {
        self.balls.iter().all(|b| b.resting)
    }

    /// Kinetic plus potential energy of all balls
    pub fn total_energy(&self) -> f32 {
        self.balls
            .iter()
            .map(|b| b.body.kinetic_energy() + b.body.potential_energy())
            .sum()
    }

    /// Ensure balls are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
