//! Pose integration backends.
//!
//! The controller only produces a displacement per step. Whether that displacement is
//! written straight into the pose or handed to a physics engine (which resolves
//! collisions and reports the final position back) is decided once, when the avatar is
//! built, by its [`MovementMode`].

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Position and heading of an avatar on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvatarPose {
    pub position: Vec3,
    /// Radians, positive turns right.
    pub yaw: f32,
}

impl AvatarPose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    /// Unit vector the avatar walks along when moving forward.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
}

impl CollisionShape {
    /// Height of the shape's center above the ground when resting on it.
    pub fn ground_clearance(&self) -> f32 {
        match *self {
            CollisionShape::Sphere { radius } => radius,
            CollisionShape::Capsule { radius, half_height } => radius + half_height,
        }
    }
}

/// Collision body requested from the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSpec {
    pub shape: CollisionShape,
    pub restitution: f32,
    pub friction: f32,
}

impl Default for CollisionSpec {
    fn default() -> Self {
        Self {
            shape: CollisionShape::Sphere { radius: 1.0 },
            restitution: 0.0,
            friction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    #[default]
    Kinematic,
    Physics(CollisionSpec),
}

pub trait MotionBackend: Send + Sync {
    fn mode(&self) -> MovementMode;

    fn apply_displacement(&mut self, pose: &mut AvatarPose, displacement: Vec3);

    /// Displacement accumulated for the physics engine since the last call.
    fn take_velocity(&mut self) -> Option<Vec3> {
        None
    }
}

/// Writes displacements straight into the pose.
#[derive(Debug, Default)]
pub struct KinematicBackend;

impl MotionBackend for KinematicBackend {
    fn mode(&self) -> MovementMode {
        MovementMode::Kinematic
    }

    fn apply_displacement(&mut self, pose: &mut AvatarPose, displacement: Vec3) {
        pose.position += displacement;
    }
}

/// Buffers displacements until the physics engine consumes them.
///
/// The pose is left untouched; the engine's resolved position comes back through
/// `Avatar::sync_position`.
#[derive(Debug)]
pub struct PhysicsBackend {
    spec: CollisionSpec,
    pending: Vec3,
}

impl PhysicsBackend {
    pub fn new(spec: CollisionSpec) -> Self {
        Self {
            spec,
            pending: Vec3::ZERO,
        }
    }
}

impl MotionBackend for PhysicsBackend {
    fn mode(&self) -> MovementMode {
        MovementMode::Physics(self.spec)
    }

    fn apply_displacement(&mut self, _pose: &mut AvatarPose, displacement: Vec3) {
        self.pending += displacement;
    }

    fn take_velocity(&mut self) -> Option<Vec3> {
        let v = std::mem::replace(&mut self.pending, Vec3::ZERO);
        Some(v)
    }
}

pub fn backend_for(mode: MovementMode) -> Box<dyn MotionBackend> {
    match mode {
        MovementMode::Kinematic => Box::new(KinematicBackend),
        MovementMode::Physics(spec) => Box::new(PhysicsBackend::new(spec)),
    }
}
