//! Proprioceptive sensing for creatures
//!
//! A [`SensorFrame`] is read from the physics world once per tick and flattened
//! into the brain's input vector:
//! `[vx, vy, height, joint angles.., ground contact]`.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use crate::physics::{BodyGroup, GROUND_Y, PhysicsWorld};

/// Centroid velocity is divided by this before it reaches the brain (m/s)
pub const VELOCITY_SCALE: f32 = 5.0;

/// A part closer than this to the ground counts as touching it (m)
pub const CONTACT_EPSILON: f32 = 0.05;

/// Sensed state of one creature for one tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorFrame {
    /// Centroid velocity, divided by [`VELOCITY_SCALE`]
    pub velocity: Vec2,
    /// Centroid height above the ground
    pub height: f32,
    /// Child angle minus parent angle per hinge, in [-π, π]
    pub joint_angles: Vec<f32>,
    pub ground_contact: bool,
}

impl SensorFrame {
    /// Length of the flattened vector for a body with `joint_count` hinges
    pub const fn dim(joint_count: usize) -> usize {
        4 + joint_count // vx, vy, height, contact + one per joint
    }

    /// Flatten into the brain's input order
    pub fn to_vec(&self) -> Vec<f32> {
        let mut features = Vec::with_capacity(Self::dim(self.joint_angles.len()));
        features.push(self.velocity.x);
        features.push(self.velocity.y);
        features.push(self.height);
        features.extend(&self.joint_angles);
        features.push(if self.ground_contact { 1.0 } else { 0.0 });
        features
    }

    /// Read a body group's state from the world.
    ///
    /// Bodies missing from the world (already despawned) are skipped.
    pub fn gather(group: &BodyGroup, world: &PhysicsWorld) -> Self {
        let mut centroid = Vec2::ZERO;
        let mut velocity = Vec2::ZERO;
        let mut count = 0usize;
        let mut ground_contact = false;

        for (handle, shape) in group.bodies().iter().zip(group.shapes()) {
            let Some(state) = world.body_state(*handle) else {
                continue;
            };
            centroid += state.position;
            velocity += state.velocity;
            count += 1;

            if state.position.y - shape.extent_below(state.angle) <= GROUND_Y + CONTACT_EPSILON {
                ground_contact = true;
            }
        }

        if count > 0 {
            centroid /= count as f32;
            velocity /= count as f32;
        }

        let joint_angles = group
            .hinges()
            .iter()
            .map(|hinge| {
                let parent = world.body_state(hinge.parent).map_or(0.0, |s| s.angle);
                let child = world.body_state(hinge.child).map_or(0.0, |s| s.angle);
                normalize_angle(child - parent)
            })
            .collect();

        Self {
            velocity: velocity / VELOCITY_SCALE,
            height: centroid.y - GROUND_Y,
            joint_angles,
            ground_contact,
        }
    }
}

/// Wrap an angle into [-π, π]
pub fn normalize_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}
