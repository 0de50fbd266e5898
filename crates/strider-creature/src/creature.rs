//! Main creature entity
//!
//! Combines a genome, the body built from it and the controller driving it,
//! and tracks forward progress as fitness.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;
use crate::physics::PhysicsWorld;
use crate::species::Species;
use crate::traits::{Body, Controller};
use crate::types::CreatureTag;
use crate::{BodyPartRenderData, CreatureRenderData, SpringRenderData};

/// When a creature is retired before its trial ends.
///
/// A retired creature is removed from the world and its fitness frozen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EarlyTermination {
    /// Every creature runs the whole trial
    #[default]
    Never,
    /// Retire once the body tilts more than `max_tilt` radians
    FlippedOver { max_tilt: f32 },
    /// Retire once the centroid is more than `margin` meters behind the spawn line
    FallenBehind { margin: f32 },
}

impl EarlyTermination {
    pub fn is_active(&self) -> bool {
        !matches!(self, EarlyTermination::Never)
    }

    fn should_retire(&self, tilt: f32, displacement: f32) -> bool {
        match *self {
            EarlyTermination::Never => false,
            EarlyTermination::FlippedOver { max_tilt } => tilt.abs() > max_tilt,
            EarlyTermination::FallenBehind { margin } => displacement < -margin,
        }
    }
}

/// A spawned creature of species `S`
pub struct Creature<S: Species> {
    tag: CreatureTag,
    genome: S::Genome,
    body: S::Body,
    controller: S::Controller,
    spawn_x: f32,
    fitness: f32,
    alive: bool,
    last_center: Vec2,
    early_termination: EarlyTermination,
}

impl<S: Species> Creature<S> {
    /// Build `genome`'s body at `spawn` and a controller for it.
    ///
    /// Fails when the genome does not fit the body; nothing is left in the
    /// world in that case.
    pub fn spawn(
        genome: S::Genome,
        world: &mut PhysicsWorld,
        spawn: Vec2,
        tag: CreatureTag,
    ) -> Result<Self, ConstructionError> {
        let mut body = S::Body::build(&genome, world, spawn)?;

        let controller =
            match S::Controller::from_genome(&genome, body.actuators().len(), body.sensor_count()) {
                Ok(controller) => controller,
                Err(err) => {
                    world.despawn_group(body.group_mut());
                    return Err(err);
                }
            };

        log::debug!(
            "Spawned {} {} at ({:.2}, {:.2}) with {} actuators",
            S::NAME,
            tag,
            spawn.x,
            spawn.y,
            body.actuators().len()
        );

        Ok(Self {
            tag,
            genome,
            body,
            controller,
            spawn_x: spawn.x,
            fitness: 0.0,
            alive: true,
            last_center: spawn,
            early_termination: EarlyTermination::Never,
        })
    }

    /// Apply an early-termination policy to this creature
    pub fn with_early_termination(mut self, policy: EarlyTermination) -> Self {
        self.early_termination = policy;
        self
    }

    /// One sensorimotor step; call once after every physics step.
    ///
    /// Returns whether the creature is still alive.
    pub fn update(&mut self, world: &mut PhysicsWorld, tick: u64) -> bool {
        if !self.alive {
            return false;
        }

        let sensors = self.body.sense(world);
        let signals = self.controller.actuate(tick, &sensors);
        debug_assert_eq!(signals.len(), self.body.actuators().len());

        for (actuator, signal) in self.body.actuators().iter().zip(signals) {
            actuator.apply(world, signal);
        }

        let center = self.center_position(world);
        self.last_center = center;
        let displacement = center.x - self.spawn_x;
        self.fitness = self.fitness.max(displacement);

        let tilt = self.body.tilt(world);

        if self.early_termination.should_retire(tilt, displacement) {
            log::debug!(
                "{} retired early at tick {} (fitness {:.3})",
                self.tag,
                tick,
                self.fitness
            );
            self.remove(world);
        }

        self.alive
    }

    /// Release every physics handle and mark not alive. Idempotent.
    pub fn remove(&mut self, world: &mut PhysicsWorld) {
        if self.body.group().is_active() {
            self.last_center = self.center_position(world);
            world.despawn_group(self.body.group_mut());
        }
        self.alive = false;
    }

    /// Mean position of all owned bodies; the last known center once removed
    pub fn center_position(&self, world: &PhysicsWorld) -> Vec2 {
        let (sum, count) = self
            .body
            .group()
            .bodies()
            .iter()
            .filter_map(|&handle| world.body_state(handle))
            .fold((Vec2::ZERO, 0usize), |(sum, count), state| {
                (sum + state.position, count + 1)
            });

        if count == 0 {
            self.last_center
        } else {
            sum / count as f32
        }
    }

    /// Physics handles of every owned body, for drawing
    pub fn bodies(&self) -> &[rapier2d::prelude::RigidBodyHandle] {
        self.body.group().bodies()
    }

    /// Current part and spring geometry; `None` once removed
    pub fn render_data(&self, world: &PhysicsWorld) -> Option<CreatureRenderData> {
        let group = self.body.group();
        if !group.is_active() {
            return None;
        }

        let body_parts = group
            .bodies()
            .iter()
            .zip(group.shapes())
            .filter_map(|(&handle, &shape)| {
                world.body_state(handle).map(|state| BodyPartRenderData {
                    position: state.position,
                    angle: state.angle,
                    shape,
                })
            })
            .collect();

        let springs = group
            .springs()
            .iter()
            .zip(group.rest_lengths())
            .filter_map(|(&spring, &rest_length)| {
                let (start, end) = world.spring_endpoints(spring)?;
                let length = world.spring_length(spring)?;
                Some(SpringRenderData {
                    start,
                    end,
                    contraction: 1.0 - length / rest_length,
                })
            })
            .collect();

        Some(CreatureRenderData {
            body_parts,
            springs,
            fitness: self.fitness,
        })
    }

    pub fn tag(&self) -> CreatureTag {
        self.tag
    }

    pub fn genome(&self) -> &S::Genome {
        &self.genome
    }

    pub fn body(&self) -> &S::Body {
        &self.body
    }

    pub fn controller(&self) -> &S::Controller {
        &self.controller
    }

    /// Fitness anchor recorded at spawn
    pub fn spawn_x(&self) -> f32 {
        self.spawn_x
    }

    /// Furthest forward displacement of the centroid so far this trial
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

impl<S: Species> std::fmt::Debug for Creature<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creature")
            .field("species", &S::NAME)
            .field("tag", &self.tag)
            .field("fitness", &self.fitness)
            .field("alive", &self.alive)
            .finish()
    }
}
