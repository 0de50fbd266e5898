//! Capability traits for evolvable creatures
//!
//! A creature is assembled from three orthogonal parts:
//! - a [`Genome`] carrying the heritable parameters,
//! - a [`Body`] that turns a genome into physics handles and actuation channels,
//! - a [`Controller`] that maps sensed state to one signal per actuation channel.
//!
//! Population and evolution code is written once against these traits.

use std::fmt::Debug;

use glam::Vec2;
use rand::Rng;

use crate::error::{ConstructionError, GenomeError};
use crate::morphology::Actuator;
use crate::physics::{BodyGroup, PhysicsWorld};
use crate::sensors::{normalize_angle, SensorFrame};

/// Heritable parameter set. Operations never modify `self`.
pub trait Genome: Clone + PartialEq + Debug {
    /// Shape constraints a freshly drawn genome must satisfy
    type Topology: Clone + Debug;

    /// Draw every field from its documented range.
    fn random<R: Rng + ?Sized>(topology: &Self::Topology, rng: &mut R) -> Self;

    /// Discrete recombination: every gene comes verbatim from `a` or `b`.
    fn crossover<R: Rng + ?Sized>(a: &Self, b: &Self, rng: &mut R) -> Result<Self, GenomeError>;

    /// Return a perturbed copy; each gene mutates independently with probability `rate`.
    fn mutate<R: Rng + ?Sized>(&self, rate: f32, rng: &mut R) -> Self;
}

/// Physical embodiment built from a genome.
pub trait Body: Sized {
    type Genome: Genome;

    /// Build the structure at `origin` and register it with the world as one unit.
    ///
    /// On error nothing built by this call may remain in the world.
    fn build(
        genome: &Self::Genome,
        world: &mut PhysicsWorld,
        origin: Vec2,
    ) -> Result<Self, ConstructionError>;

    /// Physics handles owned by this body
    fn group(&self) -> &BodyGroup;

    /// Mutable access for despawning
    fn group_mut(&mut self) -> &mut BodyGroup;

    /// Actuation channels, in the order controller outputs are applied
    fn actuators(&self) -> &[Actuator];

    /// Length of the sensor vector produced by [`Body::sense`]
    fn sensor_count(&self) -> usize {
        SensorFrame::dim(self.group().hinge_count())
    }

    /// Read the body's current state from the world.
    fn sense(&self, world: &PhysicsWorld) -> SensorFrame {
        SensorFrame::gather(self.group(), world)
    }

    /// Orientation of the whole body in `(-π, π]`; 0 is upright.
    ///
    /// Defaults to the angle of the first part.
    fn tilt(&self, world: &PhysicsWorld) -> f32 {
        self.group()
            .bodies()
            .first()
            .and_then(|&handle| world.body_state(handle))
            .map_or(0.0, |state| normalize_angle(state.angle))
    }
}

/// Maps sensed state to actuation signals. Implementations hold no per-tick state.
pub trait Controller: Sized {
    type Genome: Genome;

    /// Build a controller for a body with the given channel counts.
    ///
    /// Must fail when the genome's actuator genes disagree with `actuators`.
    fn from_genome(
        genome: &Self::Genome,
        actuators: usize,
        sensors: usize,
    ) -> Result<Self, ConstructionError>;

    /// One signal per actuator for simulation tick `tick`.
    fn actuate(&self, tick: u64, sensors: &SensorFrame) -> Vec<f32>;
}
