//! Evolvable locomotion creatures for Strider
//!
//! This crate implements:
//! - Oscillator and neural genomes with discrete crossover and bounded mutation
//! - A stateless feed-forward controller brain
//! - A rapier2d physics adapter with settable-length springs and grouped spawning
//! - Legged, soft-bodied and segmented creatures sharing one generic `Creature`

use glam::Vec2;

pub mod controller;
pub mod creature;
pub mod error;
pub mod genome;
pub mod morphology;
pub mod neural;
pub mod physics;
pub mod sensors;
pub mod species;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use controller::{NeuralController, OscillatorController};
pub use creature::{Creature, EarlyTermination};
pub use error::{ConstructionError, GenomeError};
pub use genome::{BrainWeights, MuscleGene, NeuralGenome, OscillatorGenome};
pub use morphology::{Actuator, LeggedBody, SegmentChain, SoftBody};
pub use neural::ControllerBrain;
pub use physics::{Blueprint, BodyGroup, PartShape, PhysicsWorld};
pub use sensors::SensorFrame;
pub use species::{CreatureSettings, LeggedWalker, NeuralCrawler, SoftBlob, Species};
pub use traits::{Body, Controller, Genome};
pub use types::CreatureTag;

/// Render data for a single body part
#[derive(Debug, Clone)]
pub struct BodyPartRenderData {
    pub position: Vec2,
    pub angle: f32,
    pub shape: PartShape,
}

/// Render data for a single spring
#[derive(Debug, Clone)]
pub struct SpringRenderData {
    pub start: Vec2,
    pub end: Vec2,
    /// How far the active length is below rest length, as a fraction (negative when stretched)
    pub contraction: f32,
}

/// Render data for an entire creature
#[derive(Debug, Clone)]
pub struct CreatureRenderData {
    pub body_parts: Vec<BodyPartRenderData>,
    pub springs: Vec<SpringRenderData>,
    pub fitness: f32,
}
