//! # Strider - evolutionary locomotion
//!
//! Populations of simulated creatures learn to walk: each generation runs a
//! fixed-length physics trial, is ranked by distance travelled, and breeds the
//! next generation through elitism, crossover and mutation.

pub mod config;
pub mod error;
pub mod evolution;
pub mod headless;

pub use config::EvolutionConfig;
pub use error::EvolutionError;
pub use evolution::{CyclePhase, CycleSummary, EvolutionCycle, GenerationStats, Population};

/// Creature building blocks
pub use strider_creature as creature;

/// Common imports for internal use
pub mod prelude {
    pub use crate::config::EvolutionConfig;
    pub use crate::evolution::EvolutionCycle;
    pub use glam::Vec2;
    pub use strider_creature::{LeggedWalker, NeuralCrawler, PhysicsWorld, SoftBlob, Species};
}
