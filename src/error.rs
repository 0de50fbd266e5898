//! Error type of the evolution cycle

use strider_creature::{ConstructionError, GenomeError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::evolution::{CycleInput, CyclePhase};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvolutionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn creature: {0}")]
    Construction(#[from] ConstructionError),

    #[error("failed to breed genomes: {0}")]
    Genome(#[from] GenomeError),

    #[error("expected {expected} genomes to seed the population, got {actual}")]
    PopulationSize { expected: usize, actual: usize },

    #[error("parent pool is empty")]
    EmptyParentPool,

    #[error("cycle cannot take {input:?} while {phase:?}")]
    InvalidTransition { phase: CyclePhase, input: CycleInput },
}
