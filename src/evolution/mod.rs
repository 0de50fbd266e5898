//! Generational evolution over a population of creatures
//!
//! - [`EvolutionCycle`] drives trials and breeds the next generation
//! - [`Population`] owns one generation's creatures
//! - [`ParentSelector`] draws parents from the top of a ranking

mod cycle;
mod phase;
mod population;
mod selection;
mod stats;

pub use cycle::EvolutionCycle;
pub use phase::{CycleInput, CyclePhase, CycleState};
pub use population::{Population, RankedGenome};
pub use selection::ParentSelector;
pub use stats::{CycleSummary, GenerationStats};
