//! Evolution cycle state machine.
//!
//! The cycle has no terminal state:
//! Spawning → Running → Evaluating → Evolving → Spawning → …

use serde::{Deserialize, Serialize};

/// Phase of the generational loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CyclePhase {
    /// A genome list is ready to be embodied
    #[default]
    Spawning,
    /// The trial is being simulated
    Running,
    /// The finished trial is being ranked
    Evaluating,
    /// The next genome list is being bred
    Evolving,
}

/// Input events for phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleInput {
    /// Every creature of the population was spawned
    Spawned,
    /// Trial duration reached, or every creature retired early
    TrialEnded,
    /// Ranking and best-ever bookkeeping done
    Ranked,
    /// Next generation's genomes are ready
    Bred,
}

/// Transition table for the cycle.
/// Returns Some(new_phase) if transition is valid, None if invalid.
fn transition(current: CyclePhase, input: CycleInput) -> Option<CyclePhase> {
    use CycleInput::*;
    use CyclePhase::*;

    match (current, input) {
        (Spawning, Spawned) => Some(Running),
        (Running, TrialEnded) => Some(Evaluating),
        (Evaluating, Ranked) => Some(Evolving),
        (Evolving, Bred) => Some(Spawning),

        // All other transitions are invalid
        _ => None,
    }
}

/// Current phase plus a count of transitions taken
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    phase: CyclePhase,
    /// Transitions taken since creation
    transitions: u64,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> CyclePhase {
        self.phase
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Attempt a phase transition.
    ///
    /// Returns `true` if the transition was valid and occurred,
    /// `false` if the transition was invalid from the current phase.
    pub fn transition(&mut self, input: CycleInput) -> bool {
        if let Some(next) = transition(self.phase, input) {
            log::trace!("Cycle: {:?} + {:?} -> {:?}", self.phase, input, next);
            self.phase = next;
            self.transitions += 1;
            true
        } else {
            log::trace!(
                "Invalid transition: {:?} + {:?} -> rejected",
                self.phase,
                input
            );
            false
        }
    }
}
