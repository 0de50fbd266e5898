//! Per-generation statistics and display summaries

use serde::{Deserialize, Serialize};

use super::phase::CyclePhase;
use super::population::RankedGenome;

/// Statistics of one finished trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation the trial belonged to
    pub generation: u64,
    /// Best fitness this generation
    pub best: f32,
    /// Average fitness this generation
    pub mean: f32,
    pub median: f32,
    /// Creatures still alive when the trial ended
    pub alive_at_end: usize,
    /// Ticks the trial actually ran
    pub ticks: u64,
    /// Best fitness seen in any generation so far
    pub best_ever: f32,
}

impl GenerationStats {
    /// Summarize a ranking sorted best first
    pub fn from_ranking<G>(
        generation: u64,
        ranking: &[RankedGenome<G>],
        alive_at_end: usize,
        ticks: u64,
        best_ever: f32,
    ) -> Self {
        let count = ranking.len();
        let best = ranking.first().map_or(0.0, |r| r.fitness);
        let mean = if count == 0 {
            0.0
        } else {
            ranking.iter().map(|r| r.fitness).sum::<f32>() / count as f32
        };
        let median = match count {
            0 => 0.0,
            n if n % 2 == 1 => ranking[n / 2].fitness,
            n => (ranking[n / 2 - 1].fitness + ranking[n / 2].fitness) / 2.0,
        };

        Self {
            generation,
            best,
            mean,
            median,
            alive_at_end,
            ticks,
            best_ever,
        }
    }
}

/// Snapshot of the cycle for an external display
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub generation: u64,
    pub trial_tick: u64,
    pub trial_duration: u64,
    pub phase: CyclePhase,
    /// `None` until the first trial has been evaluated
    pub best_ever_fitness: Option<f32>,
    /// Best fitness among the current population
    pub leader_fitness: f32,
    pub alive: usize,
    pub population: usize,
}

impl CycleSummary {
    /// Fraction of the current trial elapsed, in [0, 1]
    pub fn trial_progress(&self) -> f32 {
        if self.trial_duration == 0 {
            return 1.0;
        }
        (self.trial_tick as f32 / self.trial_duration as f32).min(1.0)
    }
}
