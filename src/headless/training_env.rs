//! Training environment for creature evolution
//!
//! Drives an [`EvolutionCycle`] headlessly, one physics step per tick, with a
//! progress bar and optional best-genome snapshots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use strider_creature::{PhysicsWorld, Species};

use crate::config::EvolutionConfig;
use crate::evolution::{EvolutionCycle, GenerationStats};

/// Configuration for the training run
#[derive(Debug, Clone, Default)]
pub struct TrainingConfig {
    /// Number of generations to run (0 = until interrupted)
    pub generations: u64,
    /// Hide the progress bar and per-generation lines
    pub quiet: bool,
    /// Where to write the best-ever genome (RON) whenever it improves
    pub save_best: Option<PathBuf>,
}

/// Headless training environment for one species
pub struct TrainingEnv<S: Species> {
    config: TrainingConfig,
    cycle: EvolutionCycle<S>,
    world: PhysicsWorld,
    /// Best-ever fitness already written to `save_best`
    saved_fitness: Option<f32>,
}

impl<S: Species> TrainingEnv<S>
where
    S::Genome: Serialize,
{
    /// Create a new training environment
    pub fn new(evolution: EvolutionConfig, config: TrainingConfig) -> Result<Self> {
        let cycle = EvolutionCycle::new(evolution).context("Failed to create evolution cycle")?;

        Ok(Self {
            config,
            cycle,
            world: PhysicsWorld::new(),
            saved_fitness: None,
        })
    }

    /// Create a progress bar style
    fn progress_style() -> Result<ProgressStyle> {
        Ok(ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("█▓░"))
    }

    fn progress_bar(&self) -> Result<ProgressBar> {
        if self.config.quiet {
            return Ok(ProgressBar::hidden());
        }

        let pb = if self.config.generations == 0 {
            ProgressBar::new_spinner()
        } else {
            let total_ticks = self.config.generations * self.cycle.config().trial_duration;
            let pb = ProgressBar::new(total_ticks);
            pb.set_style(Self::progress_style()?);
            pb
        };
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Ok(pb)
    }

    /// Run the configured number of generations
    pub fn run(&mut self) -> Result<Vec<GenerationStats>> {
        let pb = self.progress_bar()?;
        let trial_duration = self.cycle.config().trial_duration;

        pb.println(format!(
            "Starting training: {} creatures of {}, {} ticks per trial",
            self.cycle.config().population_size,
            S::NAME,
            trial_duration
        ));

        let mut finished: Vec<GenerationStats> = Vec::new();
        while self.config.generations == 0 || (finished.len() as u64) < self.config.generations {
            let Some(stats) = self
                .cycle
                .tick(&mut self.world)
                .context("Evolution cycle failed")?
            else {
                pb.inc(1);
                if self.config.generations == 0 && self.cycle.trial_tick() % 60 == 0 {
                    let summary = self.cycle.summary();
                    pb.set_message(format!(
                        "gen {} {:.0}% leader {:.2}",
                        summary.generation,
                        summary.trial_progress() * 100.0,
                        summary.leader_fitness
                    ));
                }
                continue;
            };

            pb.println(format!(
                "Gen {}: best={:.2}, mean={:.2}, median={:.2}, alive={}, best_ever={:.2}",
                stats.generation,
                stats.best,
                stats.mean,
                stats.median,
                stats.alive_at_end,
                stats.best_ever
            ));
            pb.set_message(format!("best {:.2}", stats.best_ever));

            self.save_best(&pb)?;
            finished.push(stats);

            if self.config.generations > 0 {
                // Trials that end early still count as a full generation's worth
                pb.set_position(finished.len() as u64 * trial_duration);
            } else {
                pb.inc(1);
            }
        }

        pb.finish_with_message("Training complete!");
        Ok(finished)
    }

    /// Write the best-ever genome if it improved since the last write
    fn save_best(&mut self, pb: &ProgressBar) -> Result<()> {
        let Some(path) = &self.config.save_best else {
            return Ok(());
        };
        let (Some(fitness), Some(genome)) =
            (self.cycle.best_ever_fitness(), self.cycle.best_ever_genome())
        else {
            return Ok(());
        };
        if self.saved_fitness.is_some_and(|saved| saved >= fitness) {
            return Ok(());
        }

        let data = ron::ser::to_string_pretty(genome, ron::ser::PrettyConfig::default())
            .context("Failed to serialize genome")?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write genome file {}", path.display()))?;
        self.saved_fitness = Some(fitness);

        pb.println(format!(
            "Saved best genome (fitness {:.2}) to {}",
            fitness,
            path.display()
        ));
        Ok(())
    }

    pub fn cycle(&self) -> &EvolutionCycle<S> {
        &self.cycle
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }
}
