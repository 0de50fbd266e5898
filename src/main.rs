use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use strider::config::EvolutionConfig;
use strider::creature::{LeggedWalker, NeuralCrawler, SoftBlob, Species};
use strider::headless::{TrainingConfig, TrainingEnv};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SpeciesArg {
    /// Four-legged oscillator walker
    Legged,
    /// Spring-lattice blob
    Soft,
    /// Neural-controlled segment chain
    Neural,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Creature species to evolve
    #[arg(long, value_enum, default_value_t = SpeciesArg::Legged)]
    species: SpeciesArg,

    /// Generations to run (0 = until interrupted)
    #[arg(long, default_value_t = 10)]
    generations: u64,

    /// Creatures per generation
    #[arg(long)]
    population: Option<usize>,

    /// Physics steps per trial
    #[arg(long)]
    trial_ticks: Option<u64>,

    /// Per-gene mutation probability
    #[arg(long)]
    mutation_rate: Option<f32>,

    /// Seed for genome operations
    #[arg(long)]
    seed: Option<u64>,

    /// RON configuration file (default: optional strider.ron)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Write the best-ever genome to this file as RON
    #[arg(long)]
    save_best: Option<PathBuf>,

    /// No progress bar
    #[arg(long, short)]
    quiet: bool,
}

impl Args {
    fn apply(&self, config: &mut EvolutionConfig) {
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(ticks) = self.trial_ticks {
            config.trial_duration = ticks;
        }
        if let Some(rate) = self.mutation_rate {
            config.mutation_rate = rate;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EvolutionConfig::load_file(path)?,
        None => EvolutionConfig::load()?,
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if args.dump_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    let training = TrainingConfig {
        generations: args.generations,
        quiet: args.quiet,
        save_best: args.save_best.clone(),
    };

    match args.species {
        SpeciesArg::Legged => train::<LeggedWalker>(config, training),
        SpeciesArg::Soft => train::<SoftBlob>(config, training),
        SpeciesArg::Neural => train::<NeuralCrawler>(config, training),
    }
}

fn train<S: Species>(config: EvolutionConfig, training: TrainingConfig) -> anyhow::Result<()>
where
    S::Genome: Serialize,
{
    log::info!("Starting Strider ({})", S::NAME);

    let mut env = TrainingEnv::<S>::new(config, training)?;
    let history = env.run()?;

    if let Some(best) = env.cycle().best_ever_fitness() {
        println!(
            "Best fitness after {} generations: {:.3}",
            history.len(),
            best
        );
    }
    Ok(())
}
