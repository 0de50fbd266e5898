//! The generational loop: spawn, simulate, rank, breed, respawn

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use strider_creature::{Genome, PhysicsWorld, Species};

use crate::config::EvolutionConfig;
use crate::error::EvolutionError;

use super::phase::{CycleInput, CyclePhase, CycleState};
use super::population::{Population, RankedGenome};
use super::selection::ParentSelector;
use super::stats::{CycleSummary, GenerationStats};

/// Drives trials and generations of species `S` forever.
///
/// Call [`EvolutionCycle::tick`] once per frame; each call steps the physics
/// world exactly once.
pub struct EvolutionCycle<S: Species> {
    config: EvolutionConfig,
    state: CycleState,
    topology: <S::Genome as Genome>::Topology,
    selector: ParentSelector,
    rng: Xoshiro256PlusPlus,

    population: Option<Population<S>>,
    /// Genomes for the next spawn; random when absent
    pending: Option<Vec<S::Genome>>,

    generation: u64,
    trial_tick: u64,
    best_ever: Option<RankedGenome<S::Genome>>,
    last_ranking: Vec<RankedGenome<S::Genome>>,
    history: Vec<GenerationStats>,
}

impl<S: Species> EvolutionCycle<S> {
    /// Start at generation 1 with a random population
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionError> {
        config.validate()?;

        let selector = ParentSelector::new(&config.selection, config.parent_pool)?;
        let rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_rng(&mut rand::rng()),
        };
        let topology = S::topology(&config.creature);

        log::info!(
            "Evolution cycle: {} creatures of {}, {} ticks per trial, K={}, M={}, mutation rate {}",
            config.population_size,
            S::NAME,
            config.trial_duration,
            config.elite_count,
            config.parent_pool,
            config.mutation_rate
        );

        Ok(Self {
            config,
            state: CycleState::new(),
            topology,
            selector,
            rng,
            population: None,
            pending: None,
            generation: 1,
            trial_tick: 0,
            best_ever: None,
            last_ranking: Vec::new(),
            history: Vec::new(),
        })
    }

    /// Start at generation 1 with the given genomes instead of random ones
    pub fn with_genomes(
        config: EvolutionConfig,
        genomes: Vec<S::Genome>,
    ) -> Result<Self, EvolutionError> {
        if genomes.len() != config.population_size {
            return Err(EvolutionError::PopulationSize {
                expected: config.population_size,
                actual: genomes.len(),
            });
        }
        let mut cycle = Self::new(config)?;
        cycle.pending = Some(genomes);
        Ok(cycle)
    }

    /// Advance the simulation by one physics step.
    ///
    /// Returns the finished trial's statistics on the tick that ends it; the
    /// next generation is already spawned when this returns.
    ///
    /// If breeding or spawning fails, the error is returned and the cycle
    /// stays in that phase. The next call retries it before stepping the
    /// world; the world is not stepped while it keeps failing.
    pub fn tick(
        &mut self,
        world: &mut PhysicsWorld,
    ) -> Result<Option<GenerationStats>, EvolutionError> {
        match self.state.current() {
            CyclePhase::Evolving => self.breed_and_spawn(world)?,
            CyclePhase::Spawning => self.spawn(world)?,
            CyclePhase::Running | CyclePhase::Evaluating => {}
        }

        world.step();
        let alive = match self.population.as_mut() {
            Some(population) => population.update(world, self.trial_tick),
            None => 0,
        };
        self.trial_tick += 1;

        let policy = self.config.early_termination.early_termination();
        let everyone_retired = policy.is_active() && alive == 0;
        if self.trial_tick < self.config.trial_duration && !everyone_retired {
            return Ok(None);
        }
        if everyone_retired && self.trial_tick < self.config.trial_duration {
            log::warn!(
                "Generation {}: every creature retired after {} of {} ticks",
                self.generation,
                self.trial_tick,
                self.config.trial_duration
            );
        }

        self.advance(CycleInput::TrialEnded)?;
        let stats = self.evaluate();
        self.advance(CycleInput::Ranked)?;
        self.breed_and_spawn(world)?;

        Ok(Some(stats))
    }

    fn breed_and_spawn(&mut self, world: &mut PhysicsWorld) -> Result<(), EvolutionError> {
        self.evolve()?;
        self.advance(CycleInput::Bred)?;
        self.spawn(world)
    }

    /// Tick until the current trial ends
    pub fn run_generation(
        &mut self,
        world: &mut PhysicsWorld,
    ) -> Result<GenerationStats, EvolutionError> {
        loop {
            if let Some(stats) = self.tick(world)? {
                return Ok(stats);
            }
        }
    }

    fn advance(&mut self, input: CycleInput) -> Result<(), EvolutionError> {
        if self.state.transition(input) {
            Ok(())
        } else {
            Err(EvolutionError::InvalidTransition {
                phase: self.state.current(),
                input,
            })
        }
    }

    /// Spawning: replace the population and restart the trial clock.
    ///
    /// Pending genomes are kept until they spawn, so a failed attempt is
    /// retried with the same list.
    fn spawn(&mut self, world: &mut PhysicsWorld) -> Result<(), EvolutionError> {
        if let Some(mut previous) = self.population.take() {
            previous.despawn(world);
        }

        let genomes = match &self.pending {
            Some(genomes) => genomes.clone(),
            None => (0..self.config.population_size)
                .map(|_| S::Genome::random(&self.topology, &mut self.rng))
                .collect(),
        };

        let population = Population::spawn(
            genomes,
            world,
            self.config.spawn_point(),
            self.generation,
            self.config.early_termination.early_termination(),
        )?;
        self.pending = None;
        self.population = Some(population);
        self.trial_tick = 0;

        self.advance(CycleInput::Spawned)
    }

    /// Evaluating: rank the trial and update the best-ever record
    fn evaluate(&mut self) -> GenerationStats {
        let (ranking, alive_at_end) = match &self.population {
            Some(population) => (population.ranking(), population.alive_count()),
            None => (Vec::new(), 0),
        };

        if let Some(top) = ranking.first() {
            let improved = self
                .best_ever
                .as_ref()
                .map_or(true, |best| top.fitness > best.fitness);
            if improved {
                log::info!(
                    "Generation {}: new best fitness {:.3}",
                    self.generation,
                    top.fitness
                );
                self.best_ever = Some(top.clone());
            }
        }

        let stats = GenerationStats::from_ranking(
            self.generation,
            &ranking,
            alive_at_end,
            self.trial_tick,
            self.best_ever_fitness().unwrap_or(0.0),
        );
        log::info!(
            "Gen {}: best={:.3}, mean={:.3}, median={:.3}, alive={}, best_ever={:.3}",
            stats.generation,
            stats.best,
            stats.mean,
            stats.median,
            stats.alive_at_end,
            stats.best_ever
        );

        self.history.push(stats.clone());
        self.last_ranking = ranking;
        stats
    }

    /// Evolving: elites verbatim, then mutated children of pool parents
    fn evolve(&mut self) -> Result<(), EvolutionError> {
        let size = self.config.population_size;
        let mut next = Vec::with_capacity(size);

        next.extend(
            self.last_ranking
                .iter()
                .take(self.config.elite_count.min(size))
                .map(|ranked| ranked.genome.clone()),
        );

        while next.len() < size {
            let parents = (
                self.selector.select(&self.last_ranking, &mut self.rng),
                self.selector.select(&self.last_ranking, &mut self.rng),
            );
            let child = match parents {
                (Some(a), Some(b)) => S::Genome::crossover(a, b, &mut self.rng)?
                    .mutate(self.config.mutation_rate, &mut self.rng),
                _ => S::Genome::random(&self.topology, &mut self.rng),
            };
            next.push(child);
        }

        self.generation += 1;
        self.trial_tick = 0;
        self.pending = Some(next);
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trial_tick(&self) -> u64 {
        self.trial_tick
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.current()
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Current population; `None` before the first tick
    pub fn population(&self) -> Option<&Population<S>> {
        self.population.as_ref()
    }

    pub fn best_ever_fitness(&self) -> Option<f32> {
        self.best_ever.as_ref().map(|best| best.fitness)
    }

    pub fn best_ever_genome(&self) -> Option<&S::Genome> {
        self.best_ever.as_ref().map(|best| &best.genome)
    }

    /// Ranking of the most recently finished trial, best first
    pub fn last_ranking(&self) -> &[RankedGenome<S::Genome>] {
        &self.last_ranking
    }

    /// Statistics of every finished trial, oldest first
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Read-only snapshot for a display
    pub fn summary(&self) -> CycleSummary {
        let (leader_fitness, alive, population) = match &self.population {
            Some(population) => (
                population.leader().map_or(0.0, |leader| leader.fitness()),
                population.alive_count(),
                population.len(),
            ),
            None => (0.0, 0, 0),
        };

        CycleSummary {
            generation: self.generation,
            trial_tick: self.trial_tick,
            trial_duration: self.config.trial_duration,
            phase: self.state.current(),
            best_ever_fitness: self.best_ever_fitness(),
            leader_fitness,
            alive,
            population,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_creature::{
        CreatureSettings, LeggedWalker, NeuralCrawler, NeuralGenome, OscillatorGenome,
    };

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 4,
            trial_duration: 30,
            elite_count: 1,
            parent_pool: 3,
            seed: Some(17),
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_in_spawning() {
        let cycle = EvolutionCycle::<LeggedWalker>::new(small_config()).unwrap();

        assert_eq!(cycle.phase(), CyclePhase::Spawning);
        assert_eq!(cycle.generation(), 1);
        assert!(cycle.population().is_none());
        assert_eq!(cycle.best_ever_fitness(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EvolutionConfig {
            parent_pool: 1,
            elite_count: 1,
            ..small_config()
        };
        assert!(matches!(
            EvolutionCycle::<LeggedWalker>::new(config),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_with_genomes_checks_size() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let topology = LeggedWalker::topology(&CreatureSettings::default());
        let genomes: Vec<_> = (0..3)
            .map(|_| OscillatorGenome::random(&topology, &mut rng))
            .collect();

        assert!(matches!(
            EvolutionCycle::<LeggedWalker>::with_genomes(small_config(), genomes),
            Err(EvolutionError::PopulationSize {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_seeded_genomes_are_spawned_in_order() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let topology = LeggedWalker::topology(&CreatureSettings::default());
        let genomes: Vec<_> = (0..4)
            .map(|_| OscillatorGenome::random(&topology, &mut rng))
            .collect();

        let mut world = PhysicsWorld::new();
        let mut cycle =
            EvolutionCycle::<LeggedWalker>::with_genomes(small_config(), genomes.clone()).unwrap();
        cycle.tick(&mut world).unwrap();

        let population = cycle.population().unwrap();
        for (creature, genome) in population.creatures().iter().zip(&genomes) {
            assert_eq!(creature.genome(), genome);
        }
    }

    #[test]
    fn test_failed_spawn_keeps_seeded_genomes() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let topology = LeggedWalker::topology(&CreatureSettings::default());
        let mut genomes: Vec<_> = (0..4)
            .map(|_| OscillatorGenome::random(&topology, &mut rng))
            .collect();
        genomes[3].muscles.truncate(5);

        let mut world = PhysicsWorld::new();
        let mut cycle =
            EvolutionCycle::<LeggedWalker>::with_genomes(small_config(), genomes).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                cycle.tick(&mut world),
                Err(EvolutionError::Construction(_))
            ));
            assert_eq!(cycle.phase(), CyclePhase::Spawning);
            assert!(cycle.population().is_none());
            assert_eq!(world.body_count(), 0);
        }
    }

    #[test]
    fn test_breeding_failure_is_retried() {
        let settings = |segment_count| CreatureSettings {
            segment_count,
            hidden_count: 4,
        };

        let mut failures = 0;
        for seed in 0..20 {
            let config = EvolutionConfig {
                population_size: 2,
                trial_duration: 3,
                elite_count: 1,
                parent_pool: 2,
                seed: Some(seed),
                creature: settings(3),
                ..Default::default()
            };
            // Chains of different length cannot be crossed
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let genomes = vec![
                NeuralGenome::random(&NeuralCrawler::topology(&settings(3)), &mut rng),
                NeuralGenome::random(&NeuralCrawler::topology(&settings(4)), &mut rng),
            ];

            let mut world = PhysicsWorld::new();
            let mut cycle = EvolutionCycle::<NeuralCrawler>::with_genomes(config, genomes).unwrap();
            for _ in 0..2 {
                assert!(cycle.tick(&mut world).unwrap().is_none());
            }

            let mut attempts = 0;
            while let Err(err) = cycle.tick(&mut world) {
                assert!(matches!(err, EvolutionError::Genome(_)), "{err:?}");
                assert_eq!(cycle.phase(), CyclePhase::Evolving);
                assert_eq!(cycle.generation(), 1);
                failures += 1;
                attempts += 1;
                assert!(attempts < 60, "seed {seed}: breeding never succeeded");
            }

            assert_eq!(cycle.generation(), 2);
            assert_eq!(cycle.phase(), CyclePhase::Running);
            assert_eq!(cycle.population().map(|p| p.len()), Some(2));
        }
        assert!(failures > 0);
    }

    #[test]
    fn test_generation_advances_on_last_tick() {
        let mut world = PhysicsWorld::new();
        let mut cycle = EvolutionCycle::<LeggedWalker>::new(small_config()).unwrap();

        for tick in 1..30 {
            assert!(cycle.tick(&mut world).unwrap().is_none());
            assert_eq!(cycle.trial_tick(), tick);
            assert_eq!(cycle.phase(), CyclePhase::Running);
        }

        let stats = cycle.tick(&mut world).unwrap().expect("trial ends on tick 30");
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.ticks, 30);
        assert_eq!(cycle.generation(), 2);
        assert_eq!(cycle.trial_tick(), 0);
        assert_eq!(cycle.phase(), CyclePhase::Running);
        assert_eq!(cycle.population().map(|p| p.len()), Some(4));
        assert_eq!(cycle.population().map(|p| p.generation()), Some(2));
        assert_eq!(cycle.history().len(), 1);
        assert_eq!(cycle.best_ever_fitness(), Some(stats.best));
    }

    #[test]
    fn test_best_ever_never_decreases() {
        let mut world = PhysicsWorld::new();
        let mut cycle = EvolutionCycle::<LeggedWalker>::new(small_config()).unwrap();

        let mut best = f32::NEG_INFINITY;
        for _ in 0..3 {
            let stats = cycle.run_generation(&mut world).unwrap();
            let best_ever = cycle.best_ever_fitness().unwrap();
            assert!(best_ever >= best);
            assert!(best_ever >= stats.best);
            assert_eq!(stats.best_ever, best_ever);
            best = best_ever;
        }
        assert_eq!(cycle.generation(), 4);
    }

    #[test]
    fn test_neural_cycle_runs() {
        let config = EvolutionConfig {
            creature: CreatureSettings {
                segment_count: 3,
                hidden_count: 4,
            },
            ..small_config()
        };
        let mut world = PhysicsWorld::new();
        let mut cycle = EvolutionCycle::<NeuralCrawler>::new(config).unwrap();

        let stats = cycle.run_generation(&mut world).unwrap();
        assert_eq!(stats.generation, 1);
        assert_eq!(cycle.last_ranking().len(), 4);
        assert_eq!(cycle.population().map(|p| p.len()), Some(4));

        // Old generation's bodies are gone, only the new one remains
        let per_creature = 3;
        assert_eq!(world.body_count(), 4 * per_creature);
    }

    #[test]
    fn test_summary() {
        let mut world = PhysicsWorld::new();
        let mut cycle = EvolutionCycle::<LeggedWalker>::new(small_config()).unwrap();
        for _ in 0..10 {
            cycle.tick(&mut world).unwrap();
        }

        let summary = cycle.summary();
        assert_eq!(summary.generation, 1);
        assert_eq!(summary.trial_tick, 10);
        assert_eq!(summary.trial_duration, 30);
        assert_eq!(summary.population, 4);
        assert_eq!(summary.alive, 4);
        assert_eq!(summary.phase, CyclePhase::Running);
        assert!(summary.leader_fitness >= 0.0);
    }
}
