//! Fixed-size population of creatures sharing one generation

use glam::Vec2;
use strider_creature::{
    ConstructionError, Creature, CreatureTag, EarlyTermination, PhysicsWorld, Species,
};

/// A genome paired with the fitness it reached in a trial
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGenome<G> {
    pub genome: G,
    pub fitness: f32,
}

/// Ordered creatures of one generation
pub struct Population<S: Species> {
    creatures: Vec<Creature<S>>,
    generation: u64,
}

impl<S: Species> Population<S> {
    /// Embody every genome at `spawn`, in order.
    ///
    /// If any genome fails to build, creatures already spawned by this call
    /// are removed before the error is returned.
    pub fn spawn(
        genomes: Vec<S::Genome>,
        world: &mut PhysicsWorld,
        spawn: Vec2,
        generation: u64,
        early_termination: EarlyTermination,
    ) -> Result<Self, ConstructionError> {
        let mut creatures = Vec::with_capacity(genomes.len());

        for genome in genomes {
            match Creature::<S>::spawn(genome, world, spawn, CreatureTag::new()) {
                Ok(creature) => creatures.push(creature.with_early_termination(early_termination)),
                Err(err) => {
                    for creature in &mut creatures {
                        creature.remove(world);
                    }
                    return Err(err);
                }
            }
        }

        log::debug!(
            "Spawned generation {} with {} {} creatures",
            generation,
            creatures.len(),
            S::NAME
        );

        Ok(Self {
            creatures,
            generation,
        })
    }

    /// Update every alive creature once; returns how many remain alive
    pub fn update(&mut self, world: &mut PhysicsWorld, tick: u64) -> usize {
        let mut alive = 0;
        for creature in &mut self.creatures {
            if creature.update(world, tick) {
                alive += 1;
            }
        }
        alive
    }

    /// Genomes and fitness of every creature, best first
    pub fn ranking(&self) -> Vec<RankedGenome<S::Genome>> {
        let mut ranking: Vec<_> = self
            .creatures
            .iter()
            .map(|creature| RankedGenome {
                genome: creature.genome().clone(),
                fitness: creature.fitness(),
            })
            .collect();
        ranking.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        ranking
    }

    /// Release every creature's physics handles
    pub fn despawn(&mut self, world: &mut PhysicsWorld) {
        for creature in &mut self.creatures {
            creature.remove(world);
        }
        log::debug!("Despawned generation {}", self.generation);
    }

    /// Creature with the highest fitness so far
    pub fn leader(&self) -> Option<&Creature<S>> {
        self.creatures
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    pub fn alive_count(&self) -> usize {
        self.creatures.iter().filter(|c| c.is_alive()).count()
    }

    pub fn creatures(&self) -> &[Creature<S>] {
        &self.creatures
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use strider_creature::{CreatureSettings, Genome, LeggedWalker, OscillatorGenome};

    fn genomes(count: usize, seed: u64) -> Vec<OscillatorGenome> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let topology = LeggedWalker::topology(&CreatureSettings::default());
        (0..count)
            .map(|_| OscillatorGenome::random(&topology, &mut rng))
            .collect()
    }

    #[test]
    fn test_spawn_preserves_order_and_size() {
        let genomes = genomes(5, 1);
        let mut world = PhysicsWorld::new();
        let population = Population::<LeggedWalker>::spawn(
            genomes.clone(),
            &mut world,
            Vec2::ZERO,
            1,
            EarlyTermination::Never,
        )
        .unwrap();

        assert_eq!(population.len(), 5);
        assert_eq!(population.generation(), 1);
        assert_eq!(population.alive_count(), 5);
        for (creature, genome) in population.creatures().iter().zip(&genomes) {
            assert_eq!(creature.genome(), genome);
        }
    }

    #[test]
    fn test_failed_spawn_cleans_up() {
        let mut genomes = genomes(4, 2);
        genomes[3].muscles.truncate(2);

        let mut world = PhysicsWorld::new();
        let result = Population::<LeggedWalker>::spawn(
            genomes,
            &mut world,
            Vec2::ZERO,
            1,
            EarlyTermination::Never,
        );

        assert!(result.is_err());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.spring_count(), 0);
    }

    #[test]
    fn test_ranking_sorted_descending() {
        let mut world = PhysicsWorld::new();
        let mut population = Population::<LeggedWalker>::spawn(
            genomes(6, 3),
            &mut world,
            Vec2::ZERO,
            1,
            EarlyTermination::Never,
        )
        .unwrap();

        for tick in 0..120 {
            world.step();
            population.update(&mut world, tick);
        }

        let ranking = population.ranking();
        assert_eq!(ranking.len(), 6);
        for pair in ranking.windows(2) {
            assert!(pair[0].fitness >= pair[1].fitness);
        }
        assert_eq!(
            population.leader().map(|c| c.fitness()),
            Some(ranking[0].fitness)
        );

        population.despawn(&mut world);
        assert_eq!(population.alive_count(), 0);
        assert_eq!(world.body_count(), 0);
        // Ranking survives despawning
        assert_eq!(population.ranking().len(), 6);
    }
}
