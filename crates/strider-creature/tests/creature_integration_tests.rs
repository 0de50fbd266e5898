//! Integration tests for creature construction and simulation
//!
//! These tests verify that genomes, bodies, controllers and the physics
//! adapter work together across all three species.

use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use strider_creature::{
    ConstructionError, ControllerBrain, Creature, CreatureSettings, CreatureTag, Genome,
    LeggedWalker, NeuralCrawler, NeuralGenome, OscillatorGenome, PhysicsWorld, SoftBlob, Species,
};

fn rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

fn run_trial<S: Species>(genome: S::Genome, ticks: u64) -> Vec<f32> {
    let mut world = PhysicsWorld::new();
    let mut creature = Creature::<S>::spawn(genome, &mut world, Vec2::ZERO, CreatureTag::new())
        .expect("genome fits its species");

    let mut readings = Vec::with_capacity(ticks as usize);
    for tick in 0..ticks {
        world.step();
        creature.update(&mut world, tick);
        readings.push(creature.fitness());
    }
    creature.remove(&mut world);
    assert_eq!(world.body_count(), 0);
    readings
}

fn assert_non_decreasing(readings: &[f32]) {
    for pair in readings.windows(2) {
        assert!(pair[1] >= pair[0], "fitness regressed: {} -> {}", pair[0], pair[1]);
    }
    assert!(readings.iter().all(|f| f.is_finite() && *f >= 0.0));
}

// ============================================================================
// Construction failures
// ============================================================================

#[test]
fn test_short_muscle_array_is_construction_error() {
    let settings = CreatureSettings::default();
    let mut genome = OscillatorGenome::random(&LeggedWalker::topology(&settings), &mut rng(1));
    genome.muscles.pop();

    let mut world = PhysicsWorld::new();
    let result =
        Creature::<LeggedWalker>::spawn(genome, &mut world, Vec2::ZERO, CreatureTag::new());

    assert!(matches!(
        result,
        Err(ConstructionError::ActuatorMismatch {
            genes: 7,
            actuators: 8
        })
    ));
    assert_eq!(world.body_count(), 0, "failed spawn must not leak bodies");
}

#[test]
fn test_long_muscle_array_is_construction_error() {
    let settings = CreatureSettings::default();
    let mut genome = OscillatorGenome::random(&SoftBlob::topology(&settings), &mut rng(2));
    let extra = genome.muscles[0];
    genome.muscles.push(extra);

    let mut world = PhysicsWorld::new();
    let result = Creature::<SoftBlob>::spawn(genome, &mut world, Vec2::ZERO, CreatureTag::new());

    assert!(result.is_err());
    assert_eq!(world.spring_count(), 0);
}

#[test]
fn test_legged_genome_rejected_by_soft_body() {
    // Same genome type, different actuator count
    let settings = CreatureSettings::default();
    let genome = OscillatorGenome::random(&LeggedWalker::topology(&settings), &mut rng(3));

    let mut world = PhysicsWorld::new();
    let result = Creature::<SoftBlob>::spawn(genome, &mut world, Vec2::ZERO, CreatureTag::new());

    assert!(matches!(
        result,
        Err(ConstructionError::ActuatorMismatch {
            genes: 8,
            actuators: 17
        })
    ));
}

#[test]
fn test_neural_genome_for_wrong_chain_length() {
    let genome = NeuralGenome::random(
        &NeuralCrawler::topology(&CreatureSettings::default()),
        &mut rng(4),
    );
    let mismatched = NeuralGenome {
        segment_count: genome.segment_count + 1,
        ..genome
    };

    let mut world = PhysicsWorld::new();
    let result =
        Creature::<NeuralCrawler>::spawn(mismatched, &mut world, Vec2::ZERO, CreatureTag::new());

    assert!(result.is_err());
    assert_eq!(world.body_count(), 0);
    assert_eq!(world.hinge_count(), 0);
}

// ============================================================================
// Fitness over a trial
// ============================================================================

#[test]
fn test_fitness_monotonic_for_every_species() {
    let settings = CreatureSettings::default();

    let legged = OscillatorGenome::random(&LeggedWalker::topology(&settings), &mut rng(10));
    assert_non_decreasing(&run_trial::<LeggedWalker>(legged, 240));

    let soft = OscillatorGenome::random(&SoftBlob::topology(&settings), &mut rng(11));
    assert_non_decreasing(&run_trial::<SoftBlob>(soft, 240));

    let neural = NeuralGenome::random(&NeuralCrawler::topology(&settings), &mut rng(12));
    assert_non_decreasing(&run_trial::<NeuralCrawler>(neural, 240));
}

#[test]
fn test_creatures_share_world_without_interference() {
    let settings = CreatureSettings::default();
    let mut world = PhysicsWorld::new();
    let mut seed = rng(20);

    let mut creatures: Vec<Creature<LeggedWalker>> = (0..4)
        .map(|_| {
            let genome = OscillatorGenome::random(&LeggedWalker::topology(&settings), &mut seed);
            Creature::spawn(genome, &mut world, Vec2::ZERO, CreatureTag::new()).unwrap()
        })
        .collect();
    let per_creature = world.body_count() / 4;

    for tick in 0..60 {
        world.step();
        for creature in &mut creatures {
            creature.update(&mut world, tick);
        }
    }

    creatures[1].remove(&mut world);
    assert_eq!(world.body_count(), per_creature * 3);
    assert!(creatures[0].is_alive());
    assert!(creatures[0].render_data(&world).is_some());

    for creature in &mut creatures {
        creature.remove(&mut world);
    }
    assert_eq!(world.body_count(), 0);
}

// ============================================================================
// Brain
// ============================================================================

#[test]
fn test_zero_genomes_drive_nothing() {
    let topology = NeuralCrawler::topology(&CreatureSettings::default());
    for _ in 0..2 {
        let genome = NeuralGenome::zeroed(&topology);
        let brain = ControllerBrain::new(
            topology.input_count(),
            topology.hidden_count,
            topology.output_count(),
            Some(genome.weights.clone()),
        )
        .unwrap();

        let input: Vec<f32> = (0..topology.input_count()).map(|i| i as f32 - 2.5).collect();
        assert_eq!(brain.hidden_activations(&input), vec![0.0; topology.hidden_count]);
        assert_eq!(brain.predict(&input), vec![0.0; topology.output_count()]);
    }
}
