//! Controllers mapping sensed state to actuation signals

use crate::error::ConstructionError;
use crate::genome::{MuscleGene, NeuralGenome, OscillatorGenome};
use crate::neural::ControllerBrain;
use crate::sensors::SensorFrame;
use crate::traits::Controller;

/// Open-loop controller: one sine oscillator per muscle, sensors unused
#[derive(Debug, Clone)]
pub struct OscillatorController {
    muscles: Vec<MuscleGene>,
}

impl OscillatorController {
    pub fn muscles(&self) -> &[MuscleGene] {
        &self.muscles
    }
}

impl Controller for OscillatorController {
    type Genome = OscillatorGenome;

    fn from_genome(
        genome: &OscillatorGenome,
        actuators: usize,
        _sensors: usize,
    ) -> Result<Self, ConstructionError> {
        if genome.muscles.len() != actuators {
            return Err(ConstructionError::ActuatorMismatch {
                genes: genome.muscles.len(),
                actuators,
            });
        }
        Ok(Self {
            muscles: genome.muscles.clone(),
        })
    }

    fn actuate(&self, tick: u64, _sensors: &SensorFrame) -> Vec<f32> {
        self.muscles.iter().map(|m| m.signal(tick)).collect()
    }
}

/// Closed-loop controller backed by a [`ControllerBrain`]
#[derive(Debug, Clone)]
pub struct NeuralController {
    brain: ControllerBrain,
}

impl NeuralController {
    pub fn brain(&self) -> &ControllerBrain {
        &self.brain
    }
}

impl Controller for NeuralController {
    type Genome = NeuralGenome;

    fn from_genome(
        genome: &NeuralGenome,
        actuators: usize,
        sensors: usize,
    ) -> Result<Self, ConstructionError> {
        let weights = &genome.weights;
        if weights.output_count() != actuators {
            return Err(ConstructionError::ActuatorMismatch {
                genes: weights.output_count(),
                actuators,
            });
        }
        if weights.input_count() != sensors {
            return Err(ConstructionError::SensorMismatch {
                expected: weights.input_count(),
                actual: sensors,
            });
        }

        let brain = ControllerBrain::new(
            sensors,
            weights.hidden_count(),
            actuators,
            Some(weights.clone()),
        )?;
        Ok(Self { brain })
    }

    fn actuate(&self, _tick: u64, sensors: &SensorFrame) -> Vec<f32> {
        self.brain.predict(&sensors.to_vec())
    }
}
