//! Genome representations
//!
//! Two variants are provided:
//! - [`OscillatorGenome`]: per-muscle sine oscillators plus structural scalars
//! - [`NeuralGenome`]: weights of a one-hidden-layer controller plus a segment count
//!
//! Genomes are plain values. Crossover and mutation always build a new genome
//! field by field and never touch their inputs.

use std::f32::consts::TAU;

use ndarray::{ArcArray1, ArcArray2, Array1, Array2, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConstructionError, GenomeError};
use crate::sensors::SensorFrame;
use crate::traits::Genome;

/// Valid range and mutation step of a scalar gene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneRange {
    pub min: f32,
    pub max: f32,
    /// Largest absolute delta a single mutation may add
    pub step: f32,
}

impl GeneRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// Uniform draw from `[min, max]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.random_range(self.min..=self.max)
    }

    /// Add a symmetric delta in `[-step, step]` and clamp back into range
    pub fn perturb<R: Rng + ?Sized>(&self, value: f32, rng: &mut R) -> f32 {
        let delta = rng.random_range(-self.step..=self.step);
        let perturbed = (value + delta).clamp(self.min, self.max);
        if perturbed.is_finite() {
            perturbed
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Oscillation frequency in radians per tick
pub const FREQUENCY: GeneRange = GeneRange::new(0.05, 0.25, 0.03);
/// Fraction of the muscle stroke used
pub const AMPLITUDE: GeneRange = GeneRange::new(0.2, 1.0, 0.15);
/// Normalised spring stiffness (scaled by the body)
pub const STIFFNESS: GeneRange = GeneRange::new(0.2, 1.0, 0.1);
/// Normalised spring damping (scaled by the body)
pub const DAMPING: GeneRange = GeneRange::new(0.05, 0.5, 0.05);
/// Body width in meters
pub const WIDTH: GeneRange = GeneRange::new(1.2, 2.4, 0.15);
/// Body height in meters
pub const HEIGHT: GeneRange = GeneRange::new(0.3, 0.7, 0.05);
/// Leg length in meters
pub const LIMB_LENGTH: GeneRange = GeneRange::new(0.6, 1.4, 0.1);

/// Phase mutation step; phases wrap instead of clamping
pub const PHASE_STEP: f32 = 0.5;

/// Initial range of brain weights and biases
pub const WEIGHT_INIT: f32 = 1.0;
/// Mutation step of brain weights and biases
pub const WEIGHT_STEP: f32 = 0.3;
/// Absolute bound on mutated brain weights
pub const WEIGHT_LIMIT: f32 = 4.0;

fn pick<T: Clone, R: Rng + ?Sized>(rng: &mut R, a: &T, b: &T) -> T {
    if rng.random::<bool>() {
        a.clone()
    } else {
        b.clone()
    }
}

fn mutate_in_range<R: Rng + ?Sized>(value: f32, range: &GeneRange, rate: f32, rng: &mut R) -> f32 {
    if rng.random::<f32>() < rate {
        range.perturb(value, rng)
    } else {
        value
    }
}

fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid of a tiny negative value can round up to TAU itself
    if wrapped.is_finite() && wrapped < TAU {
        wrapped
    } else {
        0.0
    }
}

// ===== Oscillator genome =====

/// Sine oscillator driving one muscle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuscleGene {
    pub frequency: f32,
    pub amplitude: f32,
    pub phase: f32,
}

impl MuscleGene {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            frequency: FREQUENCY.sample(rng),
            amplitude: AMPLITUDE.sample(rng),
            phase: rng.random_range(0.0..TAU),
        }
    }

    /// Oscillator output in `[-amplitude, amplitude]` at `tick`
    pub fn signal(&self, tick: u64) -> f32 {
        (tick as f32 * self.frequency + self.phase).sin() * self.amplitude
    }
}

/// Body-shape parameters shared by oscillator-driven bodies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeGenes {
    pub width: f32,
    pub height: f32,
    /// Leg length; bodies without legs ignore it
    pub limb_length: f32,
}

/// Number of muscles an oscillator genome must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillatorTopology {
    pub muscle_count: usize,
}

/// Oscillator-driven genome: one sine oscillator per muscle plus structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorGenome {
    pub muscles: Vec<MuscleGene>,
    pub stiffness: f32,
    pub damping: f32,
    pub shape: ShapeGenes,
}

impl OscillatorGenome {
    /// Whether every ranged field lies inside its range and every phase in `[0, 2π)`
    pub fn is_within_ranges(&self) -> bool {
        self.muscles.iter().all(|m| {
            FREQUENCY.contains(m.frequency)
                && AMPLITUDE.contains(m.amplitude)
                && (0.0..TAU).contains(&m.phase)
        }) && STIFFNESS.contains(self.stiffness)
            && DAMPING.contains(self.damping)
            && WIDTH.contains(self.shape.width)
            && HEIGHT.contains(self.shape.height)
            && LIMB_LENGTH.contains(self.shape.limb_length)
    }
}

impl Genome for OscillatorGenome {
    type Topology = OscillatorTopology;

    fn random<R: Rng + ?Sized>(topology: &OscillatorTopology, rng: &mut R) -> Self {
        Self {
            muscles: (0..topology.muscle_count)
                .map(|_| MuscleGene::random(rng))
                .collect(),
            stiffness: STIFFNESS.sample(rng),
            damping: DAMPING.sample(rng),
            shape: ShapeGenes {
                width: WIDTH.sample(rng),
                height: HEIGHT.sample(rng),
                limb_length: LIMB_LENGTH.sample(rng),
            },
        }
    }

    fn crossover<R: Rng + ?Sized>(a: &Self, b: &Self, rng: &mut R) -> Result<Self, GenomeError> {
        if a.muscles.len() != b.muscles.len() {
            return Err(GenomeError::LengthMismatch {
                field: "muscles",
                left: a.muscles.len(),
                right: b.muscles.len(),
            });
        }

        let muscles = a
            .muscles
            .iter()
            .zip(&b.muscles)
            .map(|(ma, mb)| MuscleGene {
                frequency: pick(rng, &ma.frequency, &mb.frequency),
                amplitude: pick(rng, &ma.amplitude, &mb.amplitude),
                phase: pick(rng, &ma.phase, &mb.phase),
            })
            .collect();

        Ok(Self {
            muscles,
            stiffness: pick(rng, &a.stiffness, &b.stiffness),
            damping: pick(rng, &a.damping, &b.damping),
            shape: ShapeGenes {
                width: pick(rng, &a.shape.width, &b.shape.width),
                height: pick(rng, &a.shape.height, &b.shape.height),
                limb_length: pick(rng, &a.shape.limb_length, &b.shape.limb_length),
            },
        })
    }

    fn mutate<R: Rng + ?Sized>(&self, rate: f32, rng: &mut R) -> Self {
        let muscles = self
            .muscles
            .iter()
            .map(|m| {
                let frequency = mutate_in_range(m.frequency, &FREQUENCY, rate, rng);
                let amplitude = mutate_in_range(m.amplitude, &AMPLITUDE, rate, rng);
                let phase = if rng.random::<f32>() < rate {
                    wrap_phase(m.phase + rng.random_range(-PHASE_STEP..=PHASE_STEP))
                } else {
                    m.phase
                };
                MuscleGene {
                    frequency,
                    amplitude,
                    phase,
                }
            })
            .collect();

        Self {
            muscles,
            stiffness: mutate_in_range(self.stiffness, &STIFFNESS, rate, rng),
            damping: mutate_in_range(self.damping, &DAMPING, rate, rng),
            shape: ShapeGenes {
                width: mutate_in_range(self.shape.width, &WIDTH, rate, rng),
                height: mutate_in_range(self.shape.height, &HEIGHT, rate, rng),
                limb_length: mutate_in_range(self.shape.limb_length, &LIMB_LENGTH, rate, rng),
            },
        }
    }
}

// ===== Neural genome =====

/// Weights of a one-hidden-layer feed-forward network.
///
/// Arrays are reference counted so a brain built from a genome shares its
/// buffers instead of copying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainWeights {
    /// hidden × input
    pub weights1: ArcArray2<f32>,
    /// hidden
    pub biases1: ArcArray1<f32>,
    /// output × hidden
    pub weights2: ArcArray2<f32>,
    /// output
    pub biases2: ArcArray1<f32>,
}

impl BrainWeights {
    /// Uniform draw in `[-1, 1]` for every weight and bias
    pub fn random<R: Rng + ?Sized>(
        input: usize,
        hidden: usize,
        output: usize,
        rng: &mut R,
    ) -> Self {
        let mut draw = || rng.random_range(-WEIGHT_INIT..=WEIGHT_INIT);
        Self {
            weights1: Array2::from_shape_simple_fn((hidden, input), &mut draw).into_shared(),
            biases1: Array1::from_shape_simple_fn(hidden, &mut draw).into_shared(),
            weights2: Array2::from_shape_simple_fn((output, hidden), &mut draw).into_shared(),
            biases2: Array1::from_shape_simple_fn(output, &mut draw).into_shared(),
        }
    }

    /// All-zero weights (every output is `tanh(0) = 0`)
    pub fn zeros(input: usize, hidden: usize, output: usize) -> Self {
        Self {
            weights1: Array2::zeros((hidden, input)).into_shared(),
            biases1: Array1::zeros(hidden).into_shared(),
            weights2: Array2::zeros((output, hidden)).into_shared(),
            biases2: Array1::zeros(output).into_shared(),
        }
    }

    pub fn input_count(&self) -> usize {
        self.weights1.ncols()
    }

    pub fn hidden_count(&self) -> usize {
        self.weights1.nrows()
    }

    pub fn output_count(&self) -> usize {
        self.weights2.nrows()
    }

    /// Verify every array matches an `input → hidden → output` topology
    pub fn check_shape(
        &self,
        input: usize,
        hidden: usize,
        output: usize,
    ) -> Result<(), ConstructionError> {
        let checks = [
            ("weights1", (hidden, input), self.weights1.dim()),
            ("biases1", (hidden, 1), (self.biases1.len(), 1)),
            ("weights2", (output, hidden), self.weights2.dim()),
            ("biases2", (output, 1), (self.biases2.len(), 1)),
        ];
        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(ConstructionError::BrainShape {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Every value finite and within the mutation bound
    pub fn is_bounded(&self) -> bool {
        let ok = |w: &f32| w.is_finite() && w.abs() <= WEIGHT_LIMIT;
        self.weights1.iter().all(ok)
            && self.biases1.iter().all(ok)
            && self.weights2.iter().all(ok)
            && self.biases2.iter().all(ok)
    }

    fn crossover<R: Rng + ?Sized>(a: &Self, b: &Self, rng: &mut R) -> Result<Self, GenomeError> {
        let matrix = |field, x: &ArcArray2<f32>, y: &ArcArray2<f32>| {
            if x.dim() == y.dim() {
                Ok(())
            } else {
                Err(GenomeError::ShapeMismatch {
                    field,
                    left: x.dim(),
                    right: y.dim(),
                })
            }
        };
        let vector = |field, x: &ArcArray1<f32>, y: &ArcArray1<f32>| {
            if x.len() == y.len() {
                Ok(())
            } else {
                Err(GenomeError::LengthMismatch {
                    field,
                    left: x.len(),
                    right: y.len(),
                })
            }
        };
        matrix("weights1", &a.weights1, &b.weights1)?;
        vector("biases1", &a.biases1, &b.biases1)?;
        matrix("weights2", &a.weights2, &b.weights2)?;
        vector("biases2", &a.biases2, &b.biases2)?;

        let mut choose = |&x: &f32, &y: &f32| if rng.random::<bool>() { x } else { y };
        Ok(Self {
            weights1: Zip::from(&a.weights1)
                .and(&b.weights1)
                .map_collect(&mut choose)
                .into_shared(),
            biases1: Zip::from(&a.biases1)
                .and(&b.biases1)
                .map_collect(&mut choose)
                .into_shared(),
            weights2: Zip::from(&a.weights2)
                .and(&b.weights2)
                .map_collect(&mut choose)
                .into_shared(),
            biases2: Zip::from(&a.biases2)
                .and(&b.biases2)
                .map_collect(&mut choose)
                .into_shared(),
        })
    }

    fn mutate<R: Rng + ?Sized>(&self, rate: f32, rng: &mut R) -> Self {
        let mut nudge = |w: f32| {
            if rng.random::<f32>() < rate {
                let nudged = (w + rng.random_range(-WEIGHT_STEP..=WEIGHT_STEP))
                    .clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
                if nudged.is_finite() { nudged } else { 0.0 }
            } else {
                w
            }
        };
        Self {
            weights1: self.weights1.mapv(&mut nudge).into_shared(),
            biases1: self.biases1.mapv(&mut nudge).into_shared(),
            weights2: self.weights2.mapv(&mut nudge).into_shared(),
            biases2: self.biases2.mapv(&mut nudge).into_shared(),
        }
    }
}

/// Fixed network and body sizes for neural genomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeuralTopology {
    pub segment_count: usize,
    pub hidden_count: usize,
}

impl NeuralTopology {
    /// Sensor vector length of a chain with `segment_count` segments
    pub fn input_count(&self) -> usize {
        SensorFrame::dim(self.segment_count.saturating_sub(1))
    }

    /// One spin actuator per segment
    pub fn output_count(&self) -> usize {
        self.segment_count
    }
}

/// Neural-driven genome: controller weights plus the chain length they drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralGenome {
    pub weights: BrainWeights,
    pub segment_count: usize,
}

impl NeuralGenome {
    /// Genome whose brain outputs zero for every input
    pub fn zeroed(topology: &NeuralTopology) -> Self {
        Self {
            weights: BrainWeights::zeros(
                topology.input_count(),
                topology.hidden_count,
                topology.output_count(),
            ),
            segment_count: topology.segment_count,
        }
    }
}

impl Genome for NeuralGenome {
    type Topology = NeuralTopology;

    fn random<R: Rng + ?Sized>(topology: &NeuralTopology, rng: &mut R) -> Self {
        Self {
            weights: BrainWeights::random(
                topology.input_count(),
                topology.hidden_count,
                topology.output_count(),
                rng,
            ),
            segment_count: topology.segment_count,
        }
    }

    fn crossover<R: Rng + ?Sized>(a: &Self, b: &Self, rng: &mut R) -> Result<Self, GenomeError> {
        if a.segment_count != b.segment_count {
            return Err(GenomeError::SegmentCountMismatch {
                left: a.segment_count,
                right: b.segment_count,
            });
        }
        Ok(Self {
            weights: BrainWeights::crossover(&a.weights, &b.weights, rng)?,
            segment_count: a.segment_count,
        })
    }

    fn mutate<R: Rng + ?Sized>(&self, rate: f32, rng: &mut R) -> Self {
        Self {
            weights: self.weights.mutate(rate, rng),
            segment_count: self.segment_count,
        }
    }
}
