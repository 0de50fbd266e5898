//! Feed-forward neural controller
//!
//! One hidden layer, tanh activations on both layers, no recurrent state.

use ndarray::{ArrayView1, ArcArray1, ArcArray2};

use crate::error::ConstructionError;
use crate::genome::BrainWeights;

/// Stateless two-layer network mapping a sensor vector to actuation signals
#[derive(Debug, Clone)]
pub struct ControllerBrain {
    input_count: usize,
    hidden_count: usize,
    output_count: usize,
    /// hidden × input
    weights1: ArcArray2<f32>,
    biases1: ArcArray1<f32>,
    /// output × hidden
    weights2: ArcArray2<f32>,
    biases2: ArcArray1<f32>,
}

impl ControllerBrain {
    /// Build a brain with the given layer sizes.
    ///
    /// Without `weights` every weight and bias is drawn uniformly from [-1, 1].
    /// Supplied weights are shared with their owner, not copied, and must
    /// match the layer sizes exactly.
    pub fn new(
        input_count: usize,
        hidden_count: usize,
        output_count: usize,
        weights: Option<BrainWeights>,
    ) -> Result<Self, ConstructionError> {
        let weights = match weights {
            Some(weights) => {
                weights.check_shape(input_count, hidden_count, output_count)?;
                weights
            }
            None => BrainWeights::random(input_count, hidden_count, output_count, &mut rand::rng()),
        };

        Ok(Self {
            input_count,
            hidden_count,
            output_count,
            weights1: weights.weights1,
            biases1: weights.biases1,
            weights2: weights.weights2,
            biases2: weights.biases2,
        })
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Forward pass: `tanh(b2 + W2 · tanh(b1 + W1 · input))`
    ///
    /// Panics if `input.len() != input_count`.
    pub fn predict(&self, input: &[f32]) -> Vec<f32> {
        assert_eq!(input.len(), self.input_count, "Input dimension mismatch");

        let input = ArrayView1::from(input);
        let hidden = (self.weights1.dot(&input) + &self.biases1).mapv_into(f32::tanh);
        let output = (self.weights2.dot(&hidden) + &self.biases2).mapv_into(f32::tanh);

        output.to_vec()
    }

    /// Hidden layer activations, for inspection
    pub fn hidden_activations(&self, input: &[f32]) -> Vec<f32> {
        assert_eq!(input.len(), self.input_count, "Input dimension mismatch");

        let input = ArrayView1::from(input);
        (self.weights1.dot(&input) + &self.biases1)
            .mapv_into(f32::tanh)
            .to_vec()
    }

    /// Whether this brain reads its weights from the same buffers as `weights`
    pub fn shares_weights_with(&self, weights: &BrainWeights) -> bool {
        self.weights1.as_ptr() == weights.weights1.as_ptr()
            && self.weights2.as_ptr() == weights.weights2.as_ptr()
    }
}
