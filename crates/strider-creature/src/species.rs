//! Species: a genome, the body it grows and the controller that drives it
//!
//! Population code is generic over [`Species`], so adding a creature kind
//! means adding one impl here.

use serde::{Deserialize, Serialize};

use crate::controller::{NeuralController, OscillatorController};
use crate::genome::{NeuralGenome, NeuralTopology, OscillatorGenome, OscillatorTopology};
use crate::morphology::{LeggedBody, SegmentChain, SoftBody};
use crate::traits::{Body, Controller, Genome};

/// Per-run creature parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureSettings {
    /// Segments in a neural crawler's chain
    pub segment_count: usize,
    /// Hidden neurons in a neural crawler's brain
    pub hidden_count: usize,
}

impl Default for CreatureSettings {
    fn default() -> Self {
        Self {
            segment_count: 4,
            hidden_count: 8,
        }
    }
}

/// Ties a genome type to a body and a controller built from it
pub trait Species: 'static {
    /// Short display name
    const NAME: &'static str;

    type Genome: Genome;
    type Body: Body<Genome = Self::Genome>;
    type Controller: Controller<Genome = Self::Genome>;

    /// Topology every genome of this species is drawn with
    fn topology(settings: &CreatureSettings) -> <Self::Genome as Genome>::Topology;
}

/// Four-legged walker driven by open-loop muscle oscillators
#[derive(Debug, Clone, Copy, Default)]
pub struct LeggedWalker;

impl Species for LeggedWalker {
    const NAME: &'static str = "legged";

    type Genome = OscillatorGenome;
    type Body = LeggedBody;
    type Controller = OscillatorController;

    fn topology(_settings: &CreatureSettings) -> OscillatorTopology {
        OscillatorTopology {
            muscle_count: LeggedBody::ACTUATOR_COUNT,
        }
    }
}

/// Deformable lattice driven by open-loop muscle oscillators
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftBlob;

impl Species for SoftBlob {
    const NAME: &'static str = "soft";

    type Genome = OscillatorGenome;
    type Body = SoftBody;
    type Controller = OscillatorController;

    fn topology(_settings: &CreatureSettings) -> OscillatorTopology {
        OscillatorTopology {
            muscle_count: SoftBody::ACTUATOR_COUNT,
        }
    }
}

/// Segment chain steered by a neural brain
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralCrawler;

impl Species for NeuralCrawler {
    const NAME: &'static str = "neural";

    type Genome = NeuralGenome;
    type Body = SegmentChain;
    type Controller = NeuralController;

    fn topology(settings: &CreatureSettings) -> NeuralTopology {
        NeuralTopology {
            segment_count: settings.segment_count,
            hidden_count: settings.hidden_count,
        }
    }
}
