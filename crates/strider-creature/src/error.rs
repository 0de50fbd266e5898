//! Error types for genome recombination and creature construction

use thiserror::Error;

/// Raised when two genomes cannot be recombined gene-by-gene.
///
/// Parents of one population always share a topology, so this signals a
/// programming error upstream rather than a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    #[error("crossover parents disagree on `{field}` length ({left} vs {right})")]
    LengthMismatch {
        field: &'static str,
        left: usize,
        right: usize,
    },

    #[error("crossover parents disagree on `{field}` shape ({left:?} vs {right:?})")]
    ShapeMismatch {
        field: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("crossover parents disagree on segment count ({left} vs {right})")]
    SegmentCountMismatch { left: usize, right: usize },
}

/// Raised when a genome does not fit the body or brain built from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("genome provides {genes} actuator genes but the body has {actuators} actuators")]
    ActuatorMismatch { genes: usize, actuators: usize },

    #[error("brain `{field}` has shape {actual:?}, expected {expected:?}")]
    BrainShape {
        field: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("brain expects {expected} sensor inputs but the body provides {actual}")]
    SensorMismatch { expected: usize, actual: usize },

    #[error("a segment chain needs at least 2 segments, got {0}")]
    TooFewSegments(usize),

    #[error("blueprint references part {index} but only {parts} parts exist")]
    InvalidPartIndex { index: usize, parts: usize },
}
