//! Headless training: run evolution without a renderer

mod training_env;

pub use training_env::{TrainingConfig, TrainingEnv};
