//! Evolution configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `strider.ron` file (if exists)
//! 3. Environment variables prefixed with `STRIDER_`
//!
//! Example environment variable: `STRIDER_SELECTION__TOURNAMENT_SIZE=4`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, FileSourceFile};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use strider_creature::{CreatureSettings, EarlyTermination};
use thiserror::Error;

/// Raised by [`EvolutionConfig::validate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),

    #[error("trial duration must be at least one tick")]
    EmptyTrial,

    #[error("elite count must be at least 1")]
    NoElites,

    #[error("parent pool ({pool}) must be larger than the elite count ({elites})")]
    PoolNotAboveElites { pool: usize, elites: usize },

    #[error("parent pool ({pool}) cannot exceed the population size ({population})")]
    PoolAbovePopulation { pool: usize, population: usize },

    #[error("mutation rate must lie in [0, 1], got {0}")]
    MutationRate(f32),

    #[error("a creature needs at least 2 segments, got {0}")]
    SegmentCount(usize),

    #[error("hidden layer must have at least one neuron")]
    NoHiddenNeurons,

    #[error("tournament size must be at least 1")]
    EmptyTournament,
}

/// How parents are drawn from the top of the ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Linear rank weights M, M-1, .., 1 over the parent pool
    #[default]
    RankWeighted,
    /// Best of `tournament_size` uniform draws from the parent pool
    Tournament,
}

/// Parent selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub method: SelectionMethod,
    /// Entrants per tournament (tournament selection only)
    pub tournament_size: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            method: SelectionMethod::RankWeighted,
            tournament_size: 3,
        }
    }
}

/// Which early-termination rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    #[default]
    Never,
    FlippedOver,
    FallenBehind,
}

/// Early-termination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationSettings {
    pub policy: TerminationPolicy,
    /// Tilt in radians beyond which a creature counts as flipped
    pub max_tilt: f32,
    /// Distance in meters behind the start line that retires a creature
    pub margin: f32,
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            policy: TerminationPolicy::Never,
            max_tilt: 2.0,
            margin: 1.0,
        }
    }
}

impl TerminationSettings {
    /// The policy applied to every spawned creature
    pub fn early_termination(&self) -> EarlyTermination {
        match self.policy {
            TerminationPolicy::Never => EarlyTermination::Never,
            TerminationPolicy::FlippedOver => EarlyTermination::FlippedOver {
                max_tilt: self.max_tilt,
            },
            TerminationPolicy::FallenBehind => EarlyTermination::FallenBehind {
                margin: self.margin,
            },
        }
    }
}

/// Main evolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Creatures per generation (N)
    pub population_size: usize,
    /// Physics ticks per trial
    pub trial_duration: u64,
    /// Per-gene mutation probability
    pub mutation_rate: f32,
    /// Top genomes copied unchanged into the next generation (K)
    pub elite_count: usize,
    /// Top genomes parents are drawn from (M)
    pub parent_pool: usize,
    /// Start line every creature spawns on
    pub spawn_x: f32,
    pub spawn_y: f32,
    /// Seed for genome randomness; unseeded when absent
    pub seed: Option<u64>,
    pub selection: SelectionSettings,
    pub creature: CreatureSettings,
    pub early_termination: TerminationSettings,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 12,
            trial_duration: 900,
            mutation_rate: 0.1,
            elite_count: 2,
            parent_pool: 6,
            spawn_x: 0.0,
            spawn_y: 0.0,
            seed: None,
            selection: SelectionSettings::default(),
            creature: CreatureSettings::default(),
            early_termination: TerminationSettings::default(),
        }
    }
}

impl EvolutionConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `strider.ron` file (if exists)
    /// 3. Environment variables prefixed with `STRIDER_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::load_layers(
            File::with_name("strider")
                .format(FileFormat::Ron)
                .required(false),
        )
    }

    /// Same layering as [`EvolutionConfig::load`] with an explicit file, which must exist
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::load_layers(File::from(path).format(FileFormat::Ron).required(true))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    fn load_layers(file: File<FileSourceFile, FileFormat>) -> Result<Self> {
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("population_size", 12_i64)?
            .set_default("trial_duration", 900_i64)?
            .set_default("mutation_rate", 0.1)?
            .set_default("elite_count", 2_i64)?
            .set_default("parent_pool", 6_i64)?
            .set_default("spawn_x", 0.0)?
            .set_default("spawn_y", 0.0)?
            .set_default("selection.method", "rank_weighted")?
            .set_default("selection.tournament_size", 3_i64)?
            .set_default("creature.segment_count", 4_i64)?
            .set_default("creature.hidden_count", 8_i64)?
            .set_default("early_termination.policy", "never")?
            .set_default("early_termination.max_tilt", 2.0)?
            .set_default("early_termination.margin", 1.0)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: STRIDER_* environment variables, `__` separates nested keys
            .add_source(
                Environment::with_prefix("STRIDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check the invariants the evolution cycle relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.trial_duration == 0 {
            return Err(ConfigError::EmptyTrial);
        }
        if self.elite_count == 0 {
            return Err(ConfigError::NoElites);
        }
        if self.parent_pool <= self.elite_count {
            return Err(ConfigError::PoolNotAboveElites {
                pool: self.parent_pool,
                elites: self.elite_count,
            });
        }
        if self.parent_pool > self.population_size {
            return Err(ConfigError::PoolAbovePopulation {
                pool: self.parent_pool,
                population: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRate(self.mutation_rate));
        }
        if self.creature.segment_count < 2 {
            return Err(ConfigError::SegmentCount(self.creature.segment_count));
        }
        if self.creature.hidden_count == 0 {
            return Err(ConfigError::NoHiddenNeurons);
        }
        if self.selection.tournament_size == 0 {
            return Err(ConfigError::EmptyTournament);
        }
        Ok(())
    }

    /// Point on the start line where every creature spawns
    pub fn spawn_point(&self) -> Vec2 {
        Vec2::new(self.spawn_x, self.spawn_y)
    }

    /// Pretty RON rendering of the effective configuration
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that read the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets variables for one test and removes them on drop
    struct EnvVars(Vec<&'static str>);

    impl EnvVars {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for key in &self.0 {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = EvolutionConfig::default();
        assert_eq!(config.population_size, 12);
        assert_eq!(config.trial_duration, 900);
        assert_eq!(config.elite_count, 2);
        assert_eq!(config.parent_pool, 6);
        assert_eq!(config.selection.method, SelectionMethod::RankWeighted);
        assert_eq!(config.early_termination.early_termination(), EarlyTermination::Never);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_with_defaults() {
        let _lock = env_lock();
        // Should load defaults when no config file exists
        let config = EvolutionConfig::load().expect("Failed to load config");
        assert_eq!(config.trial_duration, 900);
        assert_eq!(config.creature.hidden_count, 8);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_load_config_file_overrides_defaults() {
        let _lock = env_lock();
        let mut file = tempfile::Builder::new()
            .suffix(".ron")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"(
                population_size: 24,
                mutation_rate: 0.25,
                selection: (method: "tournament", tournament_size: 4),
                early_termination: (policy: "fallen_behind", margin: 3.0),
            )"#
        )
        .unwrap();

        let config = EvolutionConfig::load_file(file.path()).expect("Failed to load config");
        assert_eq!(config.population_size, 24);
        assert_eq!(config.mutation_rate, 0.25);
        assert_eq!(config.selection.method, SelectionMethod::Tournament);
        assert_eq!(config.selection.tournament_size, 4);
        assert_eq!(
            config.early_termination.early_termination(),
            EarlyTermination::FallenBehind { margin: 3.0 }
        );
        // Untouched keys keep their defaults
        assert_eq!(config.trial_duration, 900);
        assert_eq!(config.creature.segment_count, 4);
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let _lock = env_lock();
        let mut file = tempfile::Builder::new()
            .suffix(".ron")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"(
                population_size: 24,
                selection: (method: "tournament", tournament_size: 4),
            )"#
        )
        .unwrap();

        let _vars = EnvVars::set(&[
            ("STRIDER_POPULATION_SIZE", "30"),
            ("STRIDER_SELECTION__METHOD", "rank_weighted"),
            ("STRIDER_CREATURE__SEGMENT_COUNT", "6"),
        ]);

        let config = EvolutionConfig::load_file(file.path()).expect("Failed to load config");
        assert_eq!(config.population_size, 30);
        assert_eq!(config.selection.method, SelectionMethod::RankWeighted);
        assert_eq!(config.creature.segment_count, 6);
        // Keys the environment leaves alone come from the file, then defaults
        assert_eq!(config.selection.tournament_size, 4);
        assert_eq!(config.trial_duration, 900);

        let config = EvolutionConfig::load().expect("Failed to load config");
        assert_eq!(config.population_size, 30);
        assert_eq!(config.creature.segment_count, 6);
        assert_eq!(config.creature.hidden_count, 8);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(EvolutionConfig::load_file("does/not/exist.ron").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = EvolutionConfig::default();

        let cases = [
            (
                EvolutionConfig {
                    population_size: 1,
                    ..base.clone()
                },
                ConfigError::PopulationTooSmall(1),
            ),
            (
                EvolutionConfig {
                    trial_duration: 0,
                    ..base.clone()
                },
                ConfigError::EmptyTrial,
            ),
            (
                EvolutionConfig {
                    elite_count: 0,
                    ..base.clone()
                },
                ConfigError::NoElites,
            ),
            (
                EvolutionConfig {
                    parent_pool: 2,
                    ..base.clone()
                },
                ConfigError::PoolNotAboveElites { pool: 2, elites: 2 },
            ),
            (
                EvolutionConfig {
                    parent_pool: 13,
                    ..base.clone()
                },
                ConfigError::PoolAbovePopulation {
                    pool: 13,
                    population: 12,
                },
            ),
            (
                EvolutionConfig {
                    mutation_rate: 1.5,
                    ..base.clone()
                },
                ConfigError::MutationRate(1.5),
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }

        let mut config = base.clone();
        config.creature.segment_count = 1;
        assert_eq!(config.validate(), Err(ConfigError::SegmentCount(1)));

        let mut config = base;
        config.selection.tournament_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyTournament));
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = EvolutionConfig {
            seed: Some(42),
            ..Default::default()
        };
        let text = config.to_ron().unwrap();
        let restored: EvolutionConfig = ron::from_str(&text).unwrap();
        assert_eq!(restored, config);
    }
}
