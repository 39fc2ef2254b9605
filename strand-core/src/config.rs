//! # Configuration
//!
//! Parameters for growing a genome and for running it. Everything has a
//! default; a JSON file or environment variables override it.

use serde::{Deserialize, Serialize};

use crate::error::{StrandError, StrandResult};

/// Master configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StrandConfig {
    /// How the initial genome is grown
    pub genome: GenomeConfig,

    /// How long the cell runs
    pub simulation: SimulationConfig,
}

/// Initial genome shape
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenomeConfig {
    /// Chromosomes per nucleus
    pub chromosomes: usize,

    /// Starting mutability of chromosomes, chromatids and their genes
    pub mutability: f64,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            chromosomes: 2,
            mutability: 1.0,
        }
    }
}

/// Run length and reproducibility
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// RNG seed; drawn from entropy when absent
    pub seed: Option<u64>,

    /// Mutation rounds
    pub generations: u32,

    /// Ticks between mutation rounds
    pub ticks_per_generation: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            generations: 10,
            ticks_per_generation: 20,
        }
    }
}

impl StrandConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> StrandResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &str) -> StrandResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overridden by environment variables
    ///
    /// Reads:
    /// - STRAND_SEED: RNG seed (default: entropy)
    /// - STRAND_CHROMOSOMES: chromosomes per nucleus (default: 2)
    /// - STRAND_MUTABILITY: initial mutability (default: 1.0)
    /// - STRAND_GENERATIONS: mutation rounds (default: 10)
    /// - STRAND_TICKS: ticks per generation (default: 20)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = env_parse("STRAND_SEED") {
            config.simulation.seed = Some(seed);
        }
        if let Some(chromosomes) = env_parse("STRAND_CHROMOSOMES") {
            config.genome.chromosomes = chromosomes;
        }
        if let Some(mutability) = env_parse("STRAND_MUTABILITY") {
            config.genome.mutability = mutability;
        }
        if let Some(generations) = env_parse("STRAND_GENERATIONS") {
            config.simulation.generations = generations;
        }
        if let Some(ticks) = env_parse("STRAND_TICKS") {
            config.simulation.ticks_per_generation = ticks;
        }

        config
    }

    pub fn validate(&self) -> StrandResult<()> {
        if self.genome.chromosomes == 0 {
            return Err(StrandError::config("a nucleus needs at least one chromosome"));
        }
        if !self.genome.mutability.is_finite() || self.genome.mutability <= 0.0 {
            return Err(StrandError::config(format!(
                "mutability must be positive and finite, got {}",
                self.genome.mutability
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
