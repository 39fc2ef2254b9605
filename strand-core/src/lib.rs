//! # Strand Core
//!
//! Gene-regulatory network of a single cell, built to be evolved.
//!
//! This crate provides the building blocks, leaf first:
//! - **Key**: sparse binary pattern; receptors bind signals at any offset
//! - **ExpressionFunction**: wavelet combination from inputs to activity
//! - **Gene**: promoter, signal or boundary gene with double-buffered activity
//! - **Chromatid / Chromosome / Nucleus**: ordered genome with crossover
//! - **Cell**: nucleus plus the local concentrations it writes and reads
//! - **mutation**: the shared gate and self-adapting rate rule
//!
//! ## Simulation step
//!
//! ```text
//! Cell::step
//!   pre_tick  every gene: pending = f(concentrations)     (no writes)
//!   tick      every gene: commit, apply promotion, write back
//! ```
//!
//! Mutation runs between steps, never during one. All randomness comes from
//! one `rand::Rng` the caller passes down, so a seeded generator reproduces
//! a run exactly.

pub mod cell;
pub mod chromatid;
pub mod chromosome;
pub mod concentration;
pub mod config;
pub mod error;
pub mod expression;
pub mod gene;
pub mod key;
pub mod mutation;
pub mod nucleus;
pub mod wave;

// Re-export main types at crate root
pub use cell::Cell;
pub use chromatid::Chromatid;
pub use chromosome::Chromosome;
pub use concentration::{Concentration, ConcentrationId, ConcentrationStore};
pub use config::{GenomeConfig, SimulationConfig, StrandConfig};
pub use error::{StrandError, StrandResult};
pub use expression::ExpressionFunction;
pub use gene::{Gene, GeneKind, SignalOutput};
pub use key::{Key, ReceptorKey, SignalKey};
pub use nucleus::Nucleus;
pub use wave::{GaborBasis, WaveDimension, WaveEvaluator, Wavelet};

/// Range random key positions are drawn from
pub const KEY_SPAN: i64 = 16;

/// Key positions are confined to `-KEY_LIMIT..=KEY_LIMIT`
pub const KEY_LIMIT: i64 = 4096;

/// Concrete positions in a synthesized key
pub const SYNTHETIC_KEY_POINTS: usize = 4;

/// Largest distance a new promoter reaches
pub const PROMOTER_REACH: i64 = 3;

/// Cap on any "repeat while a coin passes" loop
pub const MAX_MUTATION_ROUNDS: usize = 64;
