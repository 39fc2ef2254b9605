//! # Wave Basis
//!
//! Parameter records for the multidimensional waves an expression function
//! combines, and the evaluator seam that turns them into numbers.
//!
//! The expression engine only decides *which* waves exist and with which
//! parameters. Evaluation is delegated to a `WaveEvaluator`; `GaborBasis`
//! is the evaluator used unless the caller injects another one.

use serde::{Deserialize, Serialize};

/// Per-dimension wave parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDimension {
    /// Where the envelope peaks along this axis
    pub center: f64,
    /// Envelope spread along this axis (always > 0)
    pub width: f64,
}

/// One basis wave
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wavelet {
    pub frequency: f64,
    pub phase: f64,
    pub amplitude: f64,
    /// Envelope sharpness (always > 0)
    pub form: f64,
    /// One entry per input dimension
    pub dimensions: Vec<WaveDimension>,
}

impl Wavelet {
    /// Number of input dimensions
    #[inline]
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

/// Evaluates basis waves at a point
pub trait WaveEvaluator {
    /// Value of one wave at `point` (one coordinate per dimension)
    fn evaluate(&self, wave: &Wavelet, point: &[f64]) -> f64;

    /// Additive combination of several waves
    fn combine(&self, waves: &[Wavelet], point: &[f64]) -> f64 {
        waves.iter().map(|w| self.evaluate(w, point)).sum()
    }
}

/// Gaussian envelope modulating a radial cosine carrier
///
/// ```text
/// r²  = Σ ((xᵢ - cᵢ) / wᵢ)²
/// d   = √Σ (xᵢ - cᵢ)²
/// f(x) = amplitude · exp(-r² / form) · cos(frequency · d + phase)
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct GaborBasis;

impl WaveEvaluator for GaborBasis {
    fn evaluate(&self, wave: &Wavelet, point: &[f64]) -> f64 {
        let mut scaled = 0.0;
        let mut distance = 0.0;
        for (dim, x) in wave.dimensions.iter().zip(point) {
            let delta = x - dim.center;
            scaled += (delta / dim.width).powi(2);
            distance += delta * delta;
        }

        let envelope = (-scaled / wave.form).exp();
        let carrier = (wave.frequency * distance.sqrt() + wave.phase).cos();
        wave.amplitude * envelope * carrier
    }
}
