//! # Expression Functions
//!
//! An expression function turns the concentrations a gene has bound into
//! one activity scalar. Each receptor is an input dimension; each wave
//! carries one `WaveDimension` per receptor, index-aligned:
//!
//! ```text
//! receptors  [ r0      r1      r2    ]
//! wave 0     [ (c,w)   (c,w)   (c,w) ]  freq phase amp form
//! wave 1     [ (c,w)   (c,w)   (c,w) ]  freq phase amp form
//! ```
//!
//! Input for receptor `i` is the sum of every bound concentration whose
//! signal `rᵢ` binds. Adding or dropping a receptor adds or drops the same
//! column in every wave, so the alignment holds after every mutation.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::concentration::Concentration;
use crate::error::{StrandError, StrandResult};
use crate::key::{ReceptorKey, SignalKey};
use crate::mutation::{bounded_walk, coin, gaussian, mutation_event};
use crate::wave::{WaveDimension, WaveEvaluator, Wavelet};
use crate::MAX_MUTATION_ROUNDS;

/// Half-width of the uniform range new centers are drawn from
pub const CENTER_JITTER: f64 = 1.0;

/// Range new widths are drawn from
pub const WIDTH_MIN: f64 = 0.25;
pub const WIDTH_MAX: f64 = 2.0;

/// Smallest form or width a wave may carry
pub const MIN_SHAPE: f64 = 1e-3;

/// Chance of another mutation round
pub const CONTINUE_CHANCE: f64 = 0.5;

/// Wavelet combination over a set of receptors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExpressionParts")]
pub struct ExpressionFunction {
    receptors: Vec<ReceptorKey>,
    waves: Vec<Wavelet>,
}

/// Unchecked wire form; deserialization goes through `from_parts`
#[derive(Deserialize)]
struct ExpressionParts {
    receptors: Vec<ReceptorKey>,
    waves: Vec<Wavelet>,
}

impl TryFrom<ExpressionParts> for ExpressionFunction {
    type Error = StrandError;

    fn try_from(parts: ExpressionParts) -> StrandResult<Self> {
        Self::from_parts(parts.receptors, parts.waves)
    }
}

impl ExpressionFunction {
    /// One receptor, one freshly drawn wave
    pub fn new<R: Rng + ?Sized>(rng: &mut R, receptor: ReceptorKey) -> Self {
        Self {
            receptors: vec![receptor],
            waves: vec![fresh_wave(rng, 1)],
        }
    }

    /// Assemble from explicit parts
    ///
    /// Requires at least one receptor and one wave, distinct receptors,
    /// and one wave dimension per receptor.
    pub fn from_parts(receptors: Vec<ReceptorKey>, waves: Vec<Wavelet>) -> StrandResult<Self> {
        if receptors.is_empty() {
            return Err(StrandError::invalid_expression("no receptors"));
        }
        if waves.is_empty() {
            return Err(StrandError::invalid_expression("no waves"));
        }
        for (i, receptor) in receptors.iter().enumerate() {
            if receptors[..i].contains(receptor) {
                return Err(StrandError::invalid_expression(format!(
                    "duplicate receptor {}",
                    receptor
                )));
            }
        }
        if let Some(wave) = waves.iter().find(|w| w.rank() != receptors.len()) {
            return Err(StrandError::invalid_expression(format!(
                "wave has {} dimensions, expected {}",
                wave.rank(),
                receptors.len()
            )));
        }
        Ok(Self { receptors, waves })
    }

    #[inline]
    pub fn receptors(&self) -> &[ReceptorKey] {
        &self.receptors
    }

    #[inline]
    pub fn waves(&self) -> &[Wavelet] {
        &self.waves
    }

    /// True iff some receptor binds `signal`
    pub fn receives(&self, signal: &SignalKey) -> bool {
        self.receptors.iter().any(|r| r.binds(signal))
    }

    /// Per-receptor input sums
    pub fn inputs(&self, concentrations: &[&Concentration]) -> Vec<f64> {
        self.receptors
            .iter()
            .map(|receptor| {
                concentrations
                    .iter()
                    .filter(|c| receptor.binds(&c.signal))
                    .map(|c| c.value)
                    .sum()
            })
            .collect()
    }

    /// Evaluate the combined waves at the current inputs
    pub fn calculate(&self, concentrations: &[&Concentration], basis: &dyn WaveEvaluator) -> f64 {
        debug_assert!(self.waves.iter().all(|w| w.rank() == self.receptors.len()));
        let point = self.inputs(concentrations);
        basis.combine(&self.waves, &point)
    }

    /// Derive a mutated function
    ///
    /// Each round independently may duplicate-and-perturb a wave, add a
    /// fresh wave, drop a wave, and drop a receptor. Neither count ever
    /// falls below one.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, deviation: f64) -> Self {
        let mut next = self.clone();

        for _ in 0..MAX_MUTATION_ROUNDS {
            if mutation_event(rng, deviation) {
                let source = rng.gen_range(0..next.waves.len());
                let copy = perturbed_wave(rng, &next.waves[source], deviation);
                next.waves.push(copy);
            }
            if mutation_event(rng, deviation) {
                let rank = next.receptors.len();
                next.waves.push(fresh_wave(rng, rank));
            }
            if next.waves.len() > 1 && mutation_event(rng, deviation) {
                let doomed = rng.gen_range(0..next.waves.len());
                next.waves.remove(doomed);
            }
            if next.receptors.len() > 1 && mutation_event(rng, deviation) {
                let doomed = rng.gen_range(0..next.receptors.len());
                next.remove_dimension(doomed);
            }

            if !coin(rng, CONTINUE_CHANCE) {
                break;
            }
        }

        next
    }

    /// Derive a mutated function that also listens to `receptor`
    pub fn mutate_with_receptor<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        deviation: f64,
        receptor: ReceptorKey,
    ) -> Self {
        if self.receptors.contains(&receptor) {
            return self.mutate(rng, deviation);
        }

        let mut widened = self.clone();
        widened.receptors.push(receptor);
        for wave in &mut widened.waves {
            wave.dimensions.push(fresh_dimension(rng));
        }
        widened.mutate(rng, deviation)
    }

    fn remove_dimension(&mut self, index: usize) {
        self.receptors.remove(index);
        for wave in &mut self.waves {
            wave.dimensions.remove(index);
        }
    }
}

/// Keep a shape parameter strictly positive
fn rescue(shape: f64) -> f64 {
    let shape = shape.abs();
    if shape > MIN_SHAPE {
        shape
    } else {
        MIN_SHAPE
    }
}

fn fresh_dimension<R: Rng + ?Sized>(rng: &mut R) -> WaveDimension {
    WaveDimension {
        center: rng.gen_range(-CENTER_JITTER..CENTER_JITTER),
        width: rng.gen_range(WIDTH_MIN..WIDTH_MAX),
    }
}

fn fresh_wave<R: Rng + ?Sized>(rng: &mut R, rank: usize) -> Wavelet {
    Wavelet {
        frequency: gaussian(rng),
        phase: gaussian(rng) * PI,
        amplitude: gaussian(rng),
        form: rescue(gaussian(rng)),
        dimensions: (0..rank).map(|_| fresh_dimension(rng)).collect(),
    }
}

fn perturbed_wave<R: Rng + ?Sized>(rng: &mut R, source: &Wavelet, deviation: f64) -> Wavelet {
    Wavelet {
        frequency: bounded_walk(rng, source.frequency, deviation),
        phase: bounded_walk(rng, source.phase, deviation),
        amplitude: bounded_walk(rng, source.amplitude, deviation),
        form: rescue(bounded_walk(rng, source.form, deviation)),
        dimensions: source
            .dimensions
            .iter()
            .map(|d| WaveDimension {
                center: bounded_walk(rng, d.center, deviation),
                width: rescue(bounded_walk(rng, d.width, deviation)),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::GaborBasis;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn flat_wave(amplitude: f64, rank: usize) -> Wavelet {
        Wavelet {
            frequency: 0.0,
            phase: 0.0,
            amplitude,
            form: 1.0,
            dimensions: vec![WaveDimension { center: 0.0, width: 1.0 }; rank],
        }
    }

    #[test]
    fn test_from_parts_validates() {
        let r: ReceptorKey = "11".parse().unwrap();
        assert!(ExpressionFunction::from_parts(vec![], vec![flat_wave(1.0, 0)]).is_err());
        assert!(ExpressionFunction::from_parts(vec![r.clone()], vec![]).is_err());
        assert!(ExpressionFunction::from_parts(vec![r.clone()], vec![flat_wave(1.0, 2)]).is_err());
        assert!(ExpressionFunction::from_parts(vec![r.clone(), r.clone()], vec![flat_wave(1.0, 2)]).is_err());
        assert!(ExpressionFunction::from_parts(vec![r], vec![flat_wave(1.0, 1)]).is_ok());
    }

    #[test]
    fn test_deserialize_validates_parts() {
        let f = ExpressionFunction::from_parts(vec!["11".parse().unwrap()], vec![flat_wave(1.0, 1)]).unwrap();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(serde_json::from_str::<ExpressionFunction>(&json).unwrap(), f);

        let no_waves = r#"{"receptors":[{"points":{"0":true}}],"waves":[]}"#;
        assert!(serde_json::from_str::<ExpressionFunction>(no_waves).is_err());

        let misaligned = json.replace(r#""dimensions":[{"center":0.0,"width":1.0}]"#, r#""dimensions":[]"#);
        assert_ne!(misaligned, json);
        assert!(serde_json::from_str::<ExpressionFunction>(&misaligned).is_err());
    }

    #[test]
    fn test_new_follows_generation_rules() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let f = ExpressionFunction::new(&mut rng, "11".parse().unwrap());

        let mut replay = ChaCha8Rng::seed_from_u64(2024);
        let frequency = gaussian(&mut replay);
        let phase = gaussian(&mut replay) * PI;
        let amplitude = gaussian(&mut replay);
        let form = gaussian(&mut replay).abs().max(MIN_SHAPE);
        let center = replay.gen_range(-CENTER_JITTER..CENTER_JITTER);
        let width = replay.gen_range(WIDTH_MIN..WIDTH_MAX);

        let wave = &f.waves()[0];
        assert_eq!(f.waves().len(), 1);
        assert_eq!(wave.frequency, frequency);
        assert_eq!(wave.phase, phase);
        assert_eq!(wave.amplitude, amplitude);
        assert_eq!(wave.form, form);
        assert_eq!(wave.dimensions, vec![WaveDimension { center, width }]);
        assert!(form > 0.0 && (-CENTER_JITTER..CENTER_JITTER).contains(&center));
        assert!((WIDTH_MIN..WIDTH_MAX).contains(&width));
    }

    #[test]
    fn test_dropping_a_receptor_keeps_surviving_columns() {
        let column = |i: usize, w: usize| WaveDimension {
            center: i as f64 + 0.1 * w as f64,
            width: 0.5 + i as f64 + 0.01 * w as f64,
        };
        let waves: Vec<Wavelet> = (0..2)
            .map(|w| Wavelet {
                dimensions: (0..3).map(|i| column(i, w)).collect(),
                ..flat_wave(1.0 + w as f64, 0)
            })
            .collect();
        let receptors: Vec<ReceptorKey> = ["1", "01", "001"].iter().map(|s| s.parse().unwrap()).collect();
        let mut f = ExpressionFunction::from_parts(receptors.clone(), waves).unwrap();

        f.remove_dimension(1);

        assert_eq!(f.receptors(), &[receptors[0].clone(), receptors[2].clone()]);
        for (w, wave) in f.waves().iter().enumerate() {
            assert_eq!(wave.dimensions, vec![column(0, w), column(2, w)]);
            assert_eq!(wave.amplitude, 1.0 + w as f64);
        }
    }

    #[test]
    fn test_inputs_sum_matching_concentrations() {
        let f = ExpressionFunction::from_parts(
            vec!["11".parse().unwrap(), "00".parse().unwrap()],
            vec![flat_wave(1.0, 2)],
        )
        .unwrap();
        let a = Concentration::new("0110".parse().unwrap(), 2.0);
        let b = Concentration::new("111".parse().unwrap(), 0.5);
        let c = Concentration::new("1010".parse().unwrap(), 9.0);

        assert!(f.receives(&a.signal));
        assert!(!f.receives(&c.signal));
        assert_eq!(f.inputs(&[&a, &b, &c]), vec![2.5, 0.0]);
    }

    #[test]
    fn test_calculate_without_input_is_amplitude_sum() {
        let f = ExpressionFunction::from_parts(
            vec!["1".parse().unwrap()],
            vec![flat_wave(1.5, 1), flat_wave(0.25, 1)],
        )
        .unwrap();
        assert!((f.calculate(&[], &GaborBasis) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_preserves_minimums_and_alignment() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut f = ExpressionFunction::new(&mut rng, "1x1".parse().unwrap());
        let pool: Vec<ReceptorKey> = ["0", "11", "1x0", "0001"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();

        for round in 0..300 {
            f = if round % 3 == 0 {
                let r = pool[round % pool.len()].clone();
                f.mutate_with_receptor(&mut rng, 2.0, r)
            } else {
                f.mutate(&mut rng, 2.0)
            };
            assert!(!f.waves().is_empty());
            assert!(!f.receptors().is_empty());
            for wave in f.waves() {
                assert_eq!(wave.rank(), f.receptors().len());
                assert!(wave.form > 0.0);
                assert!(wave.dimensions.iter().all(|d| d.width > 0.0));
            }
        }
    }

    #[test]
    fn test_new_receptor_widens_waves() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let f = ExpressionFunction::new(&mut rng, "1".parse().unwrap());
        let widened = f.mutate_with_receptor(&mut rng, 0.0, "01".parse().unwrap());

        assert_eq!(f.receptors().len(), 1);
        assert_eq!(widened.receptors().len(), 2);
        assert_eq!(widened.waves().len(), 1);
        assert_eq!(widened.waves()[0].dimensions[0], f.waves()[0].dimensions[0]);
    }

    #[test]
    fn test_mutate_is_copy_on_write() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let f = ExpressionFunction::new(&mut rng, "10".parse().unwrap());
        let snapshot = f.clone();
        let _ = f.mutate(&mut rng, 5.0);
        assert_eq!(f, snapshot);
    }
}
