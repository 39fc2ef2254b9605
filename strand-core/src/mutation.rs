//! # Mutation Policy - Shared Stochastic Primitives
//!
//! Every evolvable layer (gene, chromatid, chromosome) decides *whether* to
//! mutate through the same gate, and evolves its own rate through the same
//! rule:
//!
//! ```text
//! mutation_event(m)    = Bernoulli(tanh(|m|))
//! mutate_mutability(m) = m + δ            if δ > 0
//!                        m · exp(δ / m)   otherwise   (never exactly 0)
//!                        where δ = bounded_walk(0, m)
//! ```
//!
//! Larger `|m|` monotonically raises the firing chance, saturating at 1.

use rand::Rng;
use rand_distr::StandardNormal;

/// How many spreads a bounded walk may stray from its center
pub const WALK_BOUND: f64 = 3.0;

/// Standard Gaussian draw
#[inline]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

/// Biased coin that passes with the given probability
///
/// NaN probabilities never pass.
#[inline]
pub fn coin<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

/// Gaussian step around `center`, clamped to `center ± WALK_BOUND·spread`
pub fn bounded_walk<R: Rng + ?Sized>(rng: &mut R, center: f64, spread: f64) -> f64 {
    let spread = spread.abs();
    let limit = WALK_BOUND * spread;
    let step = gaussian(rng) * spread;
    if step.is_nan() {
        return center;
    }
    center + step.clamp(-limit, limit)
}

/// Gate shared by every layer: fires with probability `tanh(|mutability|)`
#[inline]
pub fn mutation_event<R: Rng + ?Sized>(rng: &mut R, mutability: f64) -> bool {
    coin(rng, mutability.abs().tanh())
}

/// Evolve a mutability rate
///
/// Growth is additive, shrinkage multiplicative. The result is always a
/// strictly positive finite number so `mutation_event` never freezes.
pub fn mutate_mutability<R: Rng + ?Sized>(rng: &mut R, mutability: f64) -> f64 {
    let spread = mutability.abs().max(f64::MIN_POSITIVE);
    let delta = bounded_walk(rng, 0.0, spread);

    let next = if delta > 0.0 {
        mutability + delta
    } else {
        mutability * (delta / spread).exp()
    };

    if next > 0.0 {
        next.min(f64::MAX)
    } else {
        f64::MIN_POSITIVE
    }
}
