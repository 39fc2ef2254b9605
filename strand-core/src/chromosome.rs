//! # Chromosome - A Pair of Chromatids
//!
//! Ticks and bindings fan out to both chromatids. Crossover exchanges the
//! segments on the same side of both centromeres, so gene count summed
//! over the pair is conserved.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chromatid::Chromatid;
use crate::concentration::{Concentration, ConcentrationId, ConcentrationStore};
use crate::error::StrandResult;
use crate::key::{Key, SignalKey};
use crate::mutation::{bounded_walk, mutate_mutability, mutation_event};
use crate::wave::WaveEvaluator;

/// Two chromatids and the rate at which they recombine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    left: Chromatid,
    right: Chromatid,
    mutability: f64,
}

impl Chromosome {
    pub fn new(left: Chromatid, right: Chromatid, mutability: f64) -> Self {
        Self {
            left,
            right,
            mutability,
        }
    }

    /// Two independently grown chromatids
    pub fn random<R: Rng + ?Sized>(rng: &mut R, mutability: f64) -> Self {
        let left = Chromatid::random(rng, mutability);
        let right = Chromatid::random(rng, mutability);
        Self::new(left, right, mutability)
    }

    #[inline]
    pub fn left(&self) -> &Chromatid {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &Chromatid {
        &self.right
    }

    pub fn chromatids(&self) -> [&Chromatid; 2] {
        [&self.left, &self.right]
    }

    #[inline]
    pub fn mutability(&self) -> f64 {
        self.mutability
    }

    /// Genes across both chromatids
    pub fn gene_count(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn expressed_signals(&self, external: bool) -> Vec<SignalKey> {
        let mut signals = self.left.expressed_signals(external);
        for signal in self.right.expressed_signals(external) {
            if !signals.contains(&signal) {
                signals.push(signal);
            }
        }
        signals
    }

    /// Offer to both chromatids; true if either accepted
    pub fn bind(&mut self, id: ConcentrationId, concentration: &Concentration, is_external: bool) -> bool {
        let left = self.left.bind(id, concentration, is_external);
        let right = self.right.bind(id, concentration, is_external);
        left || right
    }

    pub fn clear_bindings(&mut self) {
        self.left.clear_bindings();
        self.right.clear_bindings();
    }

    pub fn pre_tick(&mut self, store: &ConcentrationStore, basis: &dyn WaveEvaluator) {
        self.left.pre_tick(store, basis);
        self.right.pre_tick(store, basis);
    }

    pub fn tick(&mut self, store: &mut ConcentrationStore) {
        self.left.tick(store);
        self.right.tick(store);
    }

    /// Reciprocal segment exchange around the centromeres
    ///
    /// Picks the start side or end side with equal chance, bounds the cut
    /// by the shorter arm on that side, and draws the magnitude from a
    /// bounded walk scaled by `deviation`. Returns the crossover point, or
    /// `None` when no exchange happened.
    pub fn crossover<R: Rng + ?Sized>(&mut self, rng: &mut R, deviation: f64) -> StrandResult<Option<i64>> {
        let start_side = rng.gen_bool(0.5);
        let arm = |c: &Chromatid| {
            if start_side {
                c.centromere()
            } else {
                c.len() as i64 - c.centromere()
            }
        };
        let bound = arm(&self.left).min(arm(&self.right)).max(0);

        let magnitude = (bounded_walk(rng, 0.0, deviation).abs().round() as i64).min(bound);
        let point = if start_side { -magnitude } else { magnitude };

        // Extraction answers boundary cuts with an empty segment; exchanging
        // there would drop genes instead of moving them.
        let consistent = |c: &Chromatid| c.removal_len(point) == Some(c.crossover(point).len());
        if !consistent(&self.left) || !consistent(&self.right) {
            debug!("crossover at {} skipped: degenerate cut", point);
            return Ok(None);
        }

        let from_left = self.left.crossover(point);
        let from_right = self.right.crossover(point);
        if from_left.is_empty() && from_right.is_empty() {
            return Ok(None);
        }

        self.left.splice(from_right, point)?;
        self.right.splice(from_left, point)?;
        debug!(
            "crossover at {}: left {} genes, right {} genes",
            point,
            self.left.len(),
            self.right.len()
        );
        Ok(Some(point))
    }

    /// Possibly recombine, mutate both chromatids, possibly evolve mutability
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, pool: Option<&[Key]>) -> StrandResult<()> {
        if mutation_event(rng, self.mutability) {
            self.crossover(rng, self.mutability)?;
        }

        self.left.mutate(rng, pool);
        self.right.mutate(rng, pool);

        if mutation_event(rng, self.mutability) {
            self.mutability = mutate_mutability(rng, self.mutability);
        }
        Ok(())
    }
}
