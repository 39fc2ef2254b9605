//! # Nucleus
//!
//! Ordered list of chromosomes. Every call fans out in order.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chromosome::Chromosome;
use crate::concentration::{Concentration, ConcentrationId, ConcentrationStore};
use crate::config::GenomeConfig;
use crate::error::StrandResult;
use crate::gene::Gene;
use crate::key::SignalKey;
use crate::wave::WaveEvaluator;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Nucleus {
    chromosomes: Vec<Chromosome>,
}

impl Nucleus {
    pub fn new(chromosomes: Vec<Chromosome>) -> Self {
        Self { chromosomes }
    }

    /// Randomly grown chromosomes, as many as the config asks for
    pub fn random<R: Rng + ?Sized>(rng: &mut R, config: &GenomeConfig) -> Self {
        let chromosomes = (0..config.chromosomes)
            .map(|_| Chromosome::random(rng, config.mutability))
            .collect();
        Self::new(chromosomes)
    }

    #[inline]
    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    /// Every gene, chromosome by chromosome, left chromatid first
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.chromosomes
            .iter()
            .flat_map(|c| c.chromatids())
            .flat_map(|c| c.genes().iter())
    }

    pub fn expressed_signals(&self, external: bool) -> Vec<SignalKey> {
        let mut signals: Vec<SignalKey> = Vec::new();
        for signal in self.chromosomes.iter().flat_map(|c| c.expressed_signals(external)) {
            if !signals.contains(&signal) {
                signals.push(signal);
            }
        }
        signals
    }

    pub fn bind(&mut self, id: ConcentrationId, concentration: &Concentration, is_external: bool) -> bool {
        self.chromosomes
            .iter_mut()
            .fold(false, |accepted, c| c.bind(id, concentration, is_external) | accepted)
    }

    pub fn clear_bindings(&mut self) {
        for chromosome in &mut self.chromosomes {
            chromosome.clear_bindings();
        }
    }

    pub fn pre_tick(&mut self, store: &ConcentrationStore, basis: &dyn WaveEvaluator) {
        for chromosome in &mut self.chromosomes {
            chromosome.pre_tick(store, basis);
        }
    }

    pub fn tick(&mut self, store: &mut ConcentrationStore) {
        for chromosome in &mut self.chromosomes {
            chromosome.tick(store);
        }
    }

    /// Mutate every chromosome without a key pool
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StrandResult<()> {
        for chromosome in &mut self.chromosomes {
            chromosome.mutate(rng, None)?;
        }
        Ok(())
    }
}
