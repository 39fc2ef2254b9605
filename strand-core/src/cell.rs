//! # Cell - Nucleus Plus Local Chemistry
//!
//! A cell owns its nucleus and one concentration per internally expressed
//! signal. Wiring binds each of those concentrations straight back into the
//! nucleus, so a gene's output is visible to every gene of the same cell:
//!
//! ```text
//!   signal gene ──writes──▶ concentration ──binds──▶ receptor of any gene
//!        ▲                                                   │
//!        └──────────────── next tick reads ◀─────────────────┘
//! ```
//!
//! One `step` is a full two-phase tick: every gene computes from the
//! concentrations as they stood, then every gene commits and writes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::concentration::{Concentration, ConcentrationStore};
use crate::error::StrandResult;
use crate::gene::GeneKind;
use crate::key::SignalKey;
use crate::nucleus::Nucleus;
use crate::wave::WaveEvaluator;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    nucleus: Nucleus,
    concentrations: ConcentrationStore,
}

impl Cell {
    /// Wrap a nucleus and wire its internal signals back into it
    pub fn new(nucleus: Nucleus) -> Self {
        let mut cell = Self {
            nucleus,
            concentrations: ConcentrationStore::new(),
        };
        cell.wire();
        cell
    }

    /// Rebuild local concentrations and bindings from the nucleus
    ///
    /// Signals that survive keep their accumulated value.
    fn wire(&mut self) {
        let previous = std::mem::take(&mut self.concentrations);
        self.nucleus.clear_bindings();

        for signal in self.nucleus.expressed_signals(false) {
            let value = previous
                .find(&signal)
                .and_then(|id| previous.get(id))
                .map_or(0.0, |c| c.value);
            self.concentrations.insert(Concentration::new(signal, value));
        }

        for (id, concentration) in self.concentrations.iter() {
            if !self.nucleus.bind(id, concentration, false) {
                trace!("concentration {} found no receptor", concentration.signal);
            }
        }
        debug!("wired {} local concentrations", self.concentrations.len());
    }

    #[inline]
    pub fn nucleus(&self) -> &Nucleus {
        &self.nucleus
    }

    /// Direct access for drivers; bindings are not re-derived afterwards
    #[inline]
    pub fn nucleus_mut(&mut self) -> &mut Nucleus {
        &mut self.nucleus
    }

    #[inline]
    pub fn concentrations(&self) -> &ConcentrationStore {
        &self.concentrations
    }

    /// Current level of a local signal
    pub fn concentration(&self, signal: &SignalKey) -> Option<f64> {
        self.concentrations
            .find(signal)
            .and_then(|id| self.concentrations.get(id))
            .map(|c| c.value)
    }

    /// Boundary input. Refused until an external injection driver exists.
    pub fn bind(&mut self, concentration: &Concentration) -> bool {
        trace!("refused boundary concentration {}", concentration.signal);
        false
    }

    pub fn pre_tick(&mut self, basis: &dyn WaveEvaluator) {
        self.nucleus.pre_tick(&self.concentrations, basis);
    }

    pub fn tick(&mut self) {
        self.nucleus.tick(&mut self.concentrations);
    }

    /// Both phases of one simulation step
    pub fn step(&mut self, basis: &dyn WaveEvaluator) {
        self.pre_tick(basis);
        self.tick();
    }

    /// Committed activity of every outward boundary gene
    pub fn external_outputs(&self) -> Vec<(SignalKey, f64)> {
        self.nucleus
            .genes()
            .filter_map(|gene| match gene.kind() {
                GeneKind::ExternalSignal { output, outward: true } => {
                    Some((output.signal.clone(), gene.expression_activity()))
                }
                _ => None,
            })
            .collect()
    }

    /// Mutate the nucleus, then re-wire local concentrations
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StrandResult<()> {
        self.nucleus.mutate(rng)?;
        self.wire();
        Ok(())
    }
}
