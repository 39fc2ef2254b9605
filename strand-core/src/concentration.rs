//! # Concentrations
//!
//! The only shared mutable state in a cell. Genes never hold a
//! concentration directly; they hold a `ConcentrationId` into the store
//! owned by the cell. Phase one of a tick borrows the store immutably,
//! phase two mutably, so no gene can observe another gene's write from the
//! same tick.

use serde::{Deserialize, Serialize};

use crate::key::SignalKey;

/// Index of a concentration inside its store
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConcentrationId(pub usize);

/// Amount of one signal species
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub signal: SignalKey,
    pub value: f64,
}

impl Concentration {
    pub fn new(signal: SignalKey, value: f64) -> Self {
        Self { signal, value }
    }
}

/// Indexed pool of concentrations
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConcentrationStore {
    entries: Vec<Concentration>,
}

impl ConcentrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a concentration and return its id
    pub fn insert(&mut self, concentration: Concentration) -> ConcentrationId {
        self.entries.push(concentration);
        ConcentrationId(self.entries.len() - 1)
    }

    #[inline]
    pub fn get(&self, id: ConcentrationId) -> Option<&Concentration> {
        self.entries.get(id.0)
    }

    /// Id of the concentration tracking `signal`, if any
    pub fn find(&self, signal: &SignalKey) -> Option<ConcentrationId> {
        self.entries
            .iter()
            .position(|c| &c.signal == signal)
            .map(ConcentrationId)
    }

    /// Accumulate `amount` into a concentration; unknown ids are ignored
    pub fn add(&mut self, id: ConcentrationId, amount: f64) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.value += amount;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConcentrationId, &Concentration)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, c)| (ConcentrationId(i), c))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
