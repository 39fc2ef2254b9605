//! # Genes
//!
//! A gene binds concentrations, evaluates its expression function over
//! them, and commits the result as its activity. Activity is double
//! buffered so a tick behaves as a simultaneous update:
//!
//! ```text
//! pre_tick:  pending = f(bound concentrations)        (reads only)
//! tick:      current = pending + pending · promotion  (writes)
//! ```
//!
//! Three variants share that lifecycle:
//! - **Promoter**: scales the gene `distance` slots further along its chromatid
//! - **Signal**: writes its activity into the concentration of its output signal
//! - **ExternalSignal**: a signal gene sitting on the cell boundary, either
//!   exporting (outward) or importing (inward)

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::concentration::{Concentration, ConcentrationId, ConcentrationStore};
use crate::expression::ExpressionFunction;
use crate::key::{Key, SignalKey};
use crate::mutation::{bounded_walk, mutate_mutability, mutation_event};
use crate::wave::WaveEvaluator;

/// Output side of a signal-producing gene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    /// Species this gene produces
    pub signal: SignalKey,
    /// Concentration the activity is written into, once bound
    pub target: Option<ConcentrationId>,
}

impl SignalOutput {
    pub fn new(signal: SignalKey) -> Self {
        Self { signal, target: None }
    }
}

/// Variant-specific gene data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeneKind {
    Promoter { distance: i64 },
    Signal(SignalOutput),
    ExternalSignal { output: SignalOutput, outward: bool },
}

/// One gene of a chromatid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    kind: GeneKind,
    current_activity: f64,
    pending_activity: f64,
    mutability: f64,
    expression: ExpressionFunction,
    bound: BTreeSet<ConcentrationId>,
}

impl Gene {
    fn with_kind(kind: GeneKind, expression: ExpressionFunction, mutability: f64) -> Self {
        Self {
            kind,
            current_activity: 0.0,
            pending_activity: 0.0,
            mutability,
            expression,
            bound: BTreeSet::new(),
        }
    }

    /// Promoter acting on the gene `distance` slots away
    pub fn promoter(expression: ExpressionFunction, distance: i64, mutability: f64) -> Self {
        Self::with_kind(GeneKind::Promoter { distance }, expression, mutability)
    }

    /// Gene producing a cell-local signal
    pub fn signal(expression: ExpressionFunction, output: SignalKey, mutability: f64) -> Self {
        Self::with_kind(GeneKind::Signal(SignalOutput::new(output)), expression, mutability)
    }

    /// Gene producing a signal on the cell boundary
    pub fn external(
        expression: ExpressionFunction,
        output: SignalKey,
        outward: bool,
        mutability: f64,
    ) -> Self {
        Self::with_kind(
            GeneKind::ExternalSignal {
                output: SignalOutput::new(output),
                outward,
            },
            expression,
            mutability,
        )
    }

    #[inline]
    pub fn kind(&self) -> &GeneKind {
        &self.kind
    }

    #[inline]
    pub fn expression(&self) -> &ExpressionFunction {
        &self.expression
    }

    #[inline]
    pub fn mutability(&self) -> f64 {
        self.mutability
    }

    /// Committed activity from the last tick
    #[inline]
    pub fn expression_activity(&self) -> f64 {
        self.current_activity
    }

    /// Activity computed by the last pre-tick, not yet committed
    #[inline]
    pub fn pending_activity(&self) -> f64 {
        self.pending_activity
    }

    pub fn bound_concentrations(&self) -> impl Iterator<Item = ConcentrationId> + '_ {
        self.bound.iter().copied()
    }

    #[inline]
    pub fn is_promoter(&self) -> bool {
        matches!(self.kind, GeneKind::Promoter { .. })
    }

    /// Target offset of a promoter
    pub fn promoter_distance(&self) -> Option<i64> {
        match self.kind {
            GeneKind::Promoter { distance } => Some(distance),
            _ => None,
        }
    }

    /// Output species of signal and external signal genes
    pub fn output_signal(&self) -> Option<&SignalKey> {
        match &self.kind {
            GeneKind::Promoter { .. } => None,
            GeneKind::Signal(output) | GeneKind::ExternalSignal { output, .. } => Some(&output.signal),
        }
    }

    /// Boundary direction of an external signal gene
    pub fn is_outward(&self) -> Option<bool> {
        match self.kind {
            GeneKind::ExternalSignal { outward, .. } => Some(outward),
            _ => None,
        }
    }

    /// Concentration this gene writes into, if any
    pub fn target(&self) -> Option<ConcentrationId> {
        match &self.kind {
            GeneKind::Signal(output) | GeneKind::ExternalSignal { output, outward: false } => output.target,
            _ => None,
        }
    }

    /// Output that feeds a local concentration (outward genes export instead)
    fn local_output_mut(&mut self) -> Option<&mut SignalOutput> {
        match &mut self.kind {
            GeneKind::Signal(output) | GeneKind::ExternalSignal { output, outward: false } => Some(output),
            _ => None,
        }
    }

    /// Offer a concentration to this gene
    ///
    /// Internal concentrations are accepted when a receptor binds them.
    /// External ones are refused by every variant. A signal gene also
    /// claims the concentration of its own output as its write target.
    pub fn bind(&mut self, id: ConcentrationId, concentration: &Concentration, is_external: bool) -> bool {
        if is_external {
            return false;
        }

        let received = self.expression.receives(&concentration.signal);
        if received {
            self.bound.insert(id);
        }

        let mut targeted = false;
        if let Some(output) = self.local_output_mut() {
            if output.signal == concentration.signal {
                output.target = Some(id);
                targeted = true;
            }
        }

        received || targeted
    }

    /// Forget every binding
    pub fn clear_bindings(&mut self) {
        self.bound.clear();
        match &mut self.kind {
            GeneKind::Signal(output) | GeneKind::ExternalSignal { output, .. } => output.target = None,
            GeneKind::Promoter { .. } => {}
        }
    }

    /// Phase one: compute pending activity from bound concentrations
    pub fn pre_tick(&mut self, store: &ConcentrationStore, basis: &dyn WaveEvaluator) {
        let inputs: Vec<&Concentration> = self.bound.iter().filter_map(|&id| store.get(id)).collect();
        self.pending_activity = self.expression.calculate(&inputs, basis);
    }

    /// Phase two: commit activity and write it back to the output concentration
    pub fn tick(&mut self, promotion: f64, store: &mut ConcentrationStore) {
        self.current_activity = self.pending_activity + self.pending_activity * promotion;
        if let Some(target) = self.target() {
            store.add(target, self.current_activity);
        }
    }

    /// Mutate expression, variant data and mutability
    ///
    /// Activity is reset. With a non-empty key pool the expression function
    /// may pick up a receptor drawn from it.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, pool: Option<&[Key]>) {
        self.current_activity = 0.0;
        self.pending_activity = 0.0;
        let deviation = self.mutability;

        self.expression = match pool {
            Some(keys) if !keys.is_empty() && mutation_event(rng, deviation) => {
                let key = keys[rng.gen_range(0..keys.len())].clone();
                self.expression.mutate_with_receptor(rng, deviation, key.into())
            }
            _ => self.expression.mutate(rng, deviation),
        };

        match &mut self.kind {
            GeneKind::Promoter { distance } => {
                if mutation_event(rng, deviation) {
                    let shift = bounded_walk(rng, 0.0, deviation).round() as i64;
                    *distance = distance.saturating_add(shift);
                }
            }
            GeneKind::ExternalSignal { outward, .. } => {
                if mutation_event(rng, deviation) {
                    *outward = !*outward;
                }
            }
            GeneKind::Signal(_) => {}
        }

        if mutation_event(rng, self.mutability) {
            let next = mutate_mutability(rng, self.mutability);
            tracing::trace!("gene mutability {} -> {}", self.mutability, next);
            self.mutability = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::{GaborBasis, WaveDimension, Wavelet};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn constant(receptor: &str, amplitude: f64) -> ExpressionFunction {
        let wave = Wavelet {
            frequency: 0.0,
            phase: 0.0,
            amplitude,
            form: 1.0,
            dimensions: vec![WaveDimension { center: 0.0, width: 1.0 }],
        };
        ExpressionFunction::from_parts(vec![receptor.parse().unwrap()], vec![wave]).unwrap()
    }

    fn concentration(signal: &str, value: f64) -> Concentration {
        Concentration::new(signal.parse().unwrap(), value)
    }

    #[test]
    fn test_bind_is_idempotent_and_internal_only() {
        let mut gene = Gene::promoter(constant("11", 1.0), 1, 1.0);
        let c = concentration("0110", 1.0);

        assert!(!gene.bind(ConcentrationId(0), &c, true));
        assert!(gene.bind(ConcentrationId(0), &c, false));
        assert!(gene.bind(ConcentrationId(0), &c, false));
        assert_eq!(gene.bound_concentrations().count(), 1);

        assert!(!gene.bind(ConcentrationId(1), &concentration("0101", 1.0), false));
    }

    #[test]
    fn test_external_input_is_refused_by_every_variant() {
        let c = concentration("11", 1.0);
        let mut genes = vec![
            Gene::external(constant("11", 1.0), "11".parse().unwrap(), false, 1.0),
            Gene::external(constant("11", 1.0), "0".parse().unwrap(), true, 1.0),
            Gene::signal(constant("11", 1.0), "11".parse().unwrap(), 1.0),
            Gene::promoter(constant("11", 1.0), 1, 1.0),
        ];

        for gene in &mut genes {
            assert!(!gene.bind(ConcentrationId(0), &c, true));
            assert_eq!(gene.bound_concentrations().count(), 0);
            assert_eq!(gene.target(), None);
            assert!(gene.bind(ConcentrationId(0), &c, false));
        }
    }

    #[test]
    fn test_signal_gene_claims_own_output() {
        let mut gene = Gene::signal(constant("000", 1.0), "101".parse().unwrap(), 1.0);
        assert!(gene.bind(ConcentrationId(3), &concentration("101", 0.0), false));
        assert_eq!(gene.target(), Some(ConcentrationId(3)));
        assert_eq!(gene.bound_concentrations().count(), 0);

        gene.clear_bindings();
        assert_eq!(gene.target(), None);
    }

    #[test]
    fn test_outward_gene_never_writes_locally() {
        let mut gene = Gene::external(constant("0000", 1.0), "101".parse().unwrap(), true, 1.0);
        assert!(!gene.bind(ConcentrationId(0), &concentration("101", 0.0), false));
        assert_eq!(gene.target(), None);
    }

    #[test]
    fn test_tick_applies_promotion_and_writes_back() {
        let mut store = ConcentrationStore::new();
        let id = store.insert(concentration("101", 0.0));
        let mut gene = Gene::signal(constant("000", 2.0), "101".parse().unwrap(), 1.0);
        gene.bind(id, store.get(id).unwrap(), false);

        gene.pre_tick(&store, &GaborBasis);
        assert_eq!(gene.expression_activity(), 0.0);
        assert!((gene.pending_activity() - 2.0).abs() < 1e-12);

        gene.tick(0.5, &mut store);
        assert!((gene.expression_activity() - 3.0).abs() < 1e-12);
        assert!((store.get(id).unwrap().value - 3.0).abs() < 1e-12);
    }

    fn self_loop_run(seed: u64, ticks: usize) -> (Vec<f64>, f64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let output: SignalKey = "1101".parse().unwrap();
        let expression = ExpressionFunction::new(&mut rng, "11".parse().unwrap());
        let mut gene = Gene::signal(expression, output.clone(), 1.0);

        let mut store = ConcentrationStore::new();
        let id = store.insert(Concentration::new(output, 0.0));
        assert!(gene.bind(id, store.get(id).unwrap(), false));
        assert_eq!(gene.bound_concentrations().collect::<Vec<_>>(), vec![id]);

        let mut activity = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            gene.pre_tick(&store, &GaborBasis);
            gene.tick(0.0, &mut store);
            activity.push(gene.expression_activity());
        }
        (activity, store.get(id).unwrap().value)
    }

    #[test]
    fn test_self_loop_activity_sequence() {
        let output: SignalKey = "1101".parse().unwrap();
        let mut gene = Gene::signal(constant("11", 1.0), output.clone(), 1.0);
        let mut store = ConcentrationStore::new();
        let id = store.insert(Concentration::new(output, 0.0));
        assert!(gene.bind(id, store.get(id).unwrap(), false));

        // a(t) = exp(-x(t)²), x(t + 1) = x(t) + a(t)
        let expected = [
            1.0,
            0.36787944117144233,
            0.15395511723404195,
            0.09866939880116495,
            0.07236495995106071,
        ];
        for want in expected {
            gene.pre_tick(&store, &GaborBasis);
            gene.tick(0.0, &mut store);
            assert!((gene.expression_activity() - want).abs() < 1e-12);
        }
        assert!((store.get(id).unwrap().value - 1.6928689171577098).abs() < 1e-12);
    }

    #[test]
    fn test_self_loop_is_reproducible() {
        let (first, level) = self_loop_run(2024, 25);
        let (second, _) = self_loop_run(2024, 25);
        assert_eq!(first, second);
        assert!(first.iter().all(|a| a.is_finite()));

        let total: f64 = first.iter().sum();
        assert!((level - total).abs() < 1e-9);
    }

    #[test]
    fn test_mutate_resets_activity_and_keeps_variant() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut store = ConcentrationStore::new();
        let id = store.insert(concentration("11", 1.0));
        let mut gene = Gene::external(constant("11", 1.0), "0".parse().unwrap(), false, 2.0);
        gene.bind(id, store.get(id).unwrap(), false);
        gene.pre_tick(&store, &GaborBasis);
        gene.tick(0.0, &mut store);

        let parent = gene.clone();
        let pool: Vec<Key> = vec!["1x1".parse().unwrap()];
        gene.mutate(&mut rng, Some(pool.as_slice()));

        assert_eq!(gene.expression_activity(), 0.0);
        assert_eq!(gene.pending_activity(), 0.0);
        assert!(gene.is_outward().is_some());
        assert!(gene.mutability() > 0.0);
        assert_ne!(parent.expression_activity(), 0.0);
    }
}
