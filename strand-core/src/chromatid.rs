//! # Chromatid - Ordered Gene Sequence
//!
//! Position in the sequence matters twice: a promoter at index `i` with
//! distance `d` promotes the gene at `i + d`, and crossover cuts the
//! sequence at an offset from the centromere.
//!
//! ## Crossover sign convention
//!
//! ```text
//!            centromere
//!                |
//!   [ g0  g1  g2 | g3  g4  g5 ]
//!        point -2  ^ index 1        negative: the prefix  [0, index) moves
//!                 point +1 ^ 4      positive: the suffix  [index, len) moves
//! ```
//!
//! `index = point + centromere`. Extraction (`crossover`) is tolerant and
//! answers boundary or out-of-range queries with an empty segment; the
//! splice is strict and rejects an index outside `0..=len`.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::concentration::{Concentration, ConcentrationId, ConcentrationStore};
use crate::error::{StrandError, StrandResult};
use crate::expression::ExpressionFunction;
use crate::gene::{Gene, GeneKind};
use crate::key::{Key, SignalKey};
use crate::mutation::{coin, mutate_mutability, mutation_event};
use crate::wave::WaveEvaluator;
use crate::{KEY_SPAN, MAX_MUTATION_ROUNDS, PROMOTER_REACH, SYNTHETIC_KEY_POINTS};

/// Ordered gene sequence with a centromere
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chromatid {
    genes: Vec<Gene>,
    centromere: i64,
    mutability: f64,
}

impl Chromatid {
    pub fn from_genes(genes: Vec<Gene>, centromere: i64, mutability: f64) -> Self {
        Self {
            genes,
            centromere,
            mutability,
        }
    }

    /// Grow a chromatid by mutation alone
    ///
    /// Mutates until at least one gene exists, then keeps mutating while
    /// the mutability gate passes.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, mutability: f64) -> Self {
        let mut chromatid = Self::from_genes(Vec::new(), 0, mutability);

        for _ in 0..MAX_MUTATION_ROUNDS {
            if !chromatid.genes.is_empty() {
                break;
            }
            chromatid.mutate(rng, None);
        }
        if chromatid.genes.is_empty() {
            chromatid.insert_random_gene(rng, None);
        }

        for _ in 0..MAX_MUTATION_ROUNDS {
            if !mutation_event(rng, chromatid.mutability) {
                break;
            }
            chromatid.mutate(rng, None);
        }

        chromatid
    }

    #[inline]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[inline]
    pub fn centromere(&self) -> i64 {
        self.centromere
    }

    #[inline]
    pub fn mutability(&self) -> f64 {
        self.mutability
    }

    pub fn promoter_genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter().filter(|g| g.is_promoter())
    }

    pub fn local_signal_genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter().filter(|g| matches!(g.kind(), GeneKind::Signal(_)))
    }

    pub fn external_signal_genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes
            .iter()
            .filter(|g| matches!(g.kind(), GeneKind::ExternalSignal { .. }))
    }

    /// Output signals, deduplicated in sequence order
    ///
    /// The internal view holds local signal genes and inward boundary
    /// genes; the external view holds outward boundary genes only.
    pub fn expressed_signals(&self, external: bool) -> Vec<SignalKey> {
        let mut signals: Vec<SignalKey> = Vec::new();
        for gene in &self.genes {
            let expressed = match gene.kind() {
                GeneKind::Signal(output) if !external => Some(&output.signal),
                GeneKind::ExternalSignal { output, outward } if *outward == external => Some(&output.signal),
                _ => None,
            };
            if let Some(signal) = expressed {
                if !signals.contains(signal) {
                    signals.push(signal.clone());
                }
            }
        }
        signals
    }

    /// Offer a concentration to every gene; true if any accepted
    pub fn bind(&mut self, id: ConcentrationId, concentration: &Concentration, is_external: bool) -> bool {
        self.genes
            .iter_mut()
            .fold(false, |accepted, gene| gene.bind(id, concentration, is_external) | accepted)
    }

    pub fn clear_bindings(&mut self) {
        for gene in &mut self.genes {
            gene.clear_bindings();
        }
    }

    pub fn pre_tick(&mut self, store: &ConcentrationStore, basis: &dyn WaveEvaluator) {
        for gene in &mut self.genes {
            gene.pre_tick(store, basis);
        }
    }

    /// Promotion landing on each index, summed over promoters
    ///
    /// Uses committed promoter activity. Targets outside the sequence are
    /// dropped.
    pub fn promotions(&self) -> HashMap<usize, f64> {
        let mut promotions = HashMap::new();
        let len = self.genes.len() as i64;
        for (index, gene) in self.genes.iter().enumerate() {
            if let Some(distance) = gene.promoter_distance() {
                let target = (index as i64).saturating_add(distance);
                if (0..len).contains(&target) {
                    *promotions.entry(target as usize).or_insert(0.0) += gene.expression_activity();
                }
            }
        }
        promotions
    }

    pub fn tick(&mut self, store: &mut ConcentrationStore) {
        let promotions = self.promotions();
        for (index, gene) in self.genes.iter_mut().enumerate() {
            let promotion = promotions.get(&index).copied().unwrap_or(0.0);
            gene.tick(promotion, store);
        }
    }

    #[inline]
    fn cut_index(&self, point: i64) -> i64 {
        point.saturating_add(self.centromere)
    }

    /// Copy of the segment a crossover at `point` would move
    pub fn crossover(&self, point: i64) -> Vec<Gene> {
        let index = self.cut_index(point);
        let len = self.genes.len() as i64;
        if index <= 0 || index >= len {
            return Vec::new();
        }

        let index = index as usize;
        if point < 0 {
            self.genes[..index].to_vec()
        } else {
            self.genes[index..].to_vec()
        }
    }

    /// How many genes `splice` at `point` would replace
    pub fn removal_len(&self, point: i64) -> Option<usize> {
        let index = self.cut_index(point);
        let len = self.genes.len();
        if index < 0 || index > len as i64 {
            return None;
        }
        let index = index as usize;
        Some(if point < 0 { index } else { len - index })
    }

    /// Replace the segment at `point` with `segment`, returning what was cut
    ///
    /// A negative point swaps the prefix, which moves the centromere by
    /// `segment.len() - index`. A non-negative point swaps the suffix.
    pub fn splice(&mut self, segment: Vec<Gene>, point: i64) -> StrandResult<Vec<Gene>> {
        let index = self.cut_index(point);
        let len = self.genes.len();
        if index < 0 || index > len as i64 {
            return Err(StrandError::CrossoverOutOfRange { point, index, len });
        }
        let index = index as usize;
        let inserted = segment.len();

        let removed = if point < 0 {
            let suffix = self.genes.split_off(index);
            let removed = std::mem::replace(&mut self.genes, segment);
            self.genes.extend(suffix);
            self.centromere -= index as i64 - inserted as i64;
            removed
        } else {
            let removed = self.genes.split_off(index);
            self.genes.extend(segment);
            removed
        };

        debug!(
            "spliced {} genes at point {} (removed {}, centromere {})",
            inserted,
            point,
            removed.len(),
            self.centromere
        );
        Ok(removed)
    }

    /// Possibly insert a gene, mutate every gene, possibly evolve mutability
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, pool: Option<&[Key]>) {
        if mutation_event(rng, self.mutability) {
            self.insert_random_gene(rng, pool);
        }

        for gene in &mut self.genes {
            gene.mutate(rng, pool);
        }

        if mutation_event(rng, self.mutability) {
            self.mutability = mutate_mutability(rng, self.mutability);
        }
    }

    fn insert_random_gene<R: Rng + ?Sized>(&mut self, rng: &mut R, pool: Option<&[Key]>) {
        let mut receptor = draw_key(rng, pool);
        for _ in 0..MAX_MUTATION_ROUNDS {
            if !coin(rng, 0.5) {
                break;
            }
            receptor = receptor.mutate(rng, self.mutability);
        }
        let signal = draw_key(rng, pool);

        let expression = ExpressionFunction::new(rng, receptor.into());
        let mutability = self.mutability.abs().max(f64::MIN_POSITIVE);
        let gene = match rng.gen_range(0..3) {
            0 => {
                let distance = rng.gen_range(-PROMOTER_REACH..=PROMOTER_REACH);
                Gene::promoter(expression, distance, mutability)
            }
            1 => Gene::signal(expression, signal.into(), mutability),
            _ => Gene::external(expression, signal.into(), rng.gen(), mutability),
        };

        if rng.gen_bool(0.5) {
            self.genes.insert(0, gene);
            self.centromere += 1;
            debug!("inserted gene at head ({} genes)", self.genes.len());
        } else {
            self.genes.push(gene);
            debug!("inserted gene at tail ({} genes)", self.genes.len());
        }
    }
}

/// Pick a key from the pool, or synthesize one
fn draw_key<R: Rng + ?Sized>(rng: &mut R, pool: Option<&[Key]>) -> Key {
    match pool {
        Some(keys) if !keys.is_empty() => keys[rng.gen_range(0..keys.len())].clone(),
        _ => Key::random_sized(rng, SYNTHETIC_KEY_POINTS, KEY_SPAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::{GaborBasis, WaveDimension, Wavelet};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn constant(amplitude: f64) -> ExpressionFunction {
        let wave = Wavelet {
            frequency: 0.0,
            phase: 0.0,
            amplitude,
            form: 1.0,
            dimensions: vec![WaveDimension { center: 0.0, width: 1.0 }],
        };
        ExpressionFunction::from_parts(vec!["0000".parse().unwrap()], vec![wave]).unwrap()
    }

    fn labelled(n: usize) -> Vec<Gene> {
        (0..n)
            .map(|i| Gene::promoter(constant(i as f64 + 1.0), 100, 1.0))
            .collect()
    }

    #[test]
    fn test_random_chromatid_is_populated_and_partitioned() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let chromatid = Chromatid::random(&mut rng, 1.0);
            assert!(!chromatid.is_empty());
            let partitioned = chromatid.promoter_genes().count()
                + chromatid.local_signal_genes().count()
                + chromatid.external_signal_genes().count();
            assert_eq!(partitioned, chromatid.len());
        }
    }

    #[test]
    fn test_expressed_signal_views() {
        let genes = vec![
            Gene::signal(constant(1.0), "1".parse().unwrap(), 1.0),
            Gene::external(constant(1.0), "10".parse().unwrap(), false, 1.0),
            Gene::external(constant(1.0), "11".parse().unwrap(), true, 1.0),
            Gene::signal(constant(1.0), "1".parse().unwrap(), 1.0),
            Gene::promoter(constant(1.0), 1, 1.0),
        ];
        let chromatid = Chromatid::from_genes(genes, 0, 1.0);

        let internal: Vec<String> = chromatid.expressed_signals(false).iter().map(|s| s.to_string()).collect();
        let external: Vec<String> = chromatid.expressed_signals(true).iter().map(|s| s.to_string()).collect();
        assert_eq!(internal, vec!["1", "10"]);
        assert_eq!(external, vec!["11"]);
    }

    #[test]
    fn test_promoters_on_same_target_sum() {
        let genes = vec![
            Gene::promoter(constant(0.5), 2, 1.0),
            Gene::promoter(constant(0.25), 1, 1.0),
            Gene::signal(constant(2.0), "1".parse().unwrap(), 1.0),
        ];
        let mut chromatid = Chromatid::from_genes(genes, 0, 1.0);
        let mut store = ConcentrationStore::new();

        chromatid.pre_tick(&store, &GaborBasis);
        chromatid.tick(&mut store);
        assert!((chromatid.genes()[2].expression_activity() - 2.0).abs() < 1e-12);

        let promotions = chromatid.promotions();
        assert_eq!(promotions.len(), 1);
        assert!((promotions[&2] - 0.75).abs() < 1e-12);

        chromatid.pre_tick(&store, &GaborBasis);
        chromatid.tick(&mut store);
        assert!((chromatid.genes()[2].expression_activity() - 3.5).abs() < 1e-12);
        assert!((chromatid.genes()[0].expression_activity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_promoter_is_ignored() {
        let genes = vec![Gene::promoter(constant(1.0), -1, 1.0), Gene::promoter(constant(1.0), 5, 1.0)];
        let mut chromatid = Chromatid::from_genes(genes, 0, 1.0);
        let mut store = ConcentrationStore::new();
        chromatid.pre_tick(&store, &GaborBasis);
        chromatid.tick(&mut store);
        assert!(chromatid.promotions().is_empty());
    }

    #[test]
    fn test_extraction_sign_convention() {
        let chromatid = Chromatid::from_genes(labelled(6), 3, 1.0);

        assert_eq!(chromatid.crossover(-2), chromatid.genes()[..1].to_vec());
        assert_eq!(chromatid.crossover(1), chromatid.genes()[4..].to_vec());
        assert!(chromatid.crossover(-3).is_empty());
        assert!(chromatid.crossover(3).is_empty());
        assert!(chromatid.crossover(10).is_empty());
        assert!(chromatid.crossover(-10).is_empty());
    }

    #[test]
    fn test_splice_is_strict() {
        let mut chromatid = Chromatid::from_genes(labelled(4), 2, 1.0);
        let err = chromatid.splice(Vec::new(), 3).unwrap_err();
        assert!(matches!(err, StrandError::CrossoverOutOfRange { index: 5, len: 4, .. }));
        assert!(chromatid.splice(Vec::new(), -3).is_err());
        assert_eq!(chromatid.len(), 4);
    }

    #[test]
    fn test_splice_prefix_moves_centromere() {
        let mut chromatid = Chromatid::from_genes(labelled(5), 3, 1.0);
        let incoming = vec![Gene::signal(constant(9.0), "1".parse().unwrap(), 1.0); 3];

        let removed = chromatid.splice(incoming.clone(), -1).unwrap();

        assert_eq!(removed, labelled(5)[..2].to_vec());
        assert_eq!(chromatid.len(), 6);
        assert_eq!(&chromatid.genes()[..3], incoming.as_slice());
        assert_eq!(chromatid.centromere(), 4);
    }

    #[test]
    fn test_extract_then_splice_is_identity() {
        let original = Chromatid::from_genes(labelled(7), 3, 1.0);
        for point in -2..4 {
            let mut chromatid = original.clone();
            let segment = chromatid.crossover(point);
            assert!(!segment.is_empty(), "point {}", point);
            chromatid.splice(segment, point).unwrap();
            assert_eq!(chromatid, original, "point {}", point);
        }
    }

    #[test]
    fn test_mutate_with_pool_draws_pool_keys() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let pool: Vec<Key> = vec!["1011".parse().unwrap()];
        let mut chromatid = Chromatid::from_genes(Vec::new(), 0, 50.0);
        chromatid.mutate(&mut rng, Some(pool.as_slice()));

        assert_eq!(chromatid.len(), 1);
        let gene = &chromatid.genes()[0];
        if let Some(signal) = gene.output_signal() {
            assert_eq!(signal.key(), &pool[0]);
        }
    }
}
