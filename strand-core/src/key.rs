//! # Key - Sparse Binary Patterns
//!
//! A key maps integer positions to concrete bits. Positions missing from
//! the map are wildcards. Receptors and signals are both keys; what
//! distinguishes them is the direction of matching:
//!
//! ```text
//! receptor   1x0        (positions 0, 2)
//! signal   x01101       (positions 1..=5)
//!             ^ ^       offset +2: receptor[0]=1 ~ signal[2]=1
//!                                  receptor[2]=0 ~ signal[4]=0   => binds
//! ```
//!
//! Keys are never edited in place: `mutate` returns a derived key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{StrandError, StrandResult};
use crate::mutation::bounded_walk;
use crate::{KEY_LIMIT, KEY_SPAN};

/// Sparse positional bit pattern with implicit wildcards
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyPoints")]
pub struct Key {
    points: BTreeMap<i64, bool>,
}

/// Unchecked wire form; deserialization goes through `Key::from_points`
#[derive(Deserialize)]
struct KeyPoints {
    points: BTreeMap<i64, bool>,
}

impl TryFrom<KeyPoints> for Key {
    type Error = StrandError;

    fn try_from(raw: KeyPoints) -> StrandResult<Self> {
        Self::from_points(raw.points)
    }
}

impl Key {
    /// Single concrete position drawn from `0..KEY_SPAN` with a random bit
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut points = BTreeMap::new();
        points.insert(rng.gen_range(0..KEY_SPAN), rng.gen());
        Self { points }
    }

    /// Up to `points` concrete positions drawn from `0..span`
    ///
    /// Collisions collapse, so the result may hold fewer positions, but
    /// never zero.
    pub fn random_sized<R: Rng + ?Sized>(rng: &mut R, points: usize, span: i64) -> Self {
        let span = span.clamp(1, KEY_LIMIT);
        let mut map = BTreeMap::new();
        for _ in 0..points.max(1) {
            map.insert(rng.gen_range(0..span), rng.gen());
        }
        Self { points: map }
    }

    /// Build from explicit positions, all within `±KEY_LIMIT`
    pub fn from_points(points: BTreeMap<i64, bool>) -> StrandResult<Self> {
        if points.is_empty() {
            return Err(StrandError::EmptyKey);
        }
        if let Some(&position) = points.keys().find(|p| !(-KEY_LIMIT..=KEY_LIMIT).contains(*p)) {
            return Err(StrandError::invalid_key(format!(
                "position {} outside ±{}",
                position, KEY_LIMIT
            )));
        }
        Ok(Self { points })
    }

    /// Parse a '1'/'0'/'x' string whose first character sits at `origin`
    pub fn parse_at(text: &str, origin: i64) -> StrandResult<Self> {
        let mut points = BTreeMap::new();
        for (i, ch) in text.chars().enumerate() {
            let position = origin
                .checked_add(i as i64)
                .ok_or_else(|| StrandError::invalid_key(format!("{:?} overflows at origin {}", text, origin)))?;
            match ch {
                '1' => {
                    points.insert(position, true);
                }
                '0' => {
                    points.insert(position, false);
                }
                'x' | 'X' => {}
                other => {
                    return Err(StrandError::invalid_key(format!(
                        "unexpected character {:?} in {:?}",
                        other, text
                    )))
                }
            }
        }
        Self::from_points(points)
    }

    /// Lowest concrete position (where the rendered string starts)
    pub fn origin(&self) -> i64 {
        self.points.keys().next().copied().unwrap_or(0)
    }

    /// Highest concrete position
    pub fn end(&self) -> i64 {
        self.points.keys().next_back().copied().unwrap_or(0)
    }

    /// Number of concrete (non-wildcard) positions
    #[inline]
    pub fn concrete_count(&self) -> usize {
        self.points.len()
    }

    /// Bit at `position`, `None` for a wildcard
    #[inline]
    pub fn get(&self, position: i64) -> Option<bool> {
        self.points.get(&position).copied()
    }

    /// Concrete positions in ascending order
    pub fn points(&self) -> impl Iterator<Item = (i64, bool)> + '_ {
        self.points.iter().map(|(&p, &v)| (p, v))
    }

    /// Derive a key with one concrete position relocated or deleted
    ///
    /// The last remaining position is always relocated, never deleted, so
    /// a key cannot become empty. Relocation stays within `±KEY_LIMIT`.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, deviation: f64) -> Self {
        let mut points = self.points.clone();
        let chosen = rng.gen_range(0..points.len());
        let position = match points.keys().nth(chosen) {
            Some(&p) => p,
            None => return self.clone(),
        };
        points.remove(&position);

        let relocate = points.is_empty() || rng.gen_bool(0.5);
        if relocate {
            let shift = bounded_walk(rng, 0.0, deviation).round() as i64;
            let relocated = position.saturating_add(shift).clamp(-KEY_LIMIT, KEY_LIMIT);
            points.insert(relocated, rng.gen());
        }

        Self { points }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for position in self.origin()..=self.end() {
            let ch = match self.get(position) {
                Some(true) => '1',
                Some(false) => '0',
                None => 'x',
            };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl FromStr for Key {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_at(s, 0)
    }
}

/// A key used as a matcher
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceptorKey(Key);

/// A key naming a regulatory species
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKey(Key);

impl ReceptorKey {
    /// Does this receptor match `signal` at some translation offset?
    ///
    /// The first receptor position is anchored on each signal position in
    /// turn; the remaining receptor positions must then land on equal
    /// concrete signal bits.
    pub fn binds(&self, signal: &SignalKey) -> bool {
        let receptor = &self.0;
        let signal = &signal.0;

        if signal.concrete_count() < receptor.concrete_count() {
            return false;
        }
        let Some((anchor, anchor_bit)) = receptor.points().next() else {
            return false;
        };

        signal
            .points()
            .filter(|&(_, bit)| bit == anchor_bit)
            .any(|(position, _)| {
                let Some(offset) = position.checked_sub(anchor) else {
                    return false;
                };
                receptor.points().all(|(p, bit)| {
                    p.checked_add(offset)
                        .map_or(false, |shifted| signal.get(shifted) == Some(bit))
                })
            })
    }

    /// Underlying pattern
    #[inline]
    pub fn key(&self) -> &Key {
        &self.0
    }

    /// Derive a mutated receptor
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, deviation: f64) -> Self {
        Self(self.0.mutate(rng, deviation))
    }
}

impl SignalKey {
    /// Underlying pattern
    #[inline]
    pub fn key(&self) -> &Key {
        &self.0
    }

    /// Derive a mutated signal
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, deviation: f64) -> Self {
        Self(self.0.mutate(rng, deviation))
    }
}

impl From<Key> for ReceptorKey {
    fn from(key: Key) -> Self {
        Self(key)
    }
}

impl From<Key> for SignalKey {
    fn from(key: Key) -> Self {
        Self(key)
    }
}

impl FromStr for ReceptorKey {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_str(s).map(Self)
    }
}

impl FromStr for SignalKey {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_str(s).map(Self)
    }
}

impl fmt::Display for ReceptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
