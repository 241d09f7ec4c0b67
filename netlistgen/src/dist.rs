//! Weighted cell-type distributions.
//!
//! A distribution file has one `<cell name> <weight>` pair per line.
//! Weights are normalized at load time so they sum to 1.

use arcstr::ArcStr;
use indexmap::IndexMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use thiserror::Error;

use crate::lef::CellLibrary;

/// An enumeration of distribution-loading errors.
#[derive(Debug, Error)]
pub enum DistError {
    /// The distribution file contains no entries.
    #[error("distribution file is empty")]
    Empty,

    /// A line that is not a `<name> <weight>` pair.
    #[error("line {line}: malformed distribution entry")]
    Malformed { line: usize },

    /// A weight that is zero or negative.
    #[error("line {line}: cell `{cell}` has non-positive weight {weight}")]
    NonPositiveWeight {
        line: usize,
        cell: ArcStr,
        weight: f64,
    },

    /// The weights sum to zero.
    #[error("distribution weights sum to zero")]
    ZeroTotal,

    /// The distribution references a cell the library does not define.
    #[error("distribution references `{cell}`, which is not in the cell library")]
    UnknownCell { cell: ArcStr },

    /// The sampler rejected the weight table.
    #[error("invalid weight table: {0}")]
    Weights(#[from] rand::distributions::WeightedError),
}

/// A normalized, weighted distribution over cell names.
#[derive(Debug, Clone)]
pub struct CellDistribution {
    weights: IndexMap<ArcStr, f64>,
    index: WeightedIndex<f64>,
}

impl CellDistribution {
    /// Parses and normalizes a distribution from text.
    ///
    /// A cell name appearing on several lines keeps its last weight.
    pub fn parse(text: &str) -> Result<Self, DistError> {
        let mut weights: IndexMap<ArcStr, f64> = IndexMap::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let mut tokens = raw.split_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            let weight: f64 = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or(DistError::Malformed { line })?;
            if weight <= 0.0 {
                return Err(DistError::NonPositiveWeight {
                    line,
                    cell: ArcStr::from(name),
                    weight,
                });
            }
            weights.insert(ArcStr::from(name), weight);
        }
        if weights.is_empty() {
            return Err(DistError::Empty);
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(DistError::ZeroTotal);
        }
        for weight in weights.values_mut() {
            *weight /= total;
        }
        let index = WeightedIndex::new(weights.values().copied())?;
        Ok(Self { weights, index })
    }

    /// Checks that every entry names a cell defined in `library`.
    pub fn validate_against(&self, library: &CellLibrary) -> Result<(), DistError> {
        for name in self.weights.keys() {
            if !library.contains(name) {
                return Err(DistError::UnknownCell { cell: name.clone() });
            }
        }
        Ok(())
    }

    /// Draws `k` cell names independently, with replacement.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, k: usize) -> Vec<ArcStr> {
        (0..k).map(|_| self.choose(rng).clone()).collect()
    }

    /// Draws a single cell name.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &ArcStr {
        let i = self.index.sample(rng);
        self.weights
            .get_index(i)
            .map(|(name, _)| name)
            .expect("weighted index is in range")
    }

    /// The normalized weight of `name`, if present.
    #[inline]
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// Iterates over `(name, normalized weight)` pairs in file order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, f64)> + '_ {
        self.weights.iter().map(|(name, w)| (name, *w))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use rand_xoshiro::rand_core::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::*;
    use crate::lef::CellLibrary;

    #[test]
    fn test_weights_normalized() {
        let dist = CellDistribution::parse("INV 7\nDFF 3\nNAND2 10\n").unwrap();
        let total: f64 = dist.iter().map(|(_, w)| w).sum();
        assert_float_eq!(total, 1.0, abs <= 1e-12);
        assert_float_eq!(dist.weight("INV").unwrap(), 0.35, abs <= 1e-12);
        assert_float_eq!(dist.weight("DFF").unwrap(), 0.15, abs <= 1e-12);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            CellDistribution::parse("\n\n"),
            Err(DistError::Empty)
        ));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            CellDistribution::parse("INV seven\n"),
            Err(DistError::Malformed { line: 1 })
        ));
        assert!(matches!(
            CellDistribution::parse("INV\n"),
            Err(DistError::Malformed { line: 1 })
        ));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        assert!(matches!(
            CellDistribution::parse("INV 0.5\nDFF -1\n"),
            Err(DistError::NonPositiveWeight { line: 2, .. })
        ));
        assert!(matches!(
            CellDistribution::parse("INV 0\n"),
            Err(DistError::NonPositiveWeight { line: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_cell_rejected() {
        let lib = CellLibrary::from_lef(
            "MACRO INV\n PIN A\n DIRECTION INPUT ;\n END A\nEND INV\n",
        )
        .unwrap();
        let dist = CellDistribution::parse("INV 1\nDFF 1\n").unwrap();
        assert!(matches!(
            dist.validate_against(&lib),
            Err(DistError::UnknownCell { .. })
        ));
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let dist = CellDistribution::parse("INV 0.7\nDFF 0.3\n").unwrap();
        let mut a = Xoshiro256StarStar::seed_from_u64(7);
        let mut b = Xoshiro256StarStar::seed_from_u64(7);
        assert_eq!(dist.sample(&mut a, 50), dist.sample(&mut b, 50));
    }

    #[test]
    fn test_duplicate_entries_keep_last() {
        let dist = CellDistribution::parse("INV 1\nINV 3\nDFF 1\n").unwrap();
        assert_eq!(dist.len(), 2);
        assert_float_eq!(dist.weight("INV").unwrap(), 0.75, abs <= 1e-12);
    }
}
