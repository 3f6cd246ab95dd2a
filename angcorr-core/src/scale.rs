//! Per-angular-index background scale factors.

use serde::{Deserialize, Serialize};

/// Mapping from angular index to the room-background scale factor
/// applied at that index.
///
/// Built once per pipeline run, either loaded from persistence or
/// produced by the scale-factor optimizer, and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactorTable {
    factors: Vec<f64>,
}

impl ScaleFactorTable {
    /// Creates a table from per-index factors.
    pub fn new(factors: Vec<f64>) -> Self {
        Self { factors }
    }

    /// Creates a table with the same factor at every index.
    ///
    /// `uniform(n, 1.0)` is the fallback when no persisted table exists
    /// and optimization is disabled.
    pub fn uniform(len: usize, factor: f64) -> Self {
        Self {
            factors: vec![factor; len],
        }
    }

    /// Number of indices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns true if the table covers no indices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Factor for `index`, or `None` past the end of the table.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.factors.get(index).copied()
    }

    /// All factors in index order.
    #[inline]
    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Iterates `(index, factor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.factors.iter().copied().enumerate()
    }
}
