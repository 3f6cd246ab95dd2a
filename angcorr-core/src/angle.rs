//! Angle reference table and angular-index resolution.
//!
//! A detector array observes a fixed set of pairwise opening angles.
//! `AngleTable` holds them sorted ascending and resolves a measured
//! angle to the index of the nearest reference angle by binary search.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Opening angles (degrees) between crystal pairs of the GRIFFIN array,
/// one entry per distinct pairwise angle.
const GRIFFIN_ANGLES: [f64; 51] = [
    15.442, 21.9054, 29.1432, 33.1433, 38.382, 44.57, 47.4453, 48.7411, 51.4734, 55.1704, 59.9782,
    60.1024, 62.3396, 62.4924, 63.4231, 68.9567, 71.4314, 73.3582, 73.6291, 75.7736, 80.9423,
    81.5464, 83.8936, 86.868, 88.9658, 91.0342, 93.132, 96.1064, 98.4536, 99.0577, 104.226,
    106.371, 106.642, 108.569, 111.043, 116.577, 117.508, 117.66, 119.898, 120.022, 124.83,
    128.527, 131.259, 132.555, 135.43, 141.618, 146.857, 150.857, 158.095, 164.558, 180.0,
];

/// Immutable ascending table of reference angles in degrees.
///
/// The table also carries the resolver's upper margin: any angle within
/// `upper_margin` degrees of the last entry resolves to the last index.
/// The historical value is one degree; it absorbs measurement jitter
/// near 180 where back-to-back pairs pile up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleTable {
    angles: Vec<f64>,
    upper_margin: f64,
}

impl AngleTable {
    /// Default upper margin, in degrees.
    pub const DEFAULT_UPPER_MARGIN: f64 = 1.0;

    /// Creates a table from ascending reference angles.
    ///
    /// Fails if the list is empty, not strictly ascending, or reaches
    /// past 180 degrees.
    pub fn new(angles: Vec<f64>) -> Result<Self> {
        if angles.is_empty() {
            return Err(Error::EmptyAngleTable);
        }
        for position in 1..angles.len() {
            if angles[position] <= angles[position - 1] {
                return Err(Error::UnsortedAngleTable { position });
            }
        }
        let last = angles[angles.len() - 1];
        if last > 180.0 {
            return Err(Error::AngleAboveMaximum { angle: last });
        }
        Ok(Self {
            angles,
            upper_margin: Self::DEFAULT_UPPER_MARGIN,
        })
    }

    /// The GRIFFIN deployment table (51 pairwise angles).
    pub fn griffin() -> Self {
        Self::new(GRIFFIN_ANGLES.to_vec()).expect("reference table is valid")
    }

    /// Overrides the upper margin used by [`Self::index_of`].
    #[must_use]
    pub fn with_upper_margin(mut self, margin: f64) -> Self {
        self.upper_margin = margin;
        self
    }

    /// Number of angular indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    /// Returns true if the table is empty (never, by construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Reference angle at `index`.
    #[inline]
    pub fn angle(&self, index: usize) -> f64 {
        self.angles[index]
    }

    /// All reference angles.
    #[inline]
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Resolves a measured angle to the index of the nearest reference
    /// angle.
    ///
    /// Callers must pre-filter to `(0, 180]`; degenerate self-pair
    /// angles near zero and values past 180 from numerical noise never
    /// reach this point. For any in-range input a valid index is
    /// returned in O(log N).
    pub fn index_of(&self, angle: f64) -> usize {
        let n = self.angles.len();
        if angle <= self.angles[0] {
            return 0;
        }
        if angle >= self.angles[n - 1] - self.upper_margin {
            return n - 1;
        }

        let mut i = 0;
        let mut j = n;
        let mut mid = 0;
        while i < j {
            mid = (i + j) / 2;
            if self.angles[mid] == angle {
                return mid;
            }
            if angle < self.angles[mid] {
                if mid > 0 && angle > self.angles[mid - 1] {
                    return self.closest(mid - 1, mid, angle);
                }
                j = mid;
            } else {
                if mid < n - 1 && angle < self.angles[mid + 1] {
                    return self.closest(mid, mid + 1, angle);
                }
                i = mid + 1;
            }
        }
        mid
    }

    /// Nearest of two neighboring indices; assumes
    /// `angles[lower] <= target <= angles[upper]`. Exact midpoints
    /// round up to `upper`.
    fn closest(&self, lower: usize, upper: usize, target: f64) -> usize {
        if (target - self.angles[lower]) >= (self.angles[upper] - target) {
            upper
        } else {
            lower
        }
    }
}
