//! Binned spectra with per-bin variance tracking.
//!
//! Every bin carries a value and a variance, and every operation that
//! combines spectra propagates variances for a linear combination:
//! subtracting `c * source` adds `c^2 * source.variance`. Counts filled
//! one at a time get unit variance per fill (Poisson statistics).

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};

/// A 1D binned spectrum over a fixed numeric axis.
///
/// Bin `i` covers `[lo + i*width, lo + (i+1)*width)` where
/// `width = (hi - lo) / n_bins`. Bin count and range are fixed at
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum1D {
    n_bins: usize,
    lo: f64,
    hi: f64,
    values: Vec<f64>,
    variances: Vec<f64>,
}

impl Spectrum1D {
    /// Creates a zero-initialized spectrum.
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 || !(hi > lo) {
            return Err(Error::InvalidAxis { n_bins, lo, hi });
        }
        Ok(Self {
            n_bins,
            lo,
            hi,
            values: vec![0.0; n_bins],
            variances: vec![0.0; n_bins],
        })
    }

    /// Number of bins.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the axis.
    #[inline]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper edge of the axis.
    #[inline]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Width of one bin.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.n_bins as f64
    }

    /// Center coordinate of bin `bin`.
    #[inline]
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.lo + (bin as f64 + 0.5) * self.bin_width()
    }

    /// Bin index holding coordinate `x`, or `None` if `x` is outside the
    /// axis.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if x < self.lo || x >= self.hi {
            return None;
        }
        let bin = ((x - self.lo) / self.bin_width()) as usize;
        Some(bin.min(self.n_bins - 1))
    }

    /// Value of bin `bin`.
    #[inline]
    pub fn value(&self, bin: usize) -> f64 {
        self.values[bin]
    }

    /// Variance of bin `bin`.
    #[inline]
    pub fn variance(&self, bin: usize) -> f64 {
        self.variances[bin]
    }

    /// Standard error of bin `bin`.
    #[inline]
    pub fn error(&self, bin: usize) -> f64 {
        self.variances[bin].sqrt()
    }

    /// All bin values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All bin variances.
    #[inline]
    pub fn variances(&self) -> &[f64] {
        &self.variances
    }

    /// Sum of all bin values.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Adds one count at coordinate `x` with unit variance.
    ///
    /// Counts outside the axis are silently dropped, matching the usual
    /// histogram fill contract.
    pub fn fill(&mut self, x: f64) {
        if let Some(bin) = self.bin_index(x) {
            self.values[bin] += 1.0;
            self.variances[bin] += 1.0;
        }
    }

    /// Sets one bin to an explicit value and variance.
    pub fn set_bin(&mut self, bin: usize, value: f64, variance: f64) -> Result<()> {
        if bin >= self.n_bins {
            return Err(Error::BinOutOfRange {
                bin,
                n_bins: self.n_bins,
            });
        }
        self.values[bin] = value;
        self.variances[bin] = variance;
        Ok(())
    }

    /// Subtracts `coefficient * source` bin-by-bin.
    ///
    /// Variances combine as for a linear combination:
    /// `variance += coefficient^2 * source.variance`.
    pub fn subtract_scaled(&mut self, source: &Spectrum1D, coefficient: f64) -> Result<()> {
        self.check_shape(source)?;
        let c2 = coefficient * coefficient;
        for bin in 0..self.n_bins {
            self.values[bin] -= coefficient * source.values[bin];
            self.variances[bin] += c2 * source.variances[bin];
        }
        Ok(())
    }

    /// Adds `coefficient * source` bin-by-bin with variance propagation.
    pub fn add_scaled(&mut self, source: &Spectrum1D, coefficient: f64) -> Result<()> {
        self.subtract_scaled(source, -coefficient)
    }

    /// Scales all bins by `factor`; variances scale by `factor^2`.
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;
        for bin in 0..self.n_bins {
            self.values[bin] *= factor;
            self.variances[bin] *= f2;
        }
    }

    fn check_shape(&self, other: &Spectrum1D) -> Result<()> {
        if self.n_bins != other.n_bins {
            return Err(Error::ShapeMismatch {
                expected: self.n_bins,
                actual: other.n_bins,
            });
        }
        Ok(())
    }
}

/// A 2D binned spectrum over (row, column) axes.
///
/// The row axis is typically the angular index and the column axis an
/// energy. Bins are stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum2D {
    n_rows: usize,
    row_lo: f64,
    row_hi: f64,
    n_cols: usize,
    col_lo: f64,
    col_hi: f64,
    values: Vec<f64>,
    variances: Vec<f64>,
}

impl Spectrum2D {
    /// Creates a zero-initialized 2D spectrum.
    pub fn new(
        n_rows: usize,
        row_lo: f64,
        row_hi: f64,
        n_cols: usize,
        col_lo: f64,
        col_hi: f64,
    ) -> Result<Self> {
        if n_rows == 0 || !(row_hi > row_lo) {
            return Err(Error::InvalidAxis {
                n_bins: n_rows,
                lo: row_lo,
                hi: row_hi,
            });
        }
        if n_cols == 0 || !(col_hi > col_lo) {
            return Err(Error::InvalidAxis {
                n_bins: n_cols,
                lo: col_lo,
                hi: col_hi,
            });
        }
        Ok(Self {
            n_rows,
            row_lo,
            row_hi,
            n_cols,
            col_lo,
            col_hi,
            values: vec![0.0; n_rows * n_cols],
            variances: vec![0.0; n_rows * n_cols],
        })
    }

    /// Number of row bins.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of column bins.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Lower edge of the row axis.
    #[inline]
    pub fn row_lo(&self) -> f64 {
        self.row_lo
    }

    /// Upper edge of the row axis.
    #[inline]
    pub fn row_hi(&self) -> f64 {
        self.row_hi
    }

    /// Lower edge of the column axis.
    #[inline]
    pub fn col_lo(&self) -> f64 {
        self.col_lo
    }

    /// Upper edge of the column axis.
    #[inline]
    pub fn col_hi(&self) -> f64 {
        self.col_hi
    }

    #[inline]
    fn flat(&self, row: usize, col: usize) -> usize {
        row * self.n_cols + col
    }

    /// Value of bin (`row`, `col`).
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[self.flat(row, col)]
    }

    /// Variance of bin (`row`, `col`).
    #[inline]
    pub fn variance(&self, row: usize, col: usize) -> f64 {
        self.variances[self.flat(row, col)]
    }

    /// Row bin index holding coordinate `x`, or `None` if outside.
    pub fn row_index(&self, x: f64) -> Option<usize> {
        axis_bin(x, self.row_lo, self.row_hi, self.n_rows)
    }

    /// Column bin index holding coordinate `y`, or `None` if outside.
    pub fn col_index(&self, y: f64) -> Option<usize> {
        axis_bin(y, self.col_lo, self.col_hi, self.n_cols)
    }

    /// Sum of all bin values.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Adds one count at (`x`, `y`) with unit variance.
    ///
    /// Counts outside either axis are silently dropped.
    pub fn fill(&mut self, x: f64, y: f64) {
        if let (Some(row), Some(col)) = (self.row_index(x), self.col_index(y)) {
            let idx = self.flat(row, col);
            self.values[idx] += 1.0;
            self.variances[idx] += 1.0;
        }
    }

    /// Sets one bin to an explicit value and variance.
    ///
    /// Used when reconstructing a matrix from already-projected 1D
    /// spectra, one per row.
    pub fn set_bin(&mut self, row: usize, col: usize, value: f64, variance: f64) -> Result<()> {
        if row >= self.n_rows {
            return Err(Error::BinOutOfRange {
                bin: row,
                n_bins: self.n_rows,
            });
        }
        if col >= self.n_cols {
            return Err(Error::BinOutOfRange {
                bin: col,
                n_bins: self.n_cols,
            });
        }
        let idx = self.flat(row, col);
        self.values[idx] = value;
        self.variances[idx] = variance;
        Ok(())
    }

    /// Sums columns `[lo_col, hi_col]` (inclusive) for each row,
    /// returning a 1D spectrum over the row axis.
    pub fn project_columns(&self, lo_col: usize, hi_col: usize) -> Result<Spectrum1D> {
        if lo_col > hi_col || hi_col >= self.n_cols {
            return Err(Error::InvalidBinRange {
                lo: lo_col,
                hi: hi_col,
            });
        }
        let mut projection = Spectrum1D::new(self.n_rows, self.row_lo, self.row_hi)?;
        for row in 0..self.n_rows {
            let mut value = 0.0;
            let mut variance = 0.0;
            for col in lo_col..=hi_col {
                value += self.value(row, col);
                variance += self.variance(row, col);
            }
            projection.set_bin(row, value, variance)?;
        }
        Ok(projection)
    }

    /// Sums rows `[lo_row, hi_row]` (inclusive) for each column,
    /// returning a 1D spectrum over the column axis.
    pub fn project_rows(&self, lo_row: usize, hi_row: usize) -> Result<Spectrum1D> {
        if lo_row > hi_row || hi_row >= self.n_rows {
            return Err(Error::InvalidBinRange {
                lo: lo_row,
                hi: hi_row,
            });
        }
        let mut projection = Spectrum1D::new(self.n_cols, self.col_lo, self.col_hi)?;
        for col in 0..self.n_cols {
            let mut value = 0.0;
            let mut variance = 0.0;
            for row in lo_row..=hi_row {
                value += self.value(row, col);
                variance += self.variance(row, col);
            }
            projection.set_bin(col, value, variance)?;
        }
        Ok(projection)
    }

    /// Extracts the full column vector of one row as a 1D spectrum over
    /// the column axis.
    pub fn project_row(&self, row: usize) -> Result<Spectrum1D> {
        if row >= self.n_rows {
            return Err(Error::BinOutOfRange {
                bin: row,
                n_bins: self.n_rows,
            });
        }
        let mut projection = Spectrum1D::new(self.n_cols, self.col_lo, self.col_hi)?;
        for col in 0..self.n_cols {
            projection.set_bin(col, self.value(row, col), self.variance(row, col))?;
        }
        Ok(projection)
    }

    /// Creates an empty 1D spectrum matching this matrix's column axis.
    pub fn empty_column_spectrum(&self) -> Result<Spectrum1D> {
        Spectrum1D::new(self.n_cols, self.col_lo, self.col_hi)
    }

    /// Creates an empty 1D spectrum matching this matrix's row axis.
    pub fn empty_row_spectrum(&self) -> Result<Spectrum1D> {
        Spectrum1D::new(self.n_rows, self.row_lo, self.row_hi)
    }
}

fn axis_bin(x: f64, lo: f64, hi: f64, n_bins: usize) -> Option<usize> {
    if x < lo || x >= hi {
        return None;
    }
    let width = (hi - lo) / n_bins as f64;
    let bin = ((x - lo) / width) as usize;
    Some(bin.min(n_bins - 1))
}
