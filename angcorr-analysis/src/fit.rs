//! Weighted linear least-squares fit over a spectrum window.

use angcorr_core::Spectrum1D;

/// Result of a first-degree polynomial fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Intercept of the fitted line.
    pub intercept: f64,
    /// Slope of the fitted line.
    pub slope: f64,
    /// Weighted residual sum of squares.
    pub chi_square: f64,
    /// Number of bins entering the fit.
    pub n_points: usize,
}

/// Fits `value = intercept + slope * bin_center` over the inclusive bin
/// window `[lo_bin, hi_bin]`, weighting each bin by the inverse of its
/// variance (unit weight where the variance is zero).
///
/// Returns `None` when the window holds fewer than two bins or the
/// normal equations are singular (all weight on one abscissa).
pub fn fit_line_weighted(spectrum: &Spectrum1D, lo_bin: usize, hi_bin: usize) -> Option<LineFit> {
    if lo_bin > hi_bin || hi_bin >= spectrum.n_bins() || hi_bin - lo_bin < 1 {
        return None;
    }

    let mut sum_w = 0.0;
    let mut sum_wx = 0.0;
    let mut sum_wy = 0.0;
    let mut sum_wxx = 0.0;
    let mut sum_wxy = 0.0;
    for bin in lo_bin..=hi_bin {
        let x = spectrum.bin_center(bin);
        let y = spectrum.value(bin);
        let variance = spectrum.variance(bin);
        let w = if variance > 0.0 { 1.0 / variance } else { 1.0 };
        sum_w += w;
        sum_wx += w * x;
        sum_wy += w * y;
        sum_wxx += w * x * x;
        sum_wxy += w * x * y;
    }

    let determinant = sum_w * sum_wxx - sum_wx * sum_wx;
    if determinant.abs() < f64::EPSILON * sum_wxx.max(1.0) {
        return None;
    }
    let intercept = (sum_wxx * sum_wy - sum_wx * sum_wxy) / determinant;
    let slope = (sum_w * sum_wxy - sum_wx * sum_wy) / determinant;

    let mut chi_square = 0.0;
    for bin in lo_bin..=hi_bin {
        let x = spectrum.bin_center(bin);
        let variance = spectrum.variance(bin);
        let w = if variance > 0.0 { 1.0 / variance } else { 1.0 };
        let residual = spectrum.value(bin) - intercept - slope * x;
        chi_square += w * residual * residual;
    }

    Some(LineFit {
        intercept,
        slope,
        chi_square,
        n_points: hi_bin - lo_bin + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line_has_zero_chi_square() {
        let mut s = Spectrum1D::new(40, 0.0, 40.0).unwrap();
        for bin in 0..40 {
            let x = s.bin_center(bin);
            s.set_bin(bin, 3.0 + 2.0 * x, 1.0).unwrap();
        }
        let fit = fit_line_weighted(&s, 5, 35).unwrap();
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.chi_square, 0.0, epsilon = 1e-9);
        assert_eq!(fit.n_points, 31);
    }

    #[test]
    fn test_peak_raises_chi_square() {
        let mut flat = Spectrum1D::new(41, 0.0, 41.0).unwrap();
        let mut peaked = Spectrum1D::new(41, 0.0, 41.0).unwrap();
        for bin in 0..41 {
            flat.set_bin(bin, 100.0, 100.0).unwrap();
            let peak = 50.0 * (-0.5 * ((bin as f64 - 20.0) / 2.0).powi(2)).exp();
            peaked.set_bin(bin, 100.0 + peak, 100.0 + peak).unwrap();
        }
        let flat_fit = fit_line_weighted(&flat, 0, 40).unwrap();
        let peaked_fit = fit_line_weighted(&peaked, 0, 40).unwrap();
        assert!(peaked_fit.chi_square > 10.0 * flat_fit.chi_square.max(1e-12));
    }

    #[test]
    fn test_degenerate_windows() {
        let s = Spectrum1D::new(10, 0.0, 10.0).unwrap();
        assert!(fit_line_weighted(&s, 5, 5).is_none());
        assert!(fit_line_weighted(&s, 6, 5).is_none());
        assert!(fit_line_weighted(&s, 5, 10).is_none());
    }
}
