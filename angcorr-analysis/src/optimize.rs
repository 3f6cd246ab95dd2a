//! Grid-search optimization of the room-background scale factor.
//!
//! A correctly scaled background subtraction cancels the reference
//! background line (1460 keV from K-40 in this deployment), leaving a
//! locally smooth continuum. The optimizer scans candidate scale
//! factors and keeps the one whose residual around the peak is closest
//! to a straight line.

use crate::fit::fit_line_weighted;

use angcorr_core::{Error, Result, Spectrum1D};

/// Configuration for the scale-factor grid search.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    /// Axis coordinate of the reference background peak (keV).
    pub peak_channel: f64,
    /// Center of the searched range; the scan covers
    /// `[0.5 * initial_guess, 1.5 * initial_guess]`.
    pub initial_guess: f64,
    /// Number of grid steps across the range.
    pub steps: usize,
    /// Half-width of the fit window around the peak, in axis units.
    pub window_half_width: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            peak_channel: 1460.0,
            initial_guess: 1.0,
            steps: 100,
            window_half_width: 20.0,
        }
    }
}

impl OptimizerConfig {
    /// Sets the reference peak position.
    #[must_use]
    pub fn with_peak_channel(mut self, peak: f64) -> Self {
        self.peak_channel = peak;
        self
    }

    /// Sets the initial guess / range center.
    #[must_use]
    pub fn with_initial_guess(mut self, guess: f64) -> Self {
        self.initial_guess = guess;
        self
    }

    /// Sets the number of grid steps.
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeOutcome {
    /// Scale factor to apply. Equal to the initial guess when the
    /// search did not converge.
    pub factor: f64,
    /// False when the best candidate sat on a range boundary (the true
    /// optimum lies outside the searched interval) or no candidate
    /// produced a valid fit.
    pub converged: bool,
    /// Chi-square of the best candidate's linear fit, when one exists.
    pub chi_square: Option<f64>,
}

/// Grid-search chi-square minimizer for background scale factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Finds the scale factor `c` minimizing the residual curvature of
    /// `source - c * background` around the reference peak.
    ///
    /// Each candidate is evaluated on a fresh clone of `source` so
    /// floating-point error never accumulates across the grid; the
    /// inputs are not mutated. Deterministic for fixed inputs and step
    /// count.
    ///
    /// Fails when the reference peak lies outside the spectrum axis;
    /// fit-window edges overhanging the axis clamp to it.
    pub fn optimize(&self, source: &Spectrum1D, background: &Spectrum1D) -> Result<OptimizeOutcome> {
        let cfg = &self.config;
        if source.bin_index(cfg.peak_channel).is_none() {
            return Err(Error::PeakOutsideAxis {
                peak: cfg.peak_channel,
            });
        }
        let range_low = 0.5 * cfg.initial_guess;
        let range_high = 1.5 * cfg.initial_guess;
        let step = (range_high - range_low) / cfg.steps as f64;

        let lo_bin = source
            .bin_index(cfg.peak_channel - cfg.window_half_width)
            .unwrap_or(0);
        let hi_bin = source
            .bin_index(cfg.peak_channel + cfg.window_half_width)
            .unwrap_or(source.n_bins() - 1);

        let mut best: Option<(usize, f64)> = None;
        for k in 0..=cfg.steps {
            let candidate = range_low + k as f64 * step;

            let mut residual = source.clone();
            residual.subtract_scaled(background, candidate)?;

            let Some(fit) = fit_line_weighted(&residual, lo_bin, hi_bin) else {
                continue;
            };
            match best {
                Some((_, best_chi2)) if fit.chi_square >= best_chi2 => {}
                _ => best = Some((k, fit.chi_square)),
            }
        }

        match best {
            // A minimum on either grid edge means the true optimum lies
            // outside the searched range; report the initial guess and
            // let the caller flag the index.
            Some((k, chi_square)) if k > 0 && k < cfg.steps => Ok(OptimizeOutcome {
                factor: range_low + k as f64 * step,
                converged: true,
                chi_square: Some(chi_square),
            }),
            Some((_, chi_square)) => Ok(OptimizeOutcome {
                factor: cfg.initial_guess,
                converged: false,
                chi_square: Some(chi_square),
            }),
            None => Ok(OptimizeOutcome {
                factor: cfg.initial_guess,
                converged: false,
                chi_square: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const N_BINS: usize = 3000;

    /// Flat continuum with a gaussian background line at `peak`.
    fn background_with_line(peak: f64, amplitude: f64) -> Spectrum1D {
        let mut s = Spectrum1D::new(N_BINS, 0.0, 3000.0).unwrap();
        for bin in 0..N_BINS {
            let x = s.bin_center(bin);
            let line = amplitude * (-0.5 * ((x - peak) / 3.0).powi(2)).exp();
            let value = 50.0 + line;
            s.set_bin(bin, value, value).unwrap();
        }
        s
    }

    /// `scale * background` plus a gently sloping source continuum.
    fn source_from(background: &Spectrum1D, scale: f64) -> Spectrum1D {
        let mut s = Spectrum1D::new(N_BINS, 0.0, 3000.0).unwrap();
        for bin in 0..N_BINS {
            let x = s.bin_center(bin);
            let value = scale * background.value(bin) + 200.0 - 0.05 * x;
            s.set_bin(bin, value, value.abs()).unwrap();
        }
        s
    }

    #[test]
    fn test_recovers_known_scale_factor() {
        let background = background_with_line(1460.0, 400.0);
        let source = source_from(&background, 1.7);

        let optimizer = Optimizer::new(
            OptimizerConfig::default()
                .with_initial_guess(1.5)
                .with_steps(100),
        );
        let outcome = optimizer.optimize(&source, &background).unwrap();

        assert!(outcome.converged);
        // Range [0.75, 2.25] in steps of 0.015; expect 1.7 within one step.
        assert_relative_eq!(outcome.factor, 1.7, epsilon = 0.015 + 1e-9);
    }

    #[test]
    fn test_boundary_fallback_returns_initial_guess() {
        // True factor 10.0 sits far outside [0.5, 1.5]: the best grid
        // candidate is the upper edge, so the initial guess comes back.
        let background = background_with_line(1460.0, 400.0);
        let source = source_from(&background, 10.0);

        let optimizer = Optimizer::new(OptimizerConfig::default());
        let outcome = optimizer.optimize(&source, &background).unwrap();

        assert!(!outcome.converged);
        assert_relative_eq!(outcome.factor, 1.0);
    }

    #[test]
    fn test_peak_outside_axis_is_rejected() {
        let background = background_with_line(1460.0, 300.0);
        let source = source_from(&background, 1.2);

        let optimizer =
            Optimizer::new(OptimizerConfig::default().with_peak_channel(5000.0));
        assert!(matches!(
            optimizer.optimize(&source, &background),
            Err(Error::PeakOutsideAxis { .. })
        ));
    }

    #[test]
    fn test_determinism() {
        let background = background_with_line(1460.0, 300.0);
        let source = source_from(&background, 1.2);

        let optimizer = Optimizer::new(OptimizerConfig::default());
        let first = optimizer.optimize(&source, &background).unwrap();
        let second = optimizer.optimize(&source, &background).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let background = background_with_line(1460.0, 300.0);
        let source = source_from(&background, 1.2);
        let source_copy = source.clone();
        let background_copy = background.clone();

        let optimizer = Optimizer::new(OptimizerConfig::default());
        optimizer.optimize(&source, &background).unwrap();

        assert_eq!(source, source_copy);
        assert_eq!(background, background_copy);
    }
}
