//! Accumulation of coincidence events into angle-binned spectra.
//!
//! Each analyzed event arrives as a short list of suppressed hits. The
//! accumulator forms unordered pairs, resolves each pair's opening
//! angle to an angular index, and routes the summed energy into the
//! prompt or time-random histograms depending on the pair's time
//! difference.

use angcorr_core::{angle_between, AngleTable, CoincidenceHit, Result, Spectrum1D, Spectrum2D};

/// Configuration for event accumulation.
#[derive(Debug, Clone)]
pub struct AccumulateConfig {
    /// Number of energy bins.
    pub energy_bins: usize,
    /// Upper edge of the energy axis in keV (lower edge is 0).
    pub energy_max_kev: f64,
    /// Pairs with |dt| below this are prompt coincidences (ns).
    pub prompt_window_ns: f64,
    /// Pairs with |dt| above this are time-random coincidences (ns).
    pub time_random_min_ns: f64,
    /// Number of bins on the time-difference axis.
    pub delta_t_bins: usize,
    /// Upper edge of the time-difference axis (ns).
    pub delta_t_max_ns: f64,
    /// Required event multiplicity; events of any other size are
    /// skipped. `None` disables the filter.
    pub multiplicity: Option<usize>,
    /// Minimum accepted hit energy in keV.
    pub min_energy_kev: f64,
    /// Pairs below this opening angle are degenerate self-pairs and
    /// are discarded (degrees).
    pub min_angle_deg: f64,
    /// Pairs above this opening angle are numerical noise and are
    /// discarded (degrees).
    pub max_angle_deg: f64,
    /// Lower edges of the delayed time-random slices (ns).
    pub slice_edges_ns: Vec<f64>,
    /// Width of each delayed slice (ns); equal to the prompt window so
    /// the averaged estimate needs no further scaling.
    pub slice_width_ns: f64,
    /// Whether to accumulate per-index sum-vs-gamma pair matrices
    /// (required for gated projections; memory-heavy).
    pub build_pair_matrices: bool,
    /// Number of detector channels on the diagnostic axis.
    pub detector_channels: usize,
}

impl Default for AccumulateConfig {
    fn default() -> Self {
        Self {
            energy_bins: 3000,
            energy_max_kev: 3000.0,
            prompt_window_ns: 30.0,
            time_random_min_ns: 500.0,
            delta_t_bins: 1000,
            delta_t_max_ns: 1000.0,
            multiplicity: Some(2),
            min_energy_kev: 5.0,
            min_angle_deg: 0.0001,
            max_angle_deg: 180.0,
            slice_edges_ns: vec![510.0, 617.0, 725.0, 832.0, 940.0],
            slice_width_ns: 30.0,
            build_pair_matrices: false,
            detector_channels: 70,
        }
    }
}

/// Histograms produced by one accumulation pass.
#[derive(Debug, Clone)]
pub struct CoincidenceHistograms {
    /// Prompt sum energy vs angular index (index rows, energy columns).
    pub prompt: Spectrum2D,
    /// Per-index time-random matrices (sum energy rows, dt columns).
    pub time_random: Vec<Spectrum2D>,
    /// Per-index pair matrices (sum energy rows, higher-partner energy
    /// columns). Empty unless `build_pair_matrices` was set.
    pub pair: Vec<Spectrum2D>,
    /// Gamma singles energy spectrum.
    pub gamma_singles: Spectrum1D,
    /// Pair time-difference spectrum.
    pub delta_t: Spectrum1D,
    /// Prompt sum-energy spectrum, all angles.
    pub sum_energy: Spectrum1D,
    /// Time-random sum-energy spectrum, all angles.
    pub sum_energy_time_random: Spectrum1D,
    /// Energy vs detector channel diagnostic matrix.
    pub energy_detector: Spectrum2D,
}

/// Accumulates preprocessed coincidence events into spectra.
#[derive(Debug, Clone)]
pub struct Accumulator {
    angle_table: AngleTable,
    config: AccumulateConfig,
    histograms: CoincidenceHistograms,
    events_seen: u64,
    events_kept: u64,
}

impl Accumulator {
    /// Creates an accumulator for the given angle table.
    pub fn new(angle_table: AngleTable, config: AccumulateConfig) -> Result<Self> {
        let n = angle_table.len();
        let e_bins = config.energy_bins;
        let e_max = config.energy_max_kev;

        let time_random = (0..n)
            .map(|_| {
                Spectrum2D::new(
                    e_bins,
                    0.0,
                    e_max,
                    config.delta_t_bins,
                    0.0,
                    config.delta_t_max_ns,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let pair = if config.build_pair_matrices {
            (0..n)
                .map(|_| Spectrum2D::new(e_bins, 0.0, e_max, e_bins, 0.0, e_max))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let histograms = CoincidenceHistograms {
            prompt: Spectrum2D::new(n, 0.0, n as f64, e_bins, 0.0, e_max)?,
            time_random,
            pair,
            gamma_singles: Spectrum1D::new(e_bins, 0.0, e_max)?,
            delta_t: Spectrum1D::new(config.delta_t_bins, 0.0, config.delta_t_max_ns)?,
            sum_energy: Spectrum1D::new(e_bins, 0.0, e_max)?,
            sum_energy_time_random: Spectrum1D::new(e_bins, 0.0, e_max)?,
            energy_detector: Spectrum2D::new(
                config.detector_channels,
                0.0,
                config.detector_channels as f64,
                e_bins,
                0.0,
                e_max,
            )?,
        };

        Ok(Self {
            angle_table,
            config,
            histograms,
            events_seen: 0,
            events_kept: 0,
        })
    }

    /// Accumulation configuration.
    pub fn config(&self) -> &AccumulateConfig {
        &self.config
    }

    /// Number of events seen so far.
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    /// Number of events passing the multiplicity filter.
    pub fn events_kept(&self) -> u64 {
        self.events_kept
    }

    /// Processes one preprocessed event.
    pub fn process_event(&mut self, hits: &[CoincidenceHit]) {
        self.events_seen += 1;

        let kept: Vec<&CoincidenceHit> = hits
            .iter()
            .filter(|hit| hit.energy_kev >= self.config.min_energy_kev)
            .collect();
        if let Some(multiplicity) = self.config.multiplicity {
            if kept.len() != multiplicity {
                return;
            }
        }
        self.events_kept += 1;

        for (g1, first) in kept.iter().enumerate() {
            self.histograms.gamma_singles.fill(first.energy_kev);
            self.histograms
                .energy_detector
                .fill(f64::from(first.detector), first.energy_kev);

            for second in &kept[g1 + 1..] {
                let angle = angle_between(&first.position, &second.position);
                if angle < self.config.min_angle_deg || angle > self.config.max_angle_deg {
                    continue;
                }
                let index = self.angle_table.index_of(angle);
                let delta_t = (first.time_ns - second.time_ns).abs();
                let sum = first.energy_kev + second.energy_kev;

                self.histograms.delta_t.fill(delta_t);

                if delta_t < self.config.prompt_window_ns {
                    self.histograms.sum_energy.fill(sum);
                    self.histograms.prompt.fill(index as f64, sum);
                    if self.config.build_pair_matrices {
                        let high = first.energy_kev.max(second.energy_kev);
                        self.histograms.pair[index].fill(sum, high);
                    }
                }
                if delta_t > self.config.time_random_min_ns {
                    self.histograms.sum_energy_time_random.fill(sum);
                    self.histograms.time_random[index].fill(sum, delta_t);
                }
            }
        }
    }

    /// Finishes accumulation and hands over the histograms.
    pub fn finish(self) -> CoincidenceHistograms {
        self.histograms
    }
}

/// Averages a per-index time-random matrix over its delayed slices.
///
/// Each slice is a `slice_width` wide window on the time-difference
/// axis starting at one of `slice_edges`; the slice projections are
/// summed and scaled by the inverse slice count. Because every slice
/// has the same width as the prompt window, the result estimates the
/// accidental content of the prompt spectrum with no further scaling.
pub fn average_time_random(
    matrix: &Spectrum2D,
    slice_edges: &[f64],
    slice_width: f64,
) -> Result<Spectrum1D> {
    // The average lives on the sum-energy axis, the row axis here.
    let mut average = matrix.empty_row_spectrum()?;

    for &edge in slice_edges {
        let lo_col = matrix.col_index(edge).unwrap_or(0);
        let hi_col = matrix
            .col_index(edge + slice_width)
            .unwrap_or(matrix.n_cols() - 1);
        let slice = matrix.project_columns(lo_col, hi_col)?;
        average.add_scaled(&slice, 1.0)?;
    }
    average.scale(1.0 / slice_edges.len() as f64);
    Ok(average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use angcorr_core::Position;
    use approx::assert_relative_eq;

    fn test_config() -> AccumulateConfig {
        AccumulateConfig {
            energy_bins: 30,
            energy_max_kev: 3000.0,
            build_pair_matrices: true,
            detector_channels: 4,
            ..AccumulateConfig::default()
        }
    }

    fn table() -> AngleTable {
        AngleTable::new(vec![45.0, 90.0, 135.0, 180.0]).unwrap()
    }

    fn hit(energy: f64, position: Position, time: f64, detector: u16) -> CoincidenceHit {
        CoincidenceHit::new(energy, position, time, detector)
    }

    #[test]
    fn test_prompt_pair_lands_in_angle_bin() {
        let mut acc = Accumulator::new(table(), test_config()).unwrap();
        acc.process_event(&[
            hit(1000.0, Position::new(1.0, 0.0, 0.0), 0.0, 1),
            hit(500.0, Position::new(0.0, 1.0, 0.0), 10.0, 2),
        ]);
        let histograms = acc.finish();

        // 90 degree pair, prompt (dt = 10 ns), summed energy 1500 keV.
        assert_relative_eq!(histograms.prompt.value(1, 15), 1.0);
        assert_relative_eq!(histograms.prompt.total(), 1.0);
        assert_relative_eq!(histograms.sum_energy.total(), 1.0);
        assert_relative_eq!(histograms.sum_energy_time_random.total(), 0.0);
        // Higher-energy partner recorded on the pair matrix column axis.
        let pair = &histograms.pair[1];
        assert_relative_eq!(pair.value(15, 10), 1.0);
    }

    #[test]
    fn test_time_random_pair_lands_in_delayed_matrix() {
        let mut acc = Accumulator::new(table(), test_config()).unwrap();
        acc.process_event(&[
            hit(600.0, Position::new(1.0, 0.0, 0.0), 0.0, 1),
            hit(600.0, Position::new(0.0, 1.0, 0.0), 620.0, 2),
        ]);
        let histograms = acc.finish();

        assert_relative_eq!(histograms.prompt.total(), 0.0);
        assert_relative_eq!(histograms.sum_energy_time_random.total(), 1.0);
        assert_relative_eq!(histograms.time_random[1].total(), 1.0);
    }

    #[test]
    fn test_degenerate_and_noisy_angles_are_filtered() {
        let mut acc = Accumulator::new(table(), test_config()).unwrap();
        // Parallel positions: opening angle 0, below the minimum cut.
        acc.process_event(&[
            hit(600.0, Position::new(1.0, 0.0, 0.0), 0.0, 1),
            hit(600.0, Position::new(2.0, 0.0, 0.0), 5.0, 2),
        ]);
        let histograms = acc.finish();
        assert_relative_eq!(histograms.prompt.total(), 0.0);
        // Singles still recorded; only the pair was dropped.
        assert_relative_eq!(histograms.gamma_singles.total(), 2.0);
    }

    #[test]
    fn test_multiplicity_filter() {
        let mut acc = Accumulator::new(table(), test_config()).unwrap();
        acc.process_event(&[hit(600.0, Position::new(1.0, 0.0, 0.0), 0.0, 1)]);
        acc.process_event(&[
            hit(600.0, Position::new(1.0, 0.0, 0.0), 0.0, 1),
            hit(600.0, Position::new(0.0, 1.0, 0.0), 5.0, 2),
            hit(600.0, Position::new(0.0, 0.0, 1.0), 8.0, 3),
        ]);
        assert_eq!(acc.events_seen(), 2);
        assert_eq!(acc.events_kept(), 0);
    }

    #[test]
    fn test_low_energy_hits_are_dropped_before_pairing() {
        let mut acc = Accumulator::new(table(), test_config()).unwrap();
        // The 2 keV hit is below threshold, leaving a multiplicity-1
        // event that fails the filter.
        acc.process_event(&[
            hit(2.0, Position::new(1.0, 0.0, 0.0), 0.0, 1),
            hit(600.0, Position::new(0.0, 1.0, 0.0), 5.0, 2),
        ]);
        assert_eq!(acc.events_kept(), 0);
    }

    #[test]
    fn test_average_time_random_scales_by_slice_count() {
        // One count in each of the five delayed slices at 1200 keV.
        let mut matrix = Spectrum2D::new(30, 0.0, 3000.0, 1000, 0.0, 1000.0).unwrap();
        let edges = [510.0, 617.0, 725.0, 832.0, 940.0];
        for &edge in &edges {
            matrix.fill(1200.0, edge + 10.0);
        }
        let average = average_time_random(&matrix, &edges, 30.0).unwrap();
        assert_relative_eq!(average.value(12), 1.0);
        // Five unit-variance counts scaled by 1/5 each.
        assert_relative_eq!(average.variance(12), 5.0 / 25.0);
        assert_relative_eq!(average.total(), 1.0);
    }
}
