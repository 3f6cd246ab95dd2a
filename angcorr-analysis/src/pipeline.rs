//! Ordered background-subtraction stages over the angular indices.
//!
//! Each angular index is processed independently: time-random
//! subtraction, room-background subtraction with a per-index scale
//! factor, and assembly of the corrected spectra into the combined
//! index-vs-energy matrix. Index-local failures (missing data, low
//! statistics, non-converged optimization) are recorded in the run
//! report and never abort the batch.

use crate::accumulate::{average_time_random, CoincidenceHistograms};
use crate::optimize::{Optimizer, OptimizerConfig};

use angcorr_core::{Result, ScaleFactorTable, Spectrum1D, Spectrum2D};
use log::warn;
use rayon::prelude::*;

/// Which dataset a spectrum belongs to.
///
/// Storage names derive from the role, so there is no string selector
/// to mistype and no "unknown selector" failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetRole {
    /// The source (beam-on) dataset.
    Source,
    /// The room-background (beam-off) dataset.
    Background,
}

impl DatasetRole {
    /// Short name used in storage namespaces and log lines.
    pub fn label(self) -> &'static str {
        match self {
            DatasetRole::Source => "source",
            DatasetRole::Background => "bg",
        }
    }
}

/// Energy window on the sum-energy axis used for gated projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateWindow {
    /// Lower gate edge in keV.
    pub low_kev: f64,
    /// Upper gate edge in keV.
    pub high_kev: f64,
}

impl GateWindow {
    /// Creates a gate window; `low` must be below `high`.
    pub fn new(low_kev: f64, high_kev: f64) -> Option<Self> {
        (high_kev > low_kev).then_some(Self { low_kev, high_kev })
    }

    /// Gate center in keV.
    pub fn center(&self) -> f64 {
        0.5 * (self.low_kev + self.high_kev)
    }
}

/// Which partner of a gated two-gamma pair to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// The higher-energy partner, as recorded on the pair matrix.
    Upper,
    /// The lower-energy partner, reconstructed as gate bin minus
    /// column bin.
    Lower,
    /// Union of both partners.
    Both,
}

/// Why an angular index was left out of the corrected set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    /// One dataset had no corrected spectrum at this index (its
    /// time-random matrix was missing upstream).
    MissingSpectrum {
        /// Dataset the spectrum was missing from.
        role: DatasetRole,
    },
    /// Source or background projection held too few counts.
    LowStatistics {
        /// Counts in the source projection.
        source_counts: f64,
        /// Counts in the background projection.
        background_counts: f64,
    },
}

/// Per-index outcome of a subtraction run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOutcome {
    /// Angular index.
    pub index: usize,
    /// Room-background scale factor applied (or that would have been).
    pub scale_factor: f64,
    /// False when the optimizer fell back to its initial guess.
    pub converged: bool,
    /// Set when the index was skipped entirely.
    pub skipped: Option<SkipReason>,
}

/// Diagnostic summary of one subtraction run.
#[derive(Debug, Clone, Default)]
pub struct SubtractionReport {
    /// One outcome per angular index, in index order.
    pub outcomes: Vec<IndexOutcome>,
}

impl SubtractionReport {
    /// Number of indices skipped for missing data or low statistics.
    pub fn n_skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped.is_some()).count()
    }

    /// Number of processed indices whose optimization did not converge.
    pub fn n_unconverged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.skipped.is_none() && !o.converged)
            .count()
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} indices: {} subtracted, {} skipped, {} unoptimized",
            self.outcomes.len(),
            self.outcomes.len() - self.n_skipped(),
            self.n_skipped(),
            self.n_unconverged()
        )
    }
}

/// Input spectra for one dataset (source or background).
#[derive(Debug, Clone)]
pub struct DatasetInput {
    /// Prompt sum energy vs angular index (index rows, energy columns).
    pub prompt: Spectrum2D,
    /// Per-index time-random matrices (sum energy rows, dt columns);
    /// `None` where the storage collaborator had no data.
    pub time_random: Vec<Option<Spectrum2D>>,
}

impl DatasetInput {
    /// Builds a dataset input from freshly accumulated histograms.
    pub fn from_histograms(histograms: &CoincidenceHistograms) -> Self {
        Self {
            prompt: histograms.prompt.clone(),
            time_random: histograms
                .time_random
                .iter()
                .map(|matrix| Some(matrix.clone()))
                .collect(),
        }
    }

    /// Number of angular indices covered.
    pub fn n_indices(&self) -> usize {
        self.prompt.n_rows()
    }
}

/// Configuration for the subtraction pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Optimizer settings used when scale factors are recomputed.
    pub optimizer: OptimizerConfig,
    /// Recompute scale factors even when a persisted table was given.
    pub recompute_scale_factors: bool,
    /// Minimum counts in both projections for an index to be usable.
    pub min_counts: f64,
    /// Lower edges of the delayed time-random slices (ns).
    pub slice_edges_ns: Vec<f64>,
    /// Width of each delayed slice (ns).
    pub slice_width_ns: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            recompute_scale_factors: false,
            min_counts: 100.0,
            slice_edges_ns: vec![510.0, 617.0, 725.0, 832.0, 940.0],
            slice_width_ns: 30.0,
        }
    }
}

/// Everything a subtraction run produces.
#[derive(Debug, Clone)]
pub struct SubtractionOutput {
    /// Source per-index spectra after time-random subtraction.
    pub time_random_corrected: Vec<Option<Spectrum1D>>,
    /// Per-index spectra after room-background subtraction.
    pub background_corrected: Vec<Option<Spectrum1D>>,
    /// Sum of all corrected spectra over the angular indices.
    pub total: Spectrum1D,
    /// Combined index-vs-energy matrix of the corrected spectra.
    pub matrix: Spectrum2D,
    /// Scale factors actually applied, one per index.
    pub scale_factors: ScaleFactorTable,
    /// Per-index diagnostics.
    pub report: SubtractionReport,
}

/// The subtraction pipeline.
#[derive(Debug, Clone, Default)]
pub struct SubtractionPipeline {
    config: PipelineConfig,
}

impl SubtractionPipeline {
    /// Creates a pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Subtracts the averaged time-random estimate from each index's
    /// prompt projection.
    ///
    /// The time-random estimate is pre-averaged over delayed windows of
    /// the same width as the prompt window, so the coefficient is
    /// exactly 1.0. Indices without time-random data come back as
    /// `None`.
    pub fn subtract_time_random(
        &self,
        input: &DatasetInput,
        role: DatasetRole,
    ) -> Result<Vec<Option<Spectrum1D>>> {
        (0..input.n_indices())
            .into_par_iter()
            .map(|index| {
                let Some(matrix) = input.time_random.get(index).and_then(Option::as_ref) else {
                    warn!(
                        "{}: no time-random data for index {index}, skipping",
                        role.label()
                    );
                    return Ok(None);
                };
                let average = average_time_random(
                    matrix,
                    &self.config.slice_edges_ns,
                    self.config.slice_width_ns,
                )?;
                let mut prompt = input.prompt.project_row(index)?;
                prompt.subtract_scaled(&average, 1.0)?;
                Ok(Some(prompt))
            })
            .collect()
    }

    /// Subtracts the scaled room background from each index's corrected
    /// source spectrum and assembles the run outputs.
    ///
    /// Scale factors come from `scale_table` unless it is absent or
    /// recomputation was requested, in which case the optimizer derives
    /// one per index (falling back to its initial guess on
    /// non-convergence).
    pub fn subtract_room_background(
        &self,
        source: &[Option<Spectrum1D>],
        background: &[Option<Spectrum1D>],
        scale_table: Option<&ScaleFactorTable>,
    ) -> Result<(Vec<Option<Spectrum1D>>, SubtractionReport)> {
        let optimize = self.config.recompute_scale_factors || scale_table.is_none();
        let optimizer = Optimizer::new(self.config.optimizer);
        let initial_guess = self.config.optimizer.initial_guess;

        let results: Vec<(Option<Spectrum1D>, IndexOutcome)> = source
            .par_iter()
            .enumerate()
            .map(|(index, source_spectrum)| {
                let background_spectrum = background.get(index).and_then(Option::as_ref);
                let (Some(src), Some(bg)) = (source_spectrum.as_ref(), background_spectrum)
                else {
                    let role = if source_spectrum.is_none() {
                        DatasetRole::Source
                    } else {
                        DatasetRole::Background
                    };
                    return Ok((
                        None,
                        IndexOutcome {
                            index,
                            scale_factor: initial_guess,
                            converged: false,
                            skipped: Some(SkipReason::MissingSpectrum { role }),
                        },
                    ));
                };

                let source_counts = src.total();
                let background_counts = bg.total();
                if source_counts < self.config.min_counts
                    || background_counts < self.config.min_counts
                {
                    warn!(
                        "index {index}: low statistics ({source_counts:.0} source, \
                         {background_counts:.0} background counts), skipping"
                    );
                    return Ok((
                        None,
                        IndexOutcome {
                            index,
                            scale_factor: initial_guess,
                            converged: false,
                            skipped: Some(SkipReason::LowStatistics {
                                source_counts,
                                background_counts,
                            }),
                        },
                    ));
                }

                let (scale_factor, converged) = match scale_table {
                    Some(table) if !optimize => match table.get(index) {
                        Some(factor) => (factor, true),
                        None => {
                            warn!("index {index}: no persisted scale factor, using 1.0");
                            (1.0, true)
                        }
                    },
                    _ => {
                        let outcome = optimizer.optimize(src, bg)?;
                        if !outcome.converged {
                            warn!("index {index}: could not optimize scale factor");
                        }
                        (outcome.factor, outcome.converged)
                    }
                };

                let mut corrected = src.clone();
                corrected.subtract_scaled(bg, scale_factor)?;
                Ok((
                    Some(corrected),
                    IndexOutcome {
                        index,
                        scale_factor,
                        converged,
                        skipped: None,
                    },
                ))
            })
            .collect::<Result<_>>()?;

        let mut corrected = Vec::with_capacity(results.len());
        let mut report = SubtractionReport::default();
        for (spectrum, outcome) in results {
            corrected.push(spectrum);
            report.outcomes.push(outcome);
        }
        Ok((corrected, report))
    }

    /// Stacks per-index corrected spectra into the combined
    /// index-vs-energy matrix, preserving bin errors. Skipped indices
    /// leave zero rows.
    pub fn assemble_matrix(&self, corrected: &[Option<Spectrum1D>]) -> Result<Spectrum2D> {
        let template = corrected
            .iter()
            .flatten()
            .next()
            .ok_or(angcorr_core::Error::NoUsableIndices)?;
        let mut matrix = Spectrum2D::new(
            corrected.len(),
            0.0,
            corrected.len() as f64,
            template.n_bins(),
            template.lo(),
            template.hi(),
        )?;
        for (index, spectrum) in corrected.iter().enumerate() {
            let Some(spectrum) = spectrum else { continue };
            for bin in 0..spectrum.n_bins() {
                matrix.set_bin(index, bin, spectrum.value(bin), spectrum.variance(bin))?;
            }
        }
        Ok(matrix)
    }

    /// Runs all stages over a source and background dataset.
    pub fn run(
        &self,
        source: &DatasetInput,
        background: &DatasetInput,
        scale_table: Option<&ScaleFactorTable>,
    ) -> Result<SubtractionOutput> {
        let source_corrected = self.subtract_time_random(source, DatasetRole::Source)?;
        let background_corrected =
            self.subtract_time_random(background, DatasetRole::Background)?;

        let (corrected, report) =
            self.subtract_room_background(&source_corrected, &background_corrected, scale_table)?;

        let mut total = source.prompt.empty_column_spectrum()?;
        for spectrum in corrected.iter().flatten() {
            total.add_scaled(spectrum, 1.0)?;
        }
        let matrix = self.assemble_matrix(&corrected)?;
        let scale_factors = ScaleFactorTable::new(
            report
                .outcomes
                .iter()
                .map(|outcome| outcome.scale_factor)
                .collect(),
        );

        Ok(SubtractionOutput {
            time_random_corrected: source_corrected,
            background_corrected: corrected,
            total,
            matrix,
            scale_factors,
            report,
        })
    }
}

/// Projects per-index pair matrices through a sum-energy gate,
/// producing the combined index-vs-gamma-energy matrix for one gate
/// mode.
///
/// The pair matrices carry the summed pair energy on the row axis and
/// the higher-energy partner on the column axis. `Upper` keeps that
/// partner directly; `Lower` reconstructs the other partner by
/// reflecting each column about the gate-center bin; `Both` is their
/// union.
///
/// A gate that misses the sum-energy axis entirely is a configuration
/// error; a gate edge overhanging the axis clamps to it.
pub fn gated_projection(
    pair_matrices: &[Spectrum2D],
    gate: GateWindow,
    mode: GateMode,
) -> Result<Spectrum2D> {
    let template = pair_matrices
        .first()
        .ok_or(angcorr_core::Error::NoUsableIndices)?;
    let gamma_axis = template.empty_column_spectrum()?;
    let mut matrix = Spectrum2D::new(
        pair_matrices.len(),
        0.0,
        pair_matrices.len() as f64,
        gamma_axis.n_bins(),
        gamma_axis.lo(),
        gamma_axis.hi(),
    )?;

    for (index, pair) in pair_matrices.iter().enumerate() {
        if gate.high_kev <= pair.row_lo() || gate.low_kev >= pair.row_hi() {
            return Err(angcorr_core::Error::GateOutsideAxis {
                low: gate.low_kev,
                high: gate.high_kev,
            });
        }
        let lo_row = pair.row_index(gate.low_kev).unwrap_or(0);
        let hi_row = pair
            .row_index(gate.high_kev)
            .unwrap_or(pair.n_rows() - 1);
        let upper = pair.project_rows(lo_row, hi_row)?;

        let gated = match mode {
            GateMode::Upper => upper,
            GateMode::Lower => mirror_about_gate(&upper, gate)?,
            GateMode::Both => {
                let mut both = upper.clone();
                both.add_scaled(&mirror_about_gate(&upper, gate)?, 1.0)?;
                both
            }
        };
        for bin in 0..gated.n_bins() {
            matrix.set_bin(index, bin, gated.value(bin), gated.variance(bin))?;
        }
    }
    Ok(matrix)
}

/// Reflects a gated spectrum about the gate-center bin: the partner of
/// a gamma in bin `b` of a pair summing to the gate energy sits in bin
/// `gate_bin - b`.
fn mirror_about_gate(upper: &Spectrum1D, gate: GateWindow) -> Result<Spectrum1D> {
    let mut lower = Spectrum1D::new(upper.n_bins(), upper.lo(), upper.hi())?;
    let Some(gate_bin) = upper.bin_index(gate.center()) else {
        return Ok(lower);
    };
    for bin in 0..=gate_bin {
        let partner = gate_bin - bin;
        lower.set_bin(partner, upper.value(bin), upper.variance(bin))?;
    }
    Ok(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const N_INDICES: usize = 3;
    const E_BINS: usize = 50;
    const E_MAX: f64 = 3000.0;

    /// Dataset where every index's prompt spectrum is `base + peak`
    /// counts per bin and the time-random matrices reproduce a flat
    /// `random` counts per energy bin in each delayed slice.
    fn make_dataset(prompt_level: f64, random_level: f64) -> DatasetInput {
        let mut prompt = Spectrum2D::new(N_INDICES, 0.0, N_INDICES as f64, E_BINS, 0.0, E_MAX)
            .unwrap();
        for row in 0..N_INDICES {
            for col in 0..E_BINS {
                prompt.set_bin(row, col, prompt_level, prompt_level).unwrap();
            }
        }
        let edges = [510.0, 617.0, 725.0, 832.0, 940.0];
        let time_random = (0..N_INDICES)
            .map(|_| {
                let mut matrix =
                    Spectrum2D::new(E_BINS, 0.0, E_MAX, 1000, 0.0, 1000.0).unwrap();
                for row in 0..E_BINS {
                    for &edge in &edges {
                        let col = matrix.col_index(edge + 5.0).unwrap();
                        matrix.set_bin(row, col, random_level, random_level).unwrap();
                    }
                }
                Some(matrix)
            })
            .collect();
        DatasetInput { prompt, time_random }
    }

    fn quiet_pipeline() -> SubtractionPipeline {
        SubtractionPipeline::new(PipelineConfig {
            min_counts: 10.0,
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn test_time_random_subtraction_uses_unit_coefficient() {
        let input = make_dataset(100.0, 20.0);
        let corrected = quiet_pipeline()
            .subtract_time_random(&input, DatasetRole::Source)
            .unwrap();

        assert_eq!(corrected.len(), N_INDICES);
        for spectrum in corrected.iter().map(|s| s.as_ref().unwrap()) {
            // Five slices of 20 counts averaged to 20, subtracted once.
            assert_relative_eq!(spectrum.value(10), 80.0);
            // Prompt variance plus averaged-estimate variance.
            assert_relative_eq!(spectrum.variance(10), 100.0 + 5.0 * 20.0 / 25.0);
        }
    }

    #[test]
    fn test_missing_time_random_index_is_skipped() {
        let mut input = make_dataset(100.0, 0.0);
        input.time_random[1] = None;
        let corrected = quiet_pipeline()
            .subtract_time_random(&input, DatasetRole::Source)
            .unwrap();

        assert!(corrected[0].is_some());
        assert!(corrected[1].is_none());
        assert!(corrected[2].is_some());
    }

    #[test]
    fn test_room_background_with_persisted_table() {
        let pipeline = quiet_pipeline();
        let source = quiet_pipeline()
            .subtract_time_random(&make_dataset(100.0, 0.0), DatasetRole::Source)
            .unwrap();
        let background = quiet_pipeline()
            .subtract_time_random(&make_dataset(40.0, 0.0), DatasetRole::Background)
            .unwrap();
        let table = ScaleFactorTable::new(vec![0.5, 1.0, 2.0]);

        let (corrected, report) = pipeline
            .subtract_room_background(&source, &background, Some(&table))
            .unwrap();

        assert_relative_eq!(corrected[0].as_ref().unwrap().value(7), 100.0 - 0.5 * 40.0);
        assert_relative_eq!(corrected[1].as_ref().unwrap().value(7), 100.0 - 40.0);
        assert_relative_eq!(corrected[2].as_ref().unwrap().value(7), 100.0 - 2.0 * 40.0);
        assert_eq!(report.n_skipped(), 0);
        assert_eq!(report.n_unconverged(), 0);
        assert_relative_eq!(report.outcomes[2].scale_factor, 2.0);
    }

    #[test]
    fn test_low_statistics_index_is_skipped_not_zeroed() {
        let pipeline = SubtractionPipeline::new(PipelineConfig {
            min_counts: 100.0,
            ..PipelineConfig::default()
        });
        let source = pipeline
            .subtract_time_random(&make_dataset(100.0, 0.0), DatasetRole::Source)
            .unwrap();
        // Background has ~1 count per bin: far below the threshold.
        let background = pipeline
            .subtract_time_random(&make_dataset(1.0, 0.0), DatasetRole::Background)
            .unwrap();
        let table = ScaleFactorTable::uniform(N_INDICES, 1.0);

        let (corrected, report) = pipeline
            .subtract_room_background(&source, &background, Some(&table))
            .unwrap();

        assert!(corrected.iter().all(Option::is_none));
        assert_eq!(report.n_skipped(), N_INDICES);
        assert!(matches!(
            report.outcomes[0].skipped,
            Some(SkipReason::LowStatistics { .. })
        ));
    }

    #[test]
    fn test_matrix_assembly_preserves_errors() {
        let pipeline = quiet_pipeline();
        let mut spectra: Vec<Option<Spectrum1D>> = Vec::new();
        for index in 0..3 {
            let mut s = Spectrum1D::new(10, 0.0, 1000.0).unwrap();
            s.set_bin(4, index as f64 + 1.0, 0.25).unwrap();
            spectra.push(Some(s));
        }
        spectra[1] = None;

        let matrix = pipeline.assemble_matrix(&spectra).unwrap();
        assert_eq!(matrix.n_rows(), 3);
        assert_relative_eq!(matrix.value(0, 4), 1.0);
        assert_relative_eq!(matrix.variance(0, 4), 0.25);
        assert_relative_eq!(matrix.value(1, 4), 0.0);
        assert_relative_eq!(matrix.value(2, 4), 3.0);
    }

    #[test]
    fn test_full_run_reports_and_persistable_factors() {
        let pipeline = quiet_pipeline();
        let source = make_dataset(200.0, 25.0);
        let background = make_dataset(50.0, 10.0);
        let table = ScaleFactorTable::uniform(N_INDICES, 1.0);

        let output = pipeline.run(&source, &background, Some(&table)).unwrap();

        assert_eq!(output.report.outcomes.len(), N_INDICES);
        assert_eq!(output.scale_factors.len(), N_INDICES);
        assert_eq!(output.matrix.n_rows(), N_INDICES);
        // source prompt 200 - averaged 25, background 50 - averaged 10.
        let expected = (200.0 - 25.0) - (50.0 - 10.0);
        assert_relative_eq!(output.background_corrected[0].as_ref().unwrap().value(3), expected);
        assert_relative_eq!(output.matrix.value(0, 3), expected);
        assert_relative_eq!(output.total.value(3), N_INDICES as f64 * expected);
        assert_eq!(output.report.summary(), "3 indices: 3 subtracted, 0 skipped, 0 unoptimized");
    }

    #[test]
    fn test_gated_projection_modes() {
        // One pair matrix: sum-energy rows, higher-partner columns,
        // 30 bins of 100 keV.
        let mut pair = Spectrum2D::new(30, 0.0, E_MAX, 30, 0.0, E_MAX).unwrap();
        // Pair summing to 2500 keV with the higher partner at 1500 keV.
        pair.set_bin(25, 15, 8.0, 8.0).unwrap();
        // Pair outside the gate.
        pair.set_bin(10, 6, 5.0, 5.0).unwrap();
        let gate = GateWindow::new(2400.0, 2600.0).unwrap();

        let upper = gated_projection(&[pair.clone()], gate, GateMode::Upper).unwrap();
        assert_relative_eq!(upper.value(0, 15), 8.0);
        assert_relative_eq!(upper.value(0, 6), 0.0);

        // Partner bin: gate center 2500 -> bin 25, partner = 25 - 15.
        let lower = gated_projection(&[pair.clone()], gate, GateMode::Lower).unwrap();
        assert_relative_eq!(lower.value(0, 10), 8.0);
        assert_relative_eq!(lower.value(0, 15), 0.0);

        let both = gated_projection(&[pair], gate, GateMode::Both).unwrap();
        assert_relative_eq!(both.value(0, 15), 8.0);
        assert_relative_eq!(both.value(0, 10), 8.0);
    }

    #[test]
    fn test_gate_outside_axis_is_rejected() {
        let mut pair = Spectrum2D::new(30, 0.0, E_MAX, 30, 0.0, E_MAX).unwrap();
        // Pair summing to 1050 keV; a gate past the end of the axis
        // must not see it.
        pair.set_bin(10, 6, 5.0, 5.0).unwrap();

        let above = GateWindow::new(3500.0, 3800.0).unwrap();
        assert!(matches!(
            gated_projection(&[pair.clone()], above, GateMode::Upper),
            Err(angcorr_core::Error::GateOutsideAxis { .. })
        ));
        let below = GateWindow::new(-200.0, -100.0).unwrap();
        assert!(matches!(
            gated_projection(&[pair], below, GateMode::Upper),
            Err(angcorr_core::Error::GateOutsideAxis { .. })
        ));
    }

    #[test]
    fn test_overhanging_gate_edge_clamps_to_axis() {
        let mut pair = Spectrum2D::new(30, 0.0, E_MAX, 30, 0.0, E_MAX).unwrap();
        pair.set_bin(29, 20, 3.0, 3.0).unwrap();

        // Upper edge past the axis end: the gate still covers its
        // on-axis rows.
        let gate = GateWindow::new(2900.0, 3200.0).unwrap();
        let out = gated_projection(&[pair], gate, GateMode::Upper).unwrap();
        assert_relative_eq!(out.value(0, 20), 3.0);
    }

    #[test]
    fn test_missing_background_is_reported_with_its_role() {
        let pipeline = quiet_pipeline();
        let source = pipeline
            .subtract_time_random(&make_dataset(100.0, 0.0), DatasetRole::Source)
            .unwrap();
        let mut background_input = make_dataset(100.0, 0.0);
        background_input.time_random[1] = None;
        let background = pipeline
            .subtract_time_random(&background_input, DatasetRole::Background)
            .unwrap();
        let table = ScaleFactorTable::uniform(N_INDICES, 1.0);

        let (corrected, report) = pipeline
            .subtract_room_background(&source, &background, Some(&table))
            .unwrap();

        assert!(corrected[1].is_none());
        assert_eq!(
            report.outcomes[1].skipped,
            Some(SkipReason::MissingSpectrum {
                role: DatasetRole::Background
            })
        );
        assert!(report.outcomes[0].skipped.is_none());
    }
}
