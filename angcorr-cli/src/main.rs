//! Command-line driver for angle-binned coincidence accumulation and
//! background subtraction.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};

use angcorr_analysis::{
    gated_projection, AccumulateConfig, Accumulator, DatasetInput, GateMode, GateWindow,
    OptimizerConfig, PipelineConfig, SubtractionOutput, SubtractionPipeline,
};
use angcorr_core::{AngleTable, ScaleFactorTable, Spectrum2D};
use angcorr_io::{read_events_csv, read_scale_factors, write_scale_factors, HistogramStore};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

mod names {
    //! Store namespaces and spectrum names shared across pipeline
    //! stages.
    pub const PROMPT: &str = "prompt";
    pub const TIME_RANDOM: &str = "time_random";
    pub const PAIRS: &str = "pairs";
    pub const DIAGNOSTICS: &str = "diagnostics";
    pub const TR_CORRECTED: &str = "time_random_corrected";
    pub const BG_SUBTRACTED: &str = "room_background_subtracted";
    pub const MATRICES: &str = "matrices";

    pub const SUM_ENERGY_ANGLE: &str = "sum_energy_angle";
    pub const INDEX_ENERGY_MATRIX: &str = "index_energy_matrix";

    pub fn index_time_random(index: usize) -> String {
        format!("index_{index:02}_sum_tr")
    }

    pub fn index_pairs(index: usize) -> String {
        format!("index_{index:02}_sum_gamma")
    }

    pub fn index_spectrum(index: usize) -> String {
        format!("index_{index:02}")
    }

    pub fn gated(mode_label: &str) -> String {
        format!("gated_{mode_label}")
    }
}

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    AngcorrIo(#[from] angcorr_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] angcorr_core::Error),

    #[error("invalid gate window: [{low}, {high}]")]
    InvalidGate { low: f64, high: f64 },
}

/// Angle-binned gamma-gamma coincidence background subtraction.
#[derive(Parser)]
#[command(name = "angcorr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accumulate preprocessed events into a histogram file
    Histogram {
        /// Input event CSV file
        input: PathBuf,

        /// Output histogram file path
        #[arg(short, long)]
        output: PathBuf,

        /// Also build per-index pair matrices (needed for gating)
        #[arg(long)]
        pair_matrices: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run full background subtraction on a source/background pair
    Subtract {
        /// Source histogram file
        source: PathBuf,

        /// Room-background histogram file
        background: PathBuf,

        /// Output histogram file path
        #[arg(short, long, default_value = "bg_subtracted_histograms.json")]
        output: PathBuf,

        /// Scale-factor table path (read unless --optimize, always
        /// rewritten with the factors applied)
        #[arg(long, default_value = "bg_scaling.txt")]
        scale_table: PathBuf,

        /// Recompute scale factors by chi-square optimization
        #[arg(long)]
        optimize: bool,

        /// Reference background peak position (keV)
        #[arg(long, default_value = "1460.0")]
        peak: f64,

        /// Grid steps for the optimizer
        #[arg(long, default_value = "100")]
        steps: usize,

        /// Lower sum-energy gate edge (keV); enables gated matrices
        #[arg(long)]
        gate_low: Option<f64>,

        /// Upper sum-energy gate edge (keV)
        #[arg(long)]
        gate_high: Option<f64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Build plain and gated angular matrices from one histogram file
    Matrices {
        /// Input histogram file
        input: PathBuf,

        /// Output histogram file path
        #[arg(short, long, default_value = "angular_matrices.json")]
        output: PathBuf,

        /// Lower sum-energy gate edge (keV)
        #[arg(long)]
        gate_low: Option<f64>,

        /// Upper sum-energy gate edge (keV)
        #[arg(long)]
        gate_high: Option<f64>,
    },

    /// Show information about a histogram file
    Info {
        /// Input histogram file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Histogram {
            input,
            output,
            pair_matrices,
            verbose,
        } => run_histogram(&input, &output, pair_matrices, verbose),

        Commands::Subtract {
            source,
            background,
            output,
            scale_table,
            optimize,
            peak,
            steps,
            gate_low,
            gate_high,
            verbose,
        } => run_subtract(&SubtractArgs {
            source,
            background,
            output,
            scale_table,
            optimize,
            peak,
            steps,
            gate: parse_gate(gate_low, gate_high)?,
            verbose,
        }),

        Commands::Matrices {
            input,
            output,
            gate_low,
            gate_high,
        } => run_matrices(&input, &output, parse_gate(gate_low, gate_high)?),

        Commands::Info { input } => run_info(&input),
    }
}

struct SubtractArgs {
    source: PathBuf,
    background: PathBuf,
    output: PathBuf,
    scale_table: PathBuf,
    optimize: bool,
    peak: f64,
    steps: usize,
    gate: Option<GateWindow>,
    verbose: bool,
}

fn parse_gate(low: Option<f64>, high: Option<f64>) -> Result<Option<GateWindow>> {
    match (low, high) {
        (Some(low), Some(high)) => GateWindow::new(low, high)
            .map(Some)
            .ok_or(CliError::InvalidGate { low, high }),
        (None, None) => Ok(None),
        (low, high) => Err(CliError::InvalidGate {
            low: low.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
        }),
    }
}

fn run_histogram(input: &Path, output: &Path, pair_matrices: bool, verbose: bool) -> Result<()> {
    let start = Instant::now();
    let events = read_events_csv(input)?;
    if verbose {
        eprintln!("Read {} events from {}", events.len(), input.display());
    }

    let config = AccumulateConfig {
        build_pair_matrices: pair_matrices,
        ..AccumulateConfig::default()
    };
    let mut accumulator = Accumulator::new(AngleTable::griffin(), config)?;
    for event in &events {
        accumulator.process_event(event);
    }
    if verbose {
        eprintln!(
            "Kept {} of {} events after filtering",
            accumulator.events_kept(),
            accumulator.events_seen()
        );
    }

    let histograms = accumulator.finish();
    let mut store = HistogramStore::new();
    store.insert_2d(names::PROMPT, names::SUM_ENERGY_ANGLE, histograms.prompt);
    for (index, matrix) in histograms.time_random.into_iter().enumerate() {
        store.insert_2d(names::TIME_RANDOM, &names::index_time_random(index), matrix);
    }
    for (index, matrix) in histograms.pair.into_iter().enumerate() {
        store.insert_2d(names::PAIRS, &names::index_pairs(index), matrix);
    }
    store.insert_1d(names::DIAGNOSTICS, "gamma_energy", histograms.gamma_singles);
    store.insert_1d(names::DIAGNOSTICS, "delta_t", histograms.delta_t);
    store.insert_1d(names::DIAGNOSTICS, "sum_energy", histograms.sum_energy);
    store.insert_1d(
        names::DIAGNOSTICS,
        "sum_energy_time_random",
        histograms.sum_energy_time_random,
    );
    store.insert_2d(names::DIAGNOSTICS, "energy_channel", histograms.energy_detector);
    store.save(output)?;

    println!(
        "Wrote {} spectra to {} in {:.2}s",
        store.len(),
        output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_subtract(args: &SubtractArgs) -> Result<()> {
    let start = Instant::now();
    let source_store = HistogramStore::open(&args.source)?;
    let background_store = HistogramStore::open(&args.background)?;
    if args.verbose {
        eprintln!("Source: {}", args.source.display());
        eprintln!("Background: {}", args.background.display());
    }

    let source = load_dataset(&source_store, args.verbose)?;
    let background = load_dataset(&background_store, args.verbose)?;
    let n_indices = source.n_indices();

    // A persisted table is used as-is; a missing or malformed one
    // falls back to unit factors unless optimization was requested.
    let scale_table = if args.optimize {
        None
    } else {
        match read_scale_factors(&args.scale_table) {
            Ok(table) => Some(table),
            Err(err) => {
                eprintln!(
                    "Warning: cannot read {}: {err}; using unit scale factors",
                    args.scale_table.display()
                );
                Some(ScaleFactorTable::uniform(n_indices, 1.0))
            }
        }
    };

    let pipeline = SubtractionPipeline::new(PipelineConfig {
        optimizer: OptimizerConfig::default()
            .with_peak_channel(args.peak)
            .with_steps(args.steps),
        recompute_scale_factors: args.optimize,
        ..PipelineConfig::default()
    });
    if args.optimize {
        println!("Optimizing background subtraction factors ...");
    } else {
        println!("Subtracting room background ...");
    }
    let output = pipeline.run(&source, &background, scale_table.as_ref())?;

    write_scale_factors(&args.scale_table, &output.scale_factors)?;
    let mut out_store = HistogramStore::new();
    write_output(&mut out_store, &output)?;

    if let Some(gate) = args.gate {
        write_gated_matrices(&source_store, &mut out_store, n_indices, gate)?;
    }
    out_store.save(&args.output)?;

    println!("{}", output.report.summary());
    for outcome in &output.report.outcomes {
        if outcome.skipped.is_some() {
            eprintln!("  Skipped index: {}", outcome.index);
        } else if !outcome.converged {
            eprintln!("  Could not optimize index: {}", outcome.index);
        }
    }
    println!(
        "Background subtracted histograms written to: {} ({:.2}s)",
        args.output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_matrices(input: &Path, output: &Path, gate: Option<GateWindow>) -> Result<()> {
    let store = HistogramStore::open(input)?;
    let prompt = store.get_2d(names::PROMPT, names::SUM_ENERGY_ANGLE)?;

    let mut out_store = HistogramStore::new();
    out_store.insert_2d(names::MATRICES, names::INDEX_ENERGY_MATRIX, prompt.clone());
    if let Some(gate) = gate {
        write_gated_matrices(&store, &mut out_store, prompt.n_rows(), gate)?;
    }
    out_store.save(output)?;

    println!("Angular matrices written to: {}", output.display());
    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let store = HistogramStore::open(input)?;
    println!("File: {}", input.display());
    println!("Spectra: {}", store.len());
    for key in store.keys() {
        println!("  {key}");
    }
    Ok(())
}

/// Assembles a pipeline dataset from a histogram store. Missing
/// per-index time-random matrices become `None` slots the pipeline
/// skips with a diagnostic.
fn load_dataset(store: &HistogramStore, verbose: bool) -> Result<DatasetInput> {
    let prompt = store
        .get_2d(names::PROMPT, names::SUM_ENERGY_ANGLE)?
        .clone();
    let time_random = (0..prompt.n_rows())
        .map(|index| {
            let name = names::index_time_random(index);
            match store.get_2d(names::TIME_RANDOM, &name) {
                Ok(matrix) => Some(matrix.clone()),
                Err(_) => {
                    if verbose {
                        eprintln!("  No time-random matrix for index {index}");
                    }
                    None
                }
            }
        })
        .collect();
    Ok(DatasetInput { prompt, time_random })
}

fn write_output(store: &mut HistogramStore, output: &SubtractionOutput) -> Result<()> {
    for (index, spectrum) in output.time_random_corrected.iter().enumerate() {
        if let Some(spectrum) = spectrum {
            store.insert_1d(names::TR_CORRECTED, &names::index_spectrum(index), spectrum.clone());
        }
    }
    for (index, spectrum) in output.background_corrected.iter().enumerate() {
        if let Some(spectrum) = spectrum {
            store.insert_1d(names::BG_SUBTRACTED, &names::index_spectrum(index), spectrum.clone());
        }
    }
    store.insert_1d(names::BG_SUBTRACTED, "total", output.total.clone());
    store.insert_2d(names::MATRICES, names::INDEX_ENERGY_MATRIX, output.matrix.clone());
    Ok(())
}

/// Builds the three gated matrices from a store's per-index pair
/// matrices. Indices without pair data contribute empty rows.
fn write_gated_matrices(
    input_store: &HistogramStore,
    out_store: &mut HistogramStore,
    n_indices: usize,
    gate: GateWindow,
) -> Result<()> {
    let mut template: Option<Spectrum2D> = None;
    for index in 0..n_indices {
        if let Ok(matrix) = input_store.get_2d(names::PAIRS, &names::index_pairs(index)) {
            template = Some(matrix.clone());
            break;
        }
    }
    let Some(template) = template else {
        eprintln!("Warning: no pair matrices found, skipping gated projection");
        return Ok(());
    };
    let empty = Spectrum2D::new(
        template.n_rows(),
        template.row_lo(),
        template.row_hi(),
        template.n_cols(),
        template.col_lo(),
        template.col_hi(),
    )?;

    let pair_matrices: Vec<Spectrum2D> = (0..n_indices)
        .map(|index| {
            input_store
                .get_2d(names::PAIRS, &names::index_pairs(index))
                .map(Clone::clone)
                .unwrap_or_else(|_| {
                    eprintln!("  No pair matrix for index {index}");
                    empty.clone()
                })
        })
        .collect();

    for (mode, label) in [
        (GateMode::Upper, "upper"),
        (GateMode::Lower, "lower"),
        (GateMode::Both, "both"),
    ] {
        let matrix = gated_projection(&pair_matrices, gate, mode)?;
        out_store.insert_2d(names::MATRICES, &names::gated(label), matrix);
    }
    Ok(())
}
