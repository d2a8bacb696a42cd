//! Command-line parsing for the sensor curve-fitting toolkit.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the regression/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::AdcBoard;
use crate::domain::ModelSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "mux",
    version,
    about = "Sensor curve fitting and ADC mux characterization plots"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a regression model to sweep data, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Plot muxed ADC readouts and time constants from a characterization CSV.
    Mux(MuxArgs),
    /// Live terminal view of streaming samples (tails a file, or --demo).
    Watch(WatchArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Data CSV; lines starting with '#' are comments.
    pub data: PathBuf,

    /// X column header (default: first column).
    #[arg(long, value_name = "NAME")]
    pub x_column: Option<String>,

    /// Y column header (default: second column).
    #[arg(long, value_name = "NAME")]
    pub y_column: Option<String>,

    /// Optional weight column header (default: uniform weights).
    #[arg(long, value_name = "NAME")]
    pub weight_column: Option<String>,

    /// Which model(s) to fit.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelSpec::Auto)]
    pub model: ModelSpec,

    /// Polynomial degree for `--model poly` (included in auto when above 2).
    #[arg(long, default_value_t = 3)]
    pub degree: usize,

    /// Minimum |rate| for the exponential grid search.
    #[arg(long, default_value_t = 1e-3)]
    pub rate_min: f64,

    /// Maximum |rate| for the exponential grid search.
    #[arg(long, default_value_t = 1e3)]
    pub rate_max: f64,

    /// Maximum shift for the logarithmic grid search.
    #[arg(long, default_value_t = 100.0)]
    pub shift_max: f64,

    /// Grid steps per shape dimension.
    #[arg(long, default_value_t = 60)]
    pub grid_steps: usize,

    /// Refinement iterations after the grid pass.
    #[arg(long, default_value_t = 48)]
    pub refine_iters: usize,

    /// Show the top-N worst deviations.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write a PNG chart of the fit.
    #[arg(long, value_name = "PNG")]
    pub plot: Option<PathBuf>,

    /// Chart width (pixels).
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Chart height (pixels).
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Chart title (default: model name + date).
    #[arg(long)]
    pub title: Option<String>,

    /// Export per-point results to CSV.
    #[arg(long = "export-results", value_name = "CSV")]
    pub export_results: Option<PathBuf>,

    /// Export the fitted curve (model + params + grid) to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `mux fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Output PNG path.
    #[arg(long, value_name = "PNG")]
    pub out: PathBuf,

    /// Chart width (pixels).
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Chart height (pixels).
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Chart title (default: model name + generated timestamp).
    #[arg(long)]
    pub title: Option<String>,
}

/// Options for the muxed-ADC characterization plot.
#[derive(Debug, Parser)]
pub struct MuxArgs {
    /// Characterization CSV; lines starting with '#' are comments.
    pub data: PathBuf,

    /// Board revision (sets the LSB→volt conversion).
    #[arg(short = 'b', long, value_enum, default_value_t = AdcBoard::M2)]
    pub board: AdcBoard,

    /// Number of leading readout columns; the rest are time constants.
    #[arg(long, default_value_t = 2)]
    pub sensors: usize,

    /// Output PNG path (default: derived from the data filename and date).
    #[arg(long, value_name = "PNG")]
    pub out: Option<PathBuf>,

    /// Also fit an exponential decay to each readout column and report the
    /// recovered time constants.
    #[arg(long)]
    pub fit_decay: bool,

    /// Chart width (pixels).
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Chart height (pixels).
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Chart title.
    #[arg(long)]
    pub title: Option<String>,
}

/// Options for the live view.
#[derive(Debug, Parser, Clone)]
pub struct WatchArgs {
    /// Data file to tail (numeric lines; ','/whitespace separated fields).
    pub data: Option<PathBuf>,

    /// Stream synthetic demo data instead of tailing a file.
    #[arg(long)]
    pub demo: bool,

    /// Number of traces (leading numeric fields per line).
    #[arg(long, default_value_t = 1)]
    pub traces: usize,

    /// Rolling window size in samples (index mode).
    #[arg(long, default_value_t = 256)]
    pub max_points: usize,

    /// Use elapsed seconds on the x-axis instead of the sample index.
    #[arg(long)]
    pub by_time: bool,

    /// Rolling window duration in seconds (time mode).
    #[arg(long, default_value_t = 30.0)]
    pub max_seconds: f64,

    /// View title.
    #[arg(long)]
    pub title: Option<String>,
}
