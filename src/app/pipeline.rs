//! Shared fit-pipeline logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> fit/select -> residuals -> deviation ranking
//!
//! The CLI front-end focuses on presentation, and the integration tests get a
//! process-free entry point.

use crate::domain::{FitConfig, PointResidual};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_samples};
use crate::regress::FitOptions;
use crate::regress::selection::{FitSelection, fit_and_select};
use crate::report::{compute_residuals, rank_deviations};

/// All computed outputs of a single `mux fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub selection: FitSelection,
    pub residuals: Vec<PointResidual>,
    pub worst: Vec<PointResidual>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_samples(config)?;
    run_fit_with_data(config, ingest)
}

/// Execute the fitting pipeline with pre-loaded data.
///
/// Useful for tests that build datasets in memory.
pub fn run_fit_with_data(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let kinds = config.model_spec.kinds(config.degree);
    let opts = FitOptions::from_config(config);
    let selection = fit_and_select(
        &ingest.points,
        &kinds,
        config.model_spec.is_single(),
        &opts,
    )?;

    let residuals = compute_residuals(&ingest.points, &selection.best)?;
    let worst = rank_deviations(&residuals, config.top_n);

    Ok(RunOutput {
        ingest,
        selection,
        residuals,
        worst,
    })
}
