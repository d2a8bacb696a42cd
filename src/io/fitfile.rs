//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a fitted curve:
//! - model kind + parameters (coefficients and shape)
//! - quality diagnostics
//! - a precomputed fitted grid for quick re-plotting without the raw data
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{CurveGrid, DatasetStats, FitFile, FitResult};
use crate::error::AppError;
use crate::regress::predict;

/// Write a fit JSON file.
pub fn write_fit_json(
    path: &Path,
    best: &FitResult,
    stats: &DatasetStats,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::usage(format!(
            "Failed to create fit JSON '{}': {e}",
            path.display()
        ))
    })?;

    let (x, y) = build_grid(best, stats.x_min, stats.x_max, 101);
    let fit = FitFile {
        tool: "mux".to_string(),
        generated: Local::now().to_rfc3339(),
        model: best.model.clone(),
        quality: best.quality.clone(),
        grid: CurveGrid { x, y },
    };

    serde_json::to_writer_pretty(file, &fit)
        .map_err(|e| AppError::usage(format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::usage(format!("Failed to open fit JSON '{}': {e}", path.display()))
    })?;
    let fit: FitFile = serde_json::from_reader(file)
        .map_err(|e| AppError::usage(format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

/// Evaluate the fitted model on an even grid over the observed x range.
///
/// Grid points where the model is undefined (e.g. a logarithmic fit left of
/// its shift) are dropped rather than serialized as NaN, which JSON cannot
/// represent.
fn build_grid(best: &FitResult, x_min: f64, x_max: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(2);
    let mut x0 = x_min;
    let mut x1 = x_max;
    if !(x0.is_finite() && x1.is_finite()) || x1 <= x0 {
        x0 = 0.0;
        x1 = 1.0;
    }

    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);

    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let x = x0 + u * (x1 - x0);
        let y = predict(best.model.name, x, &best.model.coeffs, &best.model.shape);
        if y.is_finite() {
            xs.push(x);
            ys.push(y);
        }
    }

    (xs, ys)
}
