//! Reporting utilities: residuals, deviation rankings, and column statistics.
//!
//! Formatting lives in `format` so the math/fitting code stays clean and
//! output changes are localized.

pub mod format;

pub use format::*;

use crate::domain::{FitResult, PointResidual, SamplePoint};
use crate::error::AppError;
use crate::regress::predict;

/// Compute fitted values and residuals for each point.
pub fn compute_residuals(
    points: &[SamplePoint],
    fit: &FitResult,
) -> Result<Vec<PointResidual>, AppError> {
    let mut out = Vec::with_capacity(points.len());
    for p in points {
        let y_fit = predict(fit.model.name, p.x, &fit.model.coeffs, &fit.model.shape);
        if !y_fit.is_finite() {
            return Err(AppError::numeric(
                "Non-finite model prediction during residual computation.",
            ));
        }
        let residual = p.y - y_fit;
        out.push(PointResidual {
            point: p.clone(),
            y_fit,
            residual,
        });
    }
    Ok(out)
}

/// Rank the top-N points by absolute deviation from the fitted curve.
pub fn rank_deviations(residuals: &[PointResidual], top_n: usize) -> Vec<PointResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

/// Per-column summary statistics, the moral equivalent of `describe()` in the
/// capture notebooks.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub name: String,
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n-1 denominator); 0 for a single value.
    pub std: f64,
}

pub fn describe(name: &str, values: &[f64]) -> ColumnStats {
    let n = values.len();
    if n == 0 {
        return ColumnStats {
            name: name.to_string(),
            n: 0,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            std: f64::NAN,
        };
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let mean = sum / n as f64;

    let std = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    ColumnStats {
        name: name.to_string(),
        n,
        min,
        max,
        mean,
        std,
    }
}
