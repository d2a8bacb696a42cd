//! The regression family.
//!
//! Every model follows the same single-call contract: hand in paired samples,
//! get back a small coefficient vector (or an error). Two paths implement it:
//!
//! - the polynomial family (`poly`): linear / parabolic / degree-N, solved by
//!   one direct weighted least-squares pass
//! - the nonlinear family (`shape`): logarithmic / exponential, solved by
//!   profiling the single shape parameter over a deterministic grid with a
//!   weighted least-squares solve per candidate
//!
//! `selection` layers BIC-based model choice on top for `--model auto`.

pub mod model;
pub mod poly;
pub mod selection;
pub mod shape;

pub use model::*;
pub use poly::*;
pub use selection::*;
pub use shape::*;

use crate::domain::{FitConfig, ModelKind, SamplePoint};
use crate::error::AppError;

/// Fitting options for the nonlinear (shape-parameter) family.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Exponential rate magnitude bounds for the grid search.
    pub rate_min: f64,
    pub rate_max: f64,
    /// Upper bound of the logarithmic shift grid (lower bound is 0).
    pub shift_max: f64,
    /// Grid steps per shape dimension.
    pub grid_steps: usize,
    /// Ternary-search iterations between the best candidate's grid neighbors.
    pub refine_iters: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            rate_min: 1e-3,
            rate_max: 1e3,
            shift_max: 100.0,
            grid_steps: 60,
            refine_iters: 48,
        }
    }
}

impl FitOptions {
    pub fn from_config(config: &FitConfig) -> Self {
        Self {
            rate_min: config.rate_min,
            rate_max: config.rate_max,
            shift_max: config.shift_max,
            grid_steps: config.grid_steps,
            refine_iters: config.refine_iters,
        }
    }
}

/// Best fit for a single model kind.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub kind: ModelKind,
    /// Linear coefficients, constant term first.
    pub coeffs: Vec<f64>,
    /// Shape parameters (empty for the polynomial family).
    pub shape: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
}

impl ModelFit {
    pub fn predict_at(&self, x: f64) -> f64 {
        predict(self.kind, x, &self.coeffs, &self.shape)
    }

    /// Slope of a linear fit.
    pub fn slope(&self) -> Option<f64> {
        match self.kind {
            ModelKind::Linear => Some(self.coeffs[1]),
            _ => None,
        }
    }

    /// Constant term of a polynomial-family fit.
    pub fn intercept(&self) -> Option<f64> {
        if self.kind.is_polynomial() {
            self.coeffs.first().copied()
        } else {
            None
        }
    }

    /// Vertex `(x, y)` of a parabolic fit with nonzero curvature.
    pub fn vertex(&self) -> Option<(f64, f64)> {
        match self.kind {
            ModelKind::Parabolic if self.coeffs[2] != 0.0 => {
                let x = -self.coeffs[1] / (2.0 * self.coeffs[2]);
                Some((x, self.predict_at(x)))
            }
            _ => None,
        }
    }

    /// Time constant `τ = -1/b` of a decaying exponential fit.
    ///
    /// This is the quantity the ADC mux characterization is after: the RC
    /// constant of each sensor's discharge.
    pub fn time_constant(&self) -> Option<f64> {
        match self.kind {
            ModelKind::Exponential if self.shape[0] < 0.0 => Some(-1.0 / self.shape[0]),
            _ => None,
        }
    }
}

/// Fit a single model kind to the given samples.
///
/// Fails with exit code 3 when there are fewer points than free parameters,
/// and with exit code 2 when the samples are not numerically well formed.
pub fn fit_model(
    kind: ModelKind,
    points: &[SamplePoint],
    opts: &FitOptions,
) -> Result<ModelFit, AppError> {
    validate_points(points)?;
    let k = kind.param_count();
    if points.len() < k {
        return Err(AppError::no_data(format!(
            "Underdetermined fit for {}: {} point(s) for {k} free parameter(s).",
            kind.display_name(),
            points.len()
        )));
    }

    if kind.is_polynomial() {
        poly::fit_polynomial(kind, points)
    } else {
        shape::fit_shaped(kind, points, opts)
    }
}

fn validate_points(points: &[SamplePoint]) -> Result<(), AppError> {
    if points.is_empty() {
        return Err(AppError::no_data("No data points to fit."));
    }
    for p in points {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(AppError::usage(format!(
                "Non-finite sample at index {}: x={}, y={}.",
                p.index, p.x, p.y
            )));
        }
        if !(p.weight.is_finite() && p.weight > 0.0) {
            return Err(AppError::usage(format!(
                "Invalid weight at index {}: {} (must be finite and > 0).",
                p.index, p.weight
            )));
        }
    }
    Ok(())
}

/// Weighted sum of squared residuals for the given parameters.
pub(crate) fn weighted_sse(
    kind: ModelKind,
    points: &[SamplePoint],
    coeffs: &[f64],
    shape: &[f64],
) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = p.y - predict(kind, p.x, coeffs, shape);
            p.weight * r * r
        })
        .sum()
}
