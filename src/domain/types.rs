//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which model(s) to fit, as requested on the command line.
///
/// `Auto` fits every family and selects by BIC; `All` fits every family and
/// reports all of them (the best is still marked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    Auto,
    Linear,
    Parabolic,
    /// General polynomial; the degree comes from `--degree`.
    Poly,
    Log,
    Exp,
    All,
}

impl ModelSpec {
    /// Resolve to the concrete model kinds to attempt.
    ///
    /// For `Auto`/`All`, the general polynomial is only included when the
    /// requested degree is above 2; otherwise it would duplicate the linear
    /// or parabolic entry.
    pub fn kinds(self, degree: usize) -> Vec<ModelKind> {
        match self {
            ModelSpec::Linear => vec![ModelKind::Linear],
            ModelSpec::Parabolic => vec![ModelKind::Parabolic],
            ModelSpec::Poly => vec![ModelKind::Poly(degree)],
            ModelSpec::Log => vec![ModelKind::Logarithmic],
            ModelSpec::Exp => vec![ModelKind::Exponential],
            ModelSpec::Auto | ModelSpec::All => {
                let mut kinds = vec![ModelKind::Linear, ModelKind::Parabolic];
                if degree > 2 {
                    kinds.push(ModelKind::Poly(degree));
                }
                kinds.push(ModelKind::Logarithmic);
                kinds.push(ModelKind::Exponential);
                kinds
            }
        }
    }

    /// Whether the caller asked for exactly one model kind.
    pub fn is_single(self) -> bool {
        !matches!(self, ModelSpec::Auto | ModelSpec::All)
    }
}

/// Concrete fitted model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `y = c0 + c1·x`
    Linear,
    /// `y = c0 + c1·x + c2·x²`
    Parabolic,
    /// `y = Σ c_j·x^j` up to the given degree.
    Poly(usize),
    /// `y = c0 + c1·ln(x + x0)` with shift `x0 ≥ 0`.
    Logarithmic,
    /// `y = c0 + c1·e^{b·x}` with rate `b ≠ 0`.
    Exponential,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> String {
        match self {
            ModelKind::Linear => "linear".to_string(),
            ModelKind::Parabolic => "parabolic".to_string(),
            ModelKind::Poly(degree) => format!("poly(deg={degree})"),
            ModelKind::Logarithmic => "logarithmic".to_string(),
            ModelKind::Exponential => "exponential".to_string(),
        }
    }

    /// Number of linear coefficients for this model.
    pub fn coeff_len(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Parabolic => 3,
            ModelKind::Poly(degree) => degree + 1,
            ModelKind::Logarithmic | ModelKind::Exponential => 2,
        }
    }

    /// Number of nonlinear shape parameters for this model.
    pub fn shape_len(self) -> usize {
        match self {
            ModelKind::Linear | ModelKind::Parabolic | ModelKind::Poly(_) => 0,
            ModelKind::Logarithmic | ModelKind::Exponential => 1,
        }
    }

    /// Total free parameter count for information criteria.
    pub fn param_count(self) -> usize {
        self.coeff_len() + self.shape_len()
    }

    /// Whether this kind is solved by a single direct OLS pass.
    pub fn is_polynomial(self) -> bool {
        self.shape_len() == 0
    }
}

/// A normalized observation point used for fitting.
#[derive(Debug, Clone)]
pub struct SamplePoint {
    /// Zero-based readout index (stable across filtering, used in reports).
    pub index: usize,
    pub x: f64,
    pub y: f64,
    /// Observation weight (higher means more influence).
    pub weight: f64,
}

/// Summary stats about the points actually used for fitting.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
}

/// Fitted model parameters and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveModel {
    pub name: ModelKind,
    pub display_name: String,
    /// Linear coefficients, constant term first.
    pub coeffs: Vec<f64>,
    /// Nonlinear shape parameters (empty for the polynomial family).
    pub shape: Vec<f64>,
}

/// Fit output for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: CurveModel,
    pub quality: FitQuality,
}

/// A per-point fitted result (used for deviation ranking and exports).
#[derive(Debug, Clone)]
pub struct PointResidual {
    pub point: SamplePoint,
    pub y_fit: f64,
    pub residual: f64,
}

/// A full `mux fit` run configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    /// Column selection by header name; `None` means positional defaults
    /// (first column = x, second column = y).
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub weight_column: Option<String>,

    pub model_spec: ModelSpec,
    /// Degree used when the general polynomial is requested.
    pub degree: usize,

    /// Shape-grid bounds for the exponential rate magnitude `|b|`.
    pub rate_min: f64,
    pub rate_max: f64,
    /// Upper bound for the logarithmic shift grid (lower bound is 0).
    pub shift_max: f64,
    /// Grid steps per shape dimension.
    pub grid_steps: usize,
    /// Ternary-search iterations after the grid pass.
    pub refine_iters: usize,

    pub top_n: usize,
    pub plot: Option<PathBuf>,
    pub plot_width: u32,
    pub plot_height: u32,
    pub title: Option<String>,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// A saved fit file (JSON).
///
/// This is the portable representation of a fitted curve: model kind and
/// parameters, quality diagnostics, and a precomputed grid for quick
/// re-plotting without access to the raw data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    /// RFC 3339 timestamp of when the fit was produced.
    pub generated: String,
    pub model: CurveModel,
    pub quality: FitQuality,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_counts_match_model_definitions() {
        assert_eq!(ModelKind::Linear.param_count(), 2);
        assert_eq!(ModelKind::Parabolic.param_count(), 3);
        assert_eq!(ModelKind::Poly(4).param_count(), 5);
        assert_eq!(ModelKind::Logarithmic.param_count(), 3);
        assert_eq!(ModelKind::Exponential.param_count(), 3);
    }

    #[test]
    fn auto_spec_skips_duplicate_polynomial() {
        let kinds = ModelSpec::Auto.kinds(2);
        assert!(!kinds.contains(&ModelKind::Poly(2)));
        let kinds = ModelSpec::Auto.kinds(3);
        assert!(kinds.contains(&ModelKind::Poly(3)));
    }
}
