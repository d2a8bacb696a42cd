//! Model evaluation for the regression family.
//!
//! Fitting relies on two primitive operations:
//! - build a design row for a given x and shape parameters (for OLS)
//! - predict y(x) given coefficients and shape parameters (for residuals/plots)
//!
//! These are implemented here for each model kind.

use crate::domain::ModelKind;
use crate::math::{exp_rate, fill_vandermonde_row, ln_shifted};

/// Fill a design row for the given model kind.
///
/// The row includes the constant term first (intercept). Rows may contain
/// non-finite entries for invalid shape candidates (e.g. a logarithmic shift
/// that leaves non-positive arguments); candidate evaluation rejects those.
///
/// # Panics
/// Panics if `out` does not have length `kind.coeff_len()` or `shape` does not
/// have length `kind.shape_len()`. Callers should size these arrays correctly.
pub fn fill_design_row(kind: ModelKind, x: f64, shape: &[f64], out: &mut [f64]) {
    match kind {
        ModelKind::Linear => {
            out[0] = 1.0;
            out[1] = x;
        }
        ModelKind::Parabolic => {
            out[0] = 1.0;
            out[1] = x;
            out[2] = x * x;
        }
        ModelKind::Poly(degree) => fill_vandermonde_row(x, degree, out),
        ModelKind::Logarithmic => {
            out[0] = 1.0;
            out[1] = ln_shifted(x, shape[0]);
        }
        ModelKind::Exponential => {
            out[0] = 1.0;
            out[1] = exp_rate(x, shape[0]);
        }
    }
}

/// Predict `y(x)` for the given model kind.
pub fn predict(kind: ModelKind, x: f64, coeffs: &[f64], shape: &[f64]) -> f64 {
    match kind {
        ModelKind::Linear => coeffs[0] + coeffs[1] * x,
        ModelKind::Parabolic => coeffs[0] + (coeffs[1] + coeffs[2] * x) * x,
        ModelKind::Poly(_) => {
            // Horner evaluation, highest power first.
            coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
        }
        ModelKind::Logarithmic => coeffs[0] + coeffs[1] * ln_shifted(x, shape[0]),
        ModelKind::Exponential => coeffs[0] + coeffs[1] * exp_rate(x, shape[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_row_matches_predict_for_linear() {
        let coeffs = [2.0, -0.5];
        let mut row = [0.0; 2];
        fill_design_row(ModelKind::Linear, 3.0, &[], &mut row);
        let dot: f64 = row.iter().zip(coeffs.iter()).map(|(r, c)| r * c).sum();
        assert!((dot - predict(ModelKind::Linear, 3.0, &coeffs, &[])).abs() < 1e-12);
    }

    #[test]
    fn horner_matches_naive_polynomial() {
        let coeffs = [1.0, -2.0, 0.5, 3.0];
        let x: f64 = 1.7;
        let naive: f64 = coeffs
            .iter()
            .enumerate()
            .map(|(j, &c)| c * x.powi(j as i32))
            .sum();
        let y = predict(ModelKind::Poly(3), x, &coeffs, &[]);
        assert!((y - naive).abs() < 1e-12);
    }

    #[test]
    fn exponential_predict_smoke() {
        let y = predict(ModelKind::Exponential, 2.0, &[1.0, 3.0], &[-0.5]);
        assert!((y - (1.0 + 3.0 * (-1.0f64).exp())).abs() < 1e-12);
    }
}
