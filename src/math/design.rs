//! Basis evaluation and shape-parameter grids.
//!
//! The regression family uses two kinds of basis columns:
//!
//! - Vandermonde powers `x^j` for the polynomial models
//! - `ln(x + x0)` and `e^{b·x}` columns for the nonlinear models, where the
//!   shape parameter (`x0` or `b`) is profiled over a deterministic grid
//!
//! Numerical notes:
//! - `ln_shifted` returns NaN for non-positive arguments; candidate evaluation
//!   rejects non-finite design entries, so invalid shifts drop out of the
//!   search instead of poisoning the solve.
//! - `exp_rate` saturates to infinity for large `b·x`; the same rejection
//!   applies.

use crate::error::AppError;

/// Fill `out` with the powers `x^0 .. x^degree`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`. Callers size the row from
/// `ModelKind::coeff_len`, so a mismatch is a programming error.
pub fn fill_vandermonde_row(x: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1);
    let mut pow = 1.0;
    for slot in out.iter_mut() {
        *slot = pow;
        pow *= x;
    }
}

/// `ln(x + x0)`, NaN when the shifted argument is not positive.
pub fn ln_shifted(x: f64, x0: f64) -> f64 {
    let arg = x + x0;
    if arg > 0.0 { arg.ln() } else { f64::NAN }
}

/// `e^{b·x}`.
pub fn exp_rate(x: f64, b: f64) -> f64 {
    (b * x).exp()
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::usage(format!(
            "Invalid grid range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::usage("Grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// Shift grid for the logarithmic model: `{0} ∪ log_space(..)`, ascending.
///
/// A zero shift covers the classic `c0 + c1·ln(x)` fit; the positive tail
/// handles data whose x values start at (or below) zero.
pub fn shift_grid(max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    // The smallest positive shift is tied to the grid top so the grid spans a
    // fixed number of decades regardless of the data scale.
    let min = max * 1e-6;
    let mut grid = vec![0.0];
    grid.extend(log_space(min, max, steps)?);
    Ok(grid)
}

/// Signed rate grid for the exponential model, ascending.
///
/// Covers `[-max, -min] ∪ [min, max]` with `steps` log-spaced magnitudes per
/// sign. Zero is excluded: a zero rate makes the exponential column constant
/// and therefore collinear with the intercept.
pub fn rate_grid(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    let magnitudes = log_space(min, max, steps)?;
    let mut grid: Vec<f64> = magnitudes.iter().rev().map(|m| -m).collect();
    grid.extend(magnitudes.iter().copied());
    Ok(grid)
}
