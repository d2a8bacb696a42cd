//! Weighted least squares solver.
//!
//! Every fit in this project reduces to a small linear regression of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T c)^2
//! ```
//!
//! The polynomial family solves it once; the nonlinear family solves it many
//! times while profiling the shape parameter.
//!
//! Implementation choices:
//! - Rows are scaled by `sqrt(w_i)` so an ordinary least-squares solve applies.
//! - SVD is used to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns). High-degree Vandermonde
//!   columns and near-degenerate shape candidates both produce almost-collinear
//!   columns, so robustness matters more than raw speed here.
//! - Parameter dimension is tiny (2-6 columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(coeffs) = svd.solve(y, tol) {
            if coeffs.iter().all(|v| v.is_finite()) {
                return Some(coeffs);
            }
        }
    }

    None
}
