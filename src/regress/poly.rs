//! Direct weighted least-squares fits for the polynomial family.
//!
//! Linear and parabolic fits are fixed-degree specializations of the same
//! Vandermonde solve; the general polynomial takes its degree from the
//! configuration. One OLS pass, no iteration.

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, SamplePoint};
use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::regress::model::fill_design_row;
use crate::regress::{ModelFit, weighted_sse};

/// Fit a polynomial-family model.
///
/// Callers go through `regress::fit_model`, which has already validated the
/// samples and the parameter count.
pub fn fit_polynomial(kind: ModelKind, points: &[SamplePoint]) -> Result<ModelFit, AppError> {
    debug_assert!(kind.is_polynomial());

    let n = points.len();
    let p = kind.coeff_len();

    // Weighted design matrix: rows scaled by sqrt(w) so OLS minimizes the
    // weighted objective.
    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    for (i, pt) in points.iter().enumerate() {
        fill_design_row(kind, pt.x, &[], &mut row);
        let sw = pt.weight.sqrt();
        for j in 0..p {
            xw[(i, j)] = row[j] * sw;
        }
        yw[i] = pt.y * sw;
    }

    let coeffs = solve_least_squares(&xw, &yw).ok_or_else(|| {
        AppError::numeric(format!(
            "Least-squares solve failed for {} (ill-conditioned design).",
            kind.display_name()
        ))
    })?;
    let coeffs: Vec<f64> = coeffs.iter().copied().collect();

    let sse = weighted_sse(kind, points, &coeffs, &[]);
    if !sse.is_finite() {
        return Err(AppError::numeric(format!(
            "Non-finite residual sum for {}.",
            kind.display_name()
        )));
    }
    let rmse = (sse / n as f64).sqrt();

    Ok(ModelFit {
        kind,
        coeffs,
        shape: Vec::new(),
        sse,
        rmse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points_on(kind: ModelKind, coeffs: &[f64], xs: &[f64]) -> Vec<SamplePoint> {
        xs.iter()
            .enumerate()
            .map(|(index, &x)| SamplePoint {
                index,
                x,
                y: crate::regress::predict(kind, x, coeffs, &[]),
                weight: 1.0,
            })
            .collect()
    }

    #[test]
    fn linear_fit_recovers_slope_and_intercept() {
        let xs: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
        let points = points_on(ModelKind::Linear, &[1.5, -0.75], &xs);

        let fit = fit_polynomial(ModelKind::Linear, &points).unwrap();
        assert_relative_eq!(fit.intercept().unwrap(), 1.5, max_relative = 1e-9);
        assert_relative_eq!(fit.slope().unwrap(), -0.75, max_relative = 1e-9);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn parabolic_fit_recovers_coefficients() {
        let xs: Vec<f64> = (-5..=5).map(|i| i as f64).collect();
        let true_coeffs = [2.0, -1.0, 0.5];
        let points = points_on(ModelKind::Parabolic, &true_coeffs, &xs);

        let fit = fit_polynomial(ModelKind::Parabolic, &points).unwrap();
        for (got, want) in fit.coeffs.iter().zip(true_coeffs.iter()) {
            assert_relative_eq!(got, want, max_relative = 1e-8);
        }
    }

    #[test]
    fn weights_pull_the_line_toward_heavy_points() {
        // Two clusters disagree about the level; the heavy cluster wins.
        let mut points: Vec<SamplePoint> = (0..4)
            .map(|i| SamplePoint {
                index: i,
                x: i as f64,
                y: 0.0,
                weight: 100.0,
            })
            .collect();
        points.extend((4..8).map(|i| SamplePoint {
            index: i,
            x: (i - 4) as f64,
            y: 10.0,
            weight: 0.01,
        }));

        let fit = fit_polynomial(ModelKind::Linear, &points).unwrap();
        assert!(fit.intercept().unwrap() < 0.5);
        assert!(fit.slope().unwrap().abs() < 0.5);
    }
}
