//! Generic nonlinear fit: profiled least squares over a shape grid.
//!
//! The logarithmic and exponential models are nonlinear in exactly one
//! parameter (the shift `x0`, the rate `b`). Given a fixed value for it, the
//! remaining coefficients are linear and fall out of a weighted OLS solve.
//! So instead of a black-box optimizer we:
//!
//! - evaluate every grid candidate independently (parallel): solve the linear
//!   coefficients and score the weighted SSE
//! - pick the lowest SSE, breaking ties by grid index for determinism
//! - run a bounded ternary search between the winner's grid neighbors to
//!   sharpen the shape estimate
//!
//! Grid search avoids the local-minima and initial-guess sensitivity common
//! in nonlinear optimization, and every run is reproducible bit for bit.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{ModelKind, SamplePoint};
use crate::error::AppError;
use crate::math::{rate_grid, shift_grid, solve_least_squares};
use crate::regress::model::fill_design_row;
use crate::regress::{FitOptions, ModelFit, weighted_sse};

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    shape: f64,
    coeffs: Vec<f64>,
    sse: f64,
}

/// Fit a shape-parameter model over its deterministic grid.
///
/// Callers go through `regress::fit_model`, which has already validated the
/// samples and the parameter count.
pub fn fit_shaped(
    kind: ModelKind,
    points: &[SamplePoint],
    opts: &FitOptions,
) -> Result<ModelFit, AppError> {
    debug_assert_eq!(kind.shape_len(), 1);

    let grid = match kind {
        ModelKind::Logarithmic => shift_grid(opts.shift_max, opts.grid_steps)?,
        ModelKind::Exponential => rate_grid(opts.rate_min, opts.rate_max, opts.grid_steps)?,
        _ => {
            return Err(AppError::numeric(format!(
                "Model {} has no shape parameter.",
                kind.display_name()
            )));
        }
    };

    // Evaluate each shape candidate independently (parallel).
    let candidates: Vec<Candidate> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &shape)| {
            evaluate_candidate(kind, shape, points).map(|(coeffs, sse)| Candidate {
                idx,
                shape,
                coeffs,
                sse,
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::numeric(format!(
            "No valid fit candidates for model {} (data outside the model's domain?).",
            kind.display_name()
        )));
    }

    // Deterministic selection: minimum SSE; break ties by original grid index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.sse < best.sse || (c.sse == best.sse && c.idx < best.idx) {
            best = c;
        }
    }
    let mut best = best.clone();

    // Local refinement between the winner's grid neighbors. The SSE profile is
    // smooth in the shape parameter, so a ternary search on the bracketing
    // interval converges quickly.
    let lo = grid[best.idx.saturating_sub(1)];
    let hi = grid[(best.idx + 1).min(grid.len() - 1)];
    if let Some(refined) = refine_shape(kind, points, lo, hi, opts.refine_iters) {
        if refined.sse < best.sse {
            best = refined;
        }
    }

    let n = points.len();
    let rmse = (best.sse / n as f64).sqrt();
    Ok(ModelFit {
        kind,
        coeffs: best.coeffs,
        shape: vec![best.shape],
        sse: best.sse,
        rmse,
    })
}

/// Solve the linear coefficients for a fixed shape value and score the fit.
///
/// Returns `None` when the candidate is invalid: non-finite design entries
/// (e.g. `ln` of a non-positive argument), an unsolvable system, or a
/// non-finite SSE.
fn evaluate_candidate(
    kind: ModelKind,
    shape: f64,
    points: &[SamplePoint],
) -> Option<(Vec<f64>, f64)> {
    let n = points.len();
    let p = kind.coeff_len();

    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];
    let shape_arr = [shape];

    for (i, pt) in points.iter().enumerate() {
        fill_design_row(kind, pt.x, &shape_arr, &mut row);
        if row.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let sw = pt.weight.sqrt();
        for j in 0..p {
            xw[(i, j)] = row[j] * sw;
        }
        yw[i] = pt.y * sw;
    }

    let coeffs = solve_least_squares(&xw, &yw)?;
    let coeffs: Vec<f64> = coeffs.iter().copied().collect();

    let sse = weighted_sse(kind, points, &coeffs, &shape_arr);
    if sse.is_finite() { Some((coeffs, sse)) } else { None }
}

/// Ternary search for the SSE minimum on `[lo, hi]`.
///
/// Invalid probes count as infinitely bad, which steers the bracket back into
/// the valid region. Returns the best evaluated candidate, if any probe was
/// valid at all.
fn refine_shape(
    kind: ModelKind,
    points: &[SamplePoint],
    mut lo: f64,
    mut hi: f64,
    iters: usize,
) -> Option<Candidate> {
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return None;
    }

    let mut best: Option<Candidate> = None;
    let mut consider = |shape: f64, result: &Option<(Vec<f64>, f64)>| {
        if let Some((coeffs, sse)) = result {
            let better = best.as_ref().map(|b| *sse < b.sse).unwrap_or(true);
            if better {
                best = Some(Candidate {
                    idx: 0,
                    shape,
                    coeffs: coeffs.clone(),
                    sse: *sse,
                });
            }
        }
    };

    for _ in 0..iters {
        let third = (hi - lo) / 3.0;
        let m1 = lo + third;
        let m2 = hi - third;

        let r1 = evaluate_candidate(kind, m1, points);
        let r2 = evaluate_candidate(kind, m2, points);
        consider(m1, &r1);
        consider(m2, &r2);

        let s1 = r1.map(|(_, sse)| sse).unwrap_or(f64::INFINITY);
        let s2 = r2.map(|(_, sse)| sse).unwrap_or(f64::INFINITY);
        if s1 <= s2 {
            hi = m2;
        } else {
            lo = m1;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regress::model::predict;
    use approx::assert_relative_eq;

    fn points_on(kind: ModelKind, coeffs: &[f64], shape: &[f64], xs: &[f64]) -> Vec<SamplePoint> {
        xs.iter()
            .enumerate()
            .map(|(index, &x)| SamplePoint {
                index,
                x,
                y: predict(kind, x, coeffs, shape),
                weight: 1.0,
            })
            .collect()
    }

    #[test]
    fn exponential_fit_recovers_rate_and_coefficients() {
        // Decay toward an offset: y = 0.2 + 1.8 e^{-0.7 x}
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        let points = points_on(ModelKind::Exponential, &[0.2, 1.8], &[-0.7], &xs);

        let fit = fit_shaped(ModelKind::Exponential, &points, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.shape[0], -0.7, max_relative = 1e-4);
        assert_relative_eq!(fit.coeffs[0], 0.2, max_relative = 1e-3);
        assert_relative_eq!(fit.coeffs[1], 1.8, max_relative = 1e-3);
        assert_relative_eq!(fit.time_constant().unwrap(), 1.0 / 0.7, max_relative = 1e-4);
    }

    #[test]
    fn exponential_fit_handles_growth() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let points = points_on(ModelKind::Exponential, &[1.0, 0.5], &[1.3], &xs);

        let fit = fit_shaped(ModelKind::Exponential, &points, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.shape[0], 1.3, max_relative = 1e-4);
        assert!(fit.time_constant().is_none());
    }

    #[test]
    fn logarithmic_fit_recovers_plain_log_curve() {
        // Zero shift: y = 0.5 + 2 ln(x)
        let xs: Vec<f64> = (1..=30).map(|i| i as f64 * 0.5).collect();
        let points = points_on(ModelKind::Logarithmic, &[0.5, 2.0], &[0.0], &xs);

        let fit = fit_shaped(ModelKind::Logarithmic, &points, &FitOptions::default()).unwrap();
        assert!(fit.shape[0].abs() < 1e-3);
        assert_relative_eq!(fit.coeffs[0], 0.5, max_relative = 1e-3);
        assert_relative_eq!(fit.coeffs[1], 2.0, max_relative = 1e-3);
    }

    #[test]
    fn logarithmic_fit_shifts_past_zero_x() {
        // Data starts at x = 0; only shifted candidates are valid.
        let xs: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let points = points_on(ModelKind::Logarithmic, &[1.0, 0.8], &[2.5], &xs);

        let fit = fit_shaped(ModelKind::Logarithmic, &points, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.shape[0], 2.5, max_relative = 1e-2);
        assert!(fit.rmse < 1e-3);
    }

    #[test]
    fn all_invalid_candidates_is_an_error() {
        // Logarithmic fit on strongly negative x: every shift in the default
        // grid leaves non-positive arguments.
        let xs: Vec<f64> = (0..10).map(|i| -1000.0 - i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| x * 2.0).collect();
        let points: Vec<SamplePoint> = xs
            .iter()
            .zip(ys.iter())
            .enumerate()
            .map(|(index, (&x, &y))| SamplePoint {
                index,
                x,
                y,
                weight: 1.0,
            })
            .collect();

        let err = fit_shaped(ModelKind::Logarithmic, &points, &FitOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
