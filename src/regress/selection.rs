//! Model selection across regression families using BIC with guardrails.
//!
//! For `--model auto` / `--model all` the tool fits each family and computes:
//! - SSE / RMSE
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude underdetermined models: require `n >= k + MIN_N_BUFFER`
//! 2. Choose the model with minimum BIC
//! 3. If ΔBIC < 2 between the best and a simpler model, pick the simpler model

use crate::domain::{CurveModel, FitQuality, FitResult, ModelKind, SamplePoint};
use crate::error::AppError;
use crate::regress::{FitOptions, ModelFit, fit_model};

/// Minimum number of extra observations beyond parameter count before a model
/// enters automatic selection.
const MIN_N_BUFFER: usize = 2;

/// ΔBIC below which a simpler model is preferred over the minimum-BIC one.
const BIC_MARGIN: f64 = 2.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: FitResult,
    /// Fits for all attempted models (after guardrails).
    pub fits: Vec<FitResult>,
    /// Any models that were skipped and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
}

/// Fit the requested model kinds and select the best.
///
/// A single requested kind is fit directly and its errors propagate. In
/// auto/all mode, per-model failures become skip diagnostics instead, and
/// selection runs over whatever succeeded.
pub fn fit_and_select(
    points: &[SamplePoint],
    kinds: &[ModelKind],
    single: bool,
    opts: &FitOptions,
) -> Result<FitSelection, AppError> {
    let n = points.len();
    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for &kind in kinds {
        let k = kind.param_count();
        if !single && n < k + MIN_N_BUFFER {
            skipped.push((
                kind,
                format!(
                    "Underdetermined: n={n} < k+{MIN_N_BUFFER}={}",
                    k + MIN_N_BUFFER
                ),
            ));
            continue;
        }

        match fit_model(kind, points, opts) {
            Ok(fit) => fits.push(to_fit_result(fit, n)),
            Err(e) if !single => {
                log::warn!("skipping {}: {e}", kind.display_name());
                skipped.push((kind, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    if fits.is_empty() {
        return Err(AppError::no_data(
            "Insufficient data to fit any model after guardrails.",
        ));
    }

    let best = if single {
        fits[0].clone()
    } else {
        select_by_bic(&fits)
    };

    Ok(FitSelection {
        best,
        fits,
        skipped,
    })
}

fn to_fit_result(fit: ModelFit, n: usize) -> FitResult {
    let k = fit.kind.param_count();
    // Floor the SSE so noise-free fits compare by parameter count instead of
    // by machine-precision rounding (a nested model can otherwise land on an
    // arbitrarily smaller "perfect" SSE and hijack the BIC ordering).
    let sse = fit.sse.max(1e-12 * n as f64);
    let bic = n as f64 * (sse / n as f64).ln() + k as f64 * (n as f64).ln();

    FitResult {
        model: CurveModel {
            name: fit.kind,
            display_name: fit.kind.display_name(),
            coeffs: fit.coeffs,
            shape: fit.shape,
        },
        quality: FitQuality {
            sse: fit.sse,
            rmse: fit.rmse,
            bic,
            n,
        },
    }
}

fn select_by_bic(fits: &[FitResult]) -> FitResult {
    let min_bic = fits
        .iter()
        .map(|f| f.quality.bic)
        .fold(f64::INFINITY, f64::min);

    // Among models within the margin of the minimum, prefer the one with the
    // fewest parameters; break remaining ties by BIC.
    let mut chosen: Option<&FitResult> = None;
    for fit in fits {
        if fit.quality.bic - min_bic >= BIC_MARGIN {
            continue;
        }
        let better = match chosen {
            None => true,
            Some(c) => {
                let (kc, kf) = (c.model.name.param_count(), fit.model.name.param_count());
                kf < kc || (kf == kc && fit.quality.bic < c.quality.bic)
            }
        };
        if better {
            chosen = Some(fit);
        }
    }

    chosen
        .cloned()
        .unwrap_or_else(|| fits[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regress::model::predict;

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

    fn auto_kinds() -> Vec<ModelKind> {
        vec![
            ModelKind::Linear,
            ModelKind::Parabolic,
            ModelKind::Poly(3),
            ModelKind::Logarithmic,
            ModelKind::Exponential,
        ]
    }

    #[test]
    fn selection_prefers_linear_on_linear_data() {
        let xs: Vec<f64> = (0..30).map(|i| 0.5 + i as f64 * 0.5).collect();
        let points = points_on(ModelKind::Linear, &[2.0, 0.3], &[], &xs);

        let sel = fit_and_select(&points, &auto_kinds(), false, &FitOptions::default()).unwrap();
        // Higher-degree polynomials also fit a line perfectly; the ΔBIC rule
        // must collapse the choice to the simplest family.
        assert_eq!(sel.best.model.name, ModelKind::Linear);
    }

    #[test]
    fn selection_prefers_exponential_on_decay_data() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.2).collect();
        let points = points_on(ModelKind::Exponential, &[0.1, 2.0], &[-1.1], &xs);

        let sel = fit_and_select(&points, &auto_kinds(), false, &FitOptions::default()).unwrap();
        assert_eq!(sel.best.model.name, ModelKind::Exponential);
    }

    #[test]
    fn selection_skips_underdetermined_kinds() {
        let xs = [0.5, 1.0, 1.5, 2.0];
        let points = points_on(ModelKind::Linear, &[1.0, 1.0], &[], &xs);

        let sel = fit_and_select(&points, &auto_kinds(), false, &FitOptions::default()).unwrap();
        assert!(
            sel.skipped
                .iter()
                .any(|(kind, _)| *kind == ModelKind::Poly(3))
        );
        assert_eq!(sel.best.model.name, ModelKind::Linear);
    }

    #[test]
    fn empty_input_is_a_hard_error() {
        let err = fit_and_select(&[], &auto_kinds(), false, &FitOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
