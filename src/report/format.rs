//! Formatted terminal output.

use crate::domain::{FitConfig, FitResult, ModelKind, PointResidual};
use crate::io::ingest::IngestedData;
use crate::regress::ModelFit;
use crate::regress::selection::FitSelection;
use crate::report::ColumnStats;

/// Format the full run summary (dataset stats + fit diagnostics + chosen model).
pub fn format_run_summary(
    ingest: &IngestedData,
    selection: &FitSelection,
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== mux - sensor curve fit ===\n");
    out.push_str(&format!("Data: {}\n", config.data_path.display()));
    out.push_str(&format!(
        "Rows: {} read, {} used, {} skipped\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Points: n={} | x=[{:.4}, {:.4}] | y=[{:.4}, {:.4}]\n",
        ingest.stats.n_points,
        ingest.stats.x_min,
        ingest.stats.x_max,
        ingest.stats.y_min,
        ingest.stats.y_max
    ));

    out.push_str("\nModel diagnostics:\n");
    for fit in &selection.fits {
        let chosen = if fit.model.name == selection.best.model.name {
            "*"
        } else {
            " "
        };
        out.push_str(&format!(
            "{chosen} {:<14} SSE={:.6} RMSE={:.6} BIC={:.3}\n",
            fit.model.display_name, fit.quality.sse, fit.quality.rmse, fit.quality.bic
        ));
    }
    for (kind, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out.push_str("\nChosen model:\n");
    out.push_str(&format!("- {}\n", selection.best.model.display_name));
    out.push_str(&format!(
        "- coeffs: {}\n",
        fmt_vec(&selection.best.model.coeffs)
    ));
    if !selection.best.model.shape.is_empty() {
        out.push_str(&format!(
            "- shape : {}\n",
            fmt_vec(&selection.best.model.shape)
        ));
    }
    out.push_str(&format_derived(&selection.best));
    out.push('\n');

    out
}

/// Format the derived quantities for the chosen model, when they exist.
fn format_derived(best: &FitResult) -> String {
    let fit = ModelFit {
        kind: best.model.name,
        coeffs: best.model.coeffs.clone(),
        shape: best.model.shape.clone(),
        sse: best.quality.sse,
        rmse: best.quality.rmse,
    };

    let mut out = String::new();
    match best.model.name {
        ModelKind::Linear => {
            if let (Some(slope), Some(intercept)) = (fit.slope(), fit.intercept()) {
                out.push_str(&format!("- slope: {slope:.6}, intercept: {intercept:.6}\n"));
            }
        }
        ModelKind::Parabolic => {
            if let Some((vx, vy)) = fit.vertex() {
                out.push_str(&format!("- vertex: ({vx:.6}, {vy:.6})\n"));
            }
        }
        ModelKind::Exponential => {
            if let Some(tau) = fit.time_constant() {
                out.push_str(&format!("- time constant: {tau:.6} s\n"));
            }
        }
        _ => {}
    }
    out
}

/// Format the worst-deviations table.
pub fn format_deviations(worst: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Worst deviations (top {}):\n", worst.len()));
    out.push_str(&format!(
        "{:>6} {:>12} {:>12} {:>12} {:>12}\n",
        "index", "x", "y", "y_fit", "residual"
    ));
    for r in worst {
        out.push_str(&format!(
            "{:>6} {:>12.5} {:>12.5} {:>12.5} {:>12.5}\n",
            r.point.index, r.point.x, r.point.y, r.y_fit, r.residual
        ));
    }
    out
}

/// Format per-column summary statistics.
pub fn format_column_stats(stats: &[ColumnStats]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<16} {:>6} {:>12} {:>12} {:>12} {:>12}\n",
        "column", "n", "min", "max", "mean", "std"
    ));
    for s in stats {
        out.push_str(&format!(
            "{:<16} {:>6} {:>12.5} {:>12.5} {:>12.5} {:>12.5}\n",
            s.name, s.n, s.min, s.max, s.mean, s.std
        ));
    }
    out
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
