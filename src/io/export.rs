//! Export per-point results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::PointResidual;
use crate::error::AppError;

/// Write per-point fitted values and residuals to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[PointResidual]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::usage(format!(
            "Failed to create export CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(file, "index,x,y,y_fit,residual,weight")
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        let p = &r.point;
        writeln!(
            file,
            "{},{:.10},{:.10},{:.10},{:.10},{:.10}",
            p.index, p.x, p.y, r.y_fit, r.residual, p.weight
        )
        .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
