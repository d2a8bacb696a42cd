//! CSV ingest and normalization.
//!
//! This module turns measurement CSVs into clean sample sets that are safe to
//! fit. Two file shapes are supported:
//!
//! - generic sweep data: one x column and one y column (selected by header
//!   name or positional default), optional weight column
//! - muxed ADC characterization data: the first `num_sensors` columns are ADC
//!   readouts in LSBs, the remaining columns are nominal RC time constants,
//!   where a cell may be a plain number or a `*`/`/` expression such as
//!   `2.2e-6*51000`
//!
//! Design goals:
//! - lines starting with `#` are comments (the capture scripts prepend them)
//! - row-level validation: skip bad rows, but report what happened
//! - no fitting logic here

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DatasetStats, FitConfig, SamplePoint};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// Ingest output: normalized points + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub points: Vec<SamplePoint>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Muxed ADC data, column-major.
#[derive(Debug, Clone)]
pub struct MuxData {
    pub readout_names: Vec<String>,
    /// One vector per sensor, values in LSBs (or volts after conversion).
    pub readouts: Vec<Vec<f64>>,
    pub tc_names: Vec<String>,
    /// One vector per time-constant column, values in seconds.
    pub time_constants: Vec<Vec<f64>>,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

impl MuxData {
    /// Number of usable rows (all columns have this length).
    pub fn rows_used(&self) -> usize {
        self.readouts.first().map(|c| c.len()).unwrap_or(0)
    }
}

/// Load and normalize sweep samples from the configured CSV.
pub fn load_samples(config: &FitConfig) -> Result<IngestedData, AppError> {
    let mut reader = open_reader(&config.data_path)?;
    let headers = read_headers(&mut reader)?;

    let x_idx = resolve_column(&headers, config.x_column.as_deref(), 0, "x")?;
    let y_idx = resolve_column(&headers, config.y_column.as_deref(), 1, "y")?;
    let w_idx = match &config.weight_column {
        Some(name) => Some(named_column(&headers, name, "weight")?),
        None => None,
    };

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                return Err(AppError::usage(format!(
                    "Failed to read CSV '{}': {e}",
                    config.data_path.display()
                )));
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let index = rows_read;
        rows_read += 1;

        match parse_sample_row(&record, index, x_idx, y_idx, w_idx) {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if points.is_empty() {
        return Err(AppError::no_data(format!(
            "No valid data rows in '{}' ({} row(s) rejected).",
            config.data_path.display(),
            row_errors.len()
        )));
    }

    if !row_errors.is_empty() {
        log::warn!(
            "skipped {} of {} data row(s) in {}",
            row_errors.len(),
            rows_read,
            config.data_path.display()
        );
    }

    let stats = dataset_stats(&points);
    log::info!(
        "loaded {} point(s): x=[{:.4}, {:.4}], y=[{:.4}, {:.4}]",
        stats.n_points,
        stats.x_min,
        stats.x_max,
        stats.y_min,
        stats.y_max
    );

    let rows_used = points.len();
    Ok(IngestedData {
        points,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Load muxed ADC characterization data.
///
/// The first `num_sensors` columns are readouts; everything after them is a
/// time-constant column. Rows where any cell fails to parse are skipped.
pub fn load_mux_data(path: &Path, num_sensors: usize) -> Result<MuxData, AppError> {
    if num_sensors == 0 {
        return Err(AppError::usage("Sensor count must be > 0."));
    }

    let mut reader = open_reader(path)?;
    let headers = read_headers(&mut reader)?;
    if headers.len() < num_sensors {
        return Err(AppError::usage(format!(
            "'{}' has {} column(s), expected at least {num_sensors} readout column(s).",
            path.display(),
            headers.len()
        )));
    }

    let readout_names: Vec<String> = headers.iter().take(num_sensors).map(String::from).collect();
    let tc_names: Vec<String> = headers.iter().skip(num_sensors).map(String::from).collect();

    let mut readouts = vec![Vec::new(); num_sensors];
    let mut time_constants = vec![Vec::new(); tc_names.len()];
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                return Err(AppError::usage(format!(
                    "Failed to read CSV '{}': {e}",
                    path.display()
                )));
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows_read += 1;

        match parse_mux_row(&record, num_sensors, tc_names.len()) {
            Ok((lsb, tcs)) => {
                for (column, value) in readouts.iter_mut().zip(lsb) {
                    column.push(value);
                }
                for (column, value) in time_constants.iter_mut().zip(tcs) {
                    column.push(value);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let data = MuxData {
        readout_names,
        readouts,
        tc_names,
        time_constants,
        rows_read,
        row_errors,
    };

    if data.rows_used() == 0 {
        return Err(AppError::no_data(format!(
            "No valid data rows in '{}' ({} row(s) rejected).",
            path.display(),
            data.row_errors.len()
        )));
    }
    if !data.row_errors.is_empty() {
        log::warn!(
            "skipped {} of {} data row(s) in {}",
            data.row_errors.len(),
            data.rows_read,
            path.display()
        );
    }

    Ok(data)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, AppError> {
    csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))
}

fn read_headers(reader: &mut csv::Reader<File>) -> Result<StringRecord, AppError> {
    reader
        .headers()
        .map(|h| h.clone())
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))
}

/// Resolve a column by header name (case-insensitive), or fall back to the
/// positional default when no name was given.
fn resolve_column(
    headers: &StringRecord,
    name: Option<&str>,
    default_idx: usize,
    role: &str,
) -> Result<usize, AppError> {
    if let Some(name) = name {
        return named_column(headers, name, role);
    }

    if default_idx >= headers.len() {
        return Err(AppError::usage(format!(
            "CSV has {} column(s), not enough for the default {role} column (index {default_idx}).",
            headers.len()
        )));
    }
    Ok(default_idx)
}

/// Find a column by header name (case-insensitive).
fn named_column(headers: &StringRecord, name: &str, role: &str) -> Result<usize, AppError> {
    let wanted = name.trim().to_ascii_lowercase();
    for (idx, header) in headers.iter().enumerate() {
        if header.trim().to_ascii_lowercase() == wanted {
            return Ok(idx);
        }
    }
    let available: Vec<&str> = headers.iter().collect();
    Err(AppError::usage(format!(
        "No '{name}' column for {role}; available columns: {}",
        available.join(", ")
    )))
}

fn parse_sample_row(
    record: &StringRecord,
    index: usize,
    x_idx: usize,
    y_idx: usize,
    w_idx: Option<usize>,
) -> Result<SamplePoint, String> {
    let x = parse_field(record, x_idx, "x")?;
    let y = parse_field(record, y_idx, "y")?;
    let weight = match w_idx {
        Some(idx) => parse_field(record, idx, "weight")?,
        None => 1.0,
    };

    if !(x.is_finite() && y.is_finite()) {
        return Err(format!("non-finite sample: x={x}, y={y}"));
    }
    if !(weight.is_finite() && weight > 0.0) {
        return Err(format!("invalid weight {weight} (must be finite and > 0)"));
    }

    Ok(SamplePoint {
        index,
        x,
        y,
        weight,
    })
}

fn parse_mux_row(
    record: &StringRecord,
    num_sensors: usize,
    num_tcs: usize,
) -> Result<(Vec<f64>, Vec<f64>), String> {
    let mut lsb = Vec::with_capacity(num_sensors);
    for idx in 0..num_sensors {
        let value = parse_field(record, idx, "readout")?;
        if !value.is_finite() {
            return Err(format!("non-finite readout in column {idx}"));
        }
        lsb.push(value);
    }

    let mut tcs = Vec::with_capacity(num_tcs);
    for idx in num_sensors..num_sensors + num_tcs {
        let cell = record
            .get(idx)
            .ok_or_else(|| format!("missing time-constant column {idx}"))?;
        let value = eval_cell_expr(cell)
            .ok_or_else(|| format!("unparseable time constant '{cell}' in column {idx}"))?;
        tcs.push(value);
    }

    Ok((lsb, tcs))
}

fn parse_field(record: &StringRecord, idx: usize, role: &str) -> Result<f64, String> {
    let cell = record
        .get(idx)
        .ok_or_else(|| format!("missing {role} column {idx}"))?;
    cell.parse::<f64>()
        .map_err(|_| format!("unparseable {role} value '{cell}' in column {idx}"))
}

/// Evaluate a plain number or a `*`/`/` product expression.
///
/// The capture scripts record nominal RC constants as the product of the
/// component values, e.g. `2.2e-6*51000`. Multiplication and division
/// associate left to right, which the split-by-`*` regrouping preserves.
fn eval_cell_expr(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }

    let mut product = 1.0;
    for factor in cell.split('*') {
        let mut parts = factor.split('/');
        let mut value: f64 = parts.next()?.trim().parse().ok()?;
        for divisor in parts {
            let divisor: f64 = divisor.trim().parse().ok()?;
            value /= divisor;
        }
        product *= value;
    }

    if product.is_finite() { Some(product) } else { None }
}

fn dataset_stats(points: &[SamplePoint]) -> DatasetStats {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for p in points {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }
    DatasetStats {
        n_points: points.len(),
        x_min,
        x_max,
        y_min,
        y_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mux_curves_{}_{name}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn fit_config(path: PathBuf) -> FitConfig {
        FitConfig {
            data_path: path,
            x_column: None,
            y_column: None,
            weight_column: None,
            model_spec: crate::domain::ModelSpec::Linear,
            degree: 3,
            rate_min: 1e-3,
            rate_max: 1e3,
            shift_max: 100.0,
            grid_steps: 60,
            refine_iters: 48,
            top_n: 10,
            plot: None,
            plot_width: 1200,
            plot_height: 800,
            title: None,
            export_results: None,
            export_fit: None,
        }
    }

    #[test]
    fn ingest_skips_comments_and_bad_rows() {
        let path = write_temp(
            "sweep.csv",
            "# capture 2024-11-02\n\
             time,output\n\
             0.0,1.0\n\
             0.5,oops\n\
             1.0,3.0\n",
        );
        let ingest = load_samples(&fit_config(path)).unwrap();
        assert_eq!(ingest.rows_used, 2);
        assert_eq!(ingest.row_errors.len(), 1);
        assert_eq!(ingest.points[1].x, 1.0);
    }

    #[test]
    fn ingest_resolves_columns_by_name() {
        let path = write_temp(
            "named.csv",
            "output,time,w\n\
             1.0,0.0,2.0\n\
             2.0,1.0,2.0\n",
        );
        let mut config = fit_config(path);
        config.x_column = Some("time".to_string());
        config.y_column = Some("OUTPUT".to_string());
        config.weight_column = Some("w".to_string());

        let ingest = load_samples(&config).unwrap();
        assert_eq!(ingest.points[0].x, 0.0);
        assert_eq!(ingest.points[0].y, 1.0);
        assert_eq!(ingest.points[0].weight, 2.0);
    }

    #[test]
    fn ingest_rejects_unknown_column() {
        let path = write_temp("cols.csv", "a,b\n1,2\n");
        let mut config = fit_config(path);
        config.y_column = Some("volts".to_string());
        let err = load_samples(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ingest_all_bad_rows_is_a_hard_error() {
        let path = write_temp("bad.csv", "x,y\na,b\nc,d\n");
        let err = load_samples(&fit_config(path)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn mux_ingest_splits_readouts_and_time_constants() {
        let path = write_temp(
            "mux.csv",
            "# board m2\n\
             pt,tdiode,tau1,tau2\n\
             301,288,2.2e-6*51000,1/2\n\
             299,290,2.2e-6*51000,0.5\n",
        );
        let data = load_mux_data(&path, 2).unwrap();
        assert_eq!(data.readout_names, vec!["pt", "tdiode"]);
        assert_eq!(data.tc_names, vec!["tau1", "tau2"]);
        assert_eq!(data.rows_used(), 2);
        assert!((data.time_constants[0][0] - 0.1122).abs() < 1e-9);
        assert!((data.time_constants[1][0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cell_expressions_evaluate_left_to_right() {
        assert!((eval_cell_expr("8/2*4").unwrap() - 16.0).abs() < 1e-12);
        assert!((eval_cell_expr("8*2/4").unwrap() - 4.0).abs() < 1e-12);
        assert!((eval_cell_expr("-3.3").unwrap() + 3.3).abs() < 1e-12);
        assert!(eval_cell_expr("").is_none());
        assert!(eval_cell_expr("2*").is_none());
        assert!(eval_cell_expr("1/0").is_none());
    }
}
