//! End-to-end tests for the fit pipeline: synthetic-data coefficient
//! recovery, degenerate-input behavior, model selection, and file round trips.

use std::io::Write;
use std::path::PathBuf;

use approx::assert_relative_eq;

use mux_curves::app::pipeline::{run_fit, run_fit_with_data};
use mux_curves::data::{SweepConfig, generate_sweep};
use mux_curves::domain::{DatasetStats, FitConfig, ModelKind, ModelSpec, SamplePoint};
use mux_curves::io::fitfile::read_fit_json;
use mux_curves::io::ingest::IngestedData;
use mux_curves::regress::{FitOptions, fit_model};

fn config(model: ModelSpec, data_path: PathBuf) -> FitConfig {
    FitConfig {
        data_path,
        x_column: None,
        y_column: None,
        weight_column: None,
        model_spec: model,
        degree: 3,
        rate_min: 1e-3,
        rate_max: 1e3,
        shift_max: 100.0,
        grid_steps: 60,
        refine_iters: 48,
        top_n: 5,
        plot: None,
        plot_width: 1200,
        plot_height: 800,
        title: None,
        export_results: None,
        export_fit: None,
    }
}

fn ingest_of(points: Vec<SamplePoint>) -> IngestedData {
    let stats = DatasetStats {
        n_points: points.len(),
        x_min: points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
        x_max: points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
        y_min: points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
        y_max: points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
    };
    let rows = points.len();
    IngestedData {
        points,
        stats,
        row_errors: Vec::new(),
        rows_read: rows,
        rows_used: rows,
    }
}

fn sweep(kind: ModelKind, coeffs: &[f64], shape: &[f64], n: usize, x_min: f64, x_max: f64, sigma: f64) -> Vec<SamplePoint> {
    generate_sweep(&SweepConfig {
        kind,
        coeffs: coeffs.to_vec(),
        shape: shape.to_vec(),
        n,
        x_min,
        x_max,
        noise_sigma: sigma,
        seed: 1234,
    })
    .unwrap()
}

#[test]
fn linear_fit_recovers_coefficients_under_noise() {
    let points = sweep(ModelKind::Linear, &[2.0, 0.5], &[], 200, 0.0, 10.0, 0.01);
    let fit = fit_model(ModelKind::Linear, &points, &FitOptions::default()).unwrap();
    assert_relative_eq!(fit.intercept().unwrap(), 2.0, epsilon = 0.02);
    assert_relative_eq!(fit.slope().unwrap(), 0.5, epsilon = 0.01);
}

#[test]
fn constant_data_yields_near_zero_slope() {
    let points = sweep(ModelKind::Linear, &[3.3, 0.0], &[], 50, 0.0, 5.0, 0.0);
    let fit = fit_model(ModelKind::Linear, &points, &FitOptions::default()).unwrap();
    assert!(fit.slope().unwrap().abs() < 1e-9);
    assert_relative_eq!(fit.intercept().unwrap(), 3.3, max_relative = 1e-9);
}

#[test]
fn parabolic_fit_recovers_coefficients() {
    let points = sweep(ModelKind::Parabolic, &[1.0, -2.0, 0.25], &[], 60, -4.0, 4.0, 0.0);
    let fit = fit_model(ModelKind::Parabolic, &points, &FitOptions::default()).unwrap();
    for (got, want) in fit.coeffs.iter().zip([1.0, -2.0, 0.25]) {
        assert_relative_eq!(*got, want, max_relative = 1e-7);
    }
}

#[test]
fn cubic_fit_recovers_coefficients() {
    let points = sweep(ModelKind::Poly(3), &[0.5, 1.0, -0.3, 0.02], &[], 80, -5.0, 5.0, 0.0);
    let fit = fit_model(ModelKind::Poly(3), &points, &FitOptions::default()).unwrap();
    for (got, want) in fit.coeffs.iter().zip([0.5, 1.0, -0.3, 0.02]) {
        assert_relative_eq!(*got, want, max_relative = 1e-6);
    }
}

#[test]
fn logarithmic_fit_recovers_shift_and_coefficients() {
    let points = sweep(ModelKind::Logarithmic, &[1.0, 2.0], &[3.0], 60, 0.0, 20.0, 0.0);
    let fit = fit_model(ModelKind::Logarithmic, &points, &FitOptions::default()).unwrap();
    assert_relative_eq!(fit.shape[0], 3.0, max_relative = 1e-2);
    assert_relative_eq!(fit.coeffs[1], 2.0, max_relative = 1e-2);
}

#[test]
fn exponential_fit_recovers_time_constant() {
    let points = sweep(ModelKind::Exponential, &[0.4, 1.6], &[-0.8], 80, 0.0, 8.0, 0.0);
    let fit = fit_model(ModelKind::Exponential, &points, &FitOptions::default()).unwrap();
    assert_relative_eq!(fit.shape[0], -0.8, max_relative = 1e-4);
    assert_relative_eq!(fit.time_constant().unwrap(), 1.25, max_relative = 1e-4);
    assert_relative_eq!(fit.coeffs[0], 0.4, epsilon = 1e-3);
    assert_relative_eq!(fit.coeffs[1], 1.6, epsilon = 1e-3);
}

#[test]
fn degenerate_inputs_fail_predictably() {
    let one = sweep(ModelKind::Linear, &[1.0, 1.0], &[], 1, 0.0, 1.0, 0.0);
    assert_eq!(
        fit_model(ModelKind::Linear, &one, &FitOptions::default())
            .unwrap_err()
            .exit_code(),
        3
    );

    // Exponential has three free parameters; two points are not enough.
    let two = sweep(ModelKind::Linear, &[1.0, 1.0], &[], 2, 0.0, 1.0, 0.0);
    assert_eq!(
        fit_model(ModelKind::Exponential, &two, &FitOptions::default())
            .unwrap_err()
            .exit_code(),
        3
    );
}

#[test]
fn auto_selection_finds_the_generating_family() {
    let parabola = sweep(ModelKind::Parabolic, &[1.0, 0.0, -0.5], &[], 40, -3.0, 3.0, 0.0);
    let run = run_fit_with_data(
        &config(ModelSpec::Auto, PathBuf::from("mem")),
        ingest_of(parabola),
    )
    .unwrap();
    assert_eq!(run.selection.best.model.name, ModelKind::Parabolic);

    let decay = sweep(ModelKind::Exponential, &[0.5, 2.0], &[-0.8], 40, 0.0, 8.0, 0.0);
    let run = run_fit_with_data(
        &config(ModelSpec::Auto, PathBuf::from("mem")),
        ingest_of(decay),
    )
    .unwrap();
    assert_eq!(run.selection.best.model.name, ModelKind::Exponential);
}

#[test]
fn auto_selection_prefers_the_simpler_nested_model() {
    let line = sweep(ModelKind::Linear, &[2.0, 0.3], &[], 30, 0.5, 15.0, 0.0);
    let run = run_fit_with_data(
        &config(ModelSpec::Auto, PathBuf::from("mem")),
        ingest_of(line),
    )
    .unwrap();
    // Parabolic and cubic fits are also exact here; the selection must not
    // pick them over the linear model.
    assert_eq!(run.selection.best.model.name, ModelKind::Linear);
}

#[test]
fn pipeline_runs_from_a_csv_file_and_round_trips_the_fit() {
    let dir = std::env::temp_dir();
    let data_path = dir.join(format!("mux_curves_it_{}_sweep.csv", std::process::id()));
    let fit_path = dir.join(format!("mux_curves_it_{}_fit.json", std::process::id()));

    let mut file = std::fs::File::create(&data_path).unwrap();
    writeln!(file, "# synthetic capture").unwrap();
    writeln!(file, "time,volts").unwrap();
    for i in 0..30 {
        let x = i as f64 * 0.5;
        writeln!(file, "{x},{}", 0.25 + 0.1 * x).unwrap();
    }

    let config = config(ModelSpec::Linear, data_path);
    let run = run_fit(&config).unwrap();
    assert_eq!(run.ingest.rows_used, 30);
    assert_eq!(run.selection.best.model.name, ModelKind::Linear);
    assert!(run.worst.len() <= 5);

    mux_curves::io::fitfile::write_fit_json(&fit_path, &run.selection.best, &run.ingest.stats)
        .unwrap();
    let loaded = read_fit_json(&fit_path).unwrap();
    assert_eq!(loaded.model.name, ModelKind::Linear);
    assert_relative_eq!(loaded.model.coeffs[1], 0.1, max_relative = 1e-6);
    assert_eq!(loaded.grid.x.len(), loaded.grid.y.len());
}
