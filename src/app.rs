//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments
//! - runs the fit pipeline / plot renderers
//! - prints reports and writes optional exports

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, MuxArgs, PlotArgs};
use crate::domain::{FitConfig, FitResult, ModelKind, SamplePoint};
use crate::error::AppError;
use crate::regress::FitOptions;

pub mod pipeline;

/// Entry point for the `mux` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Mux(args) => handle_mux(args),
        Command::Watch(args) => crate::tui::run(&args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.selection, &config)
    );
    println!("{}", crate::report::format_deviations(&run.worst));

    if let Some(path) = &config.plot {
        let title = config
            .title
            .clone()
            .unwrap_or_else(|| default_fit_title(&run.selection.best));
        crate::plot::render_fit_png(
            path,
            &run.ingest.points,
            &run.selection.best,
            &run.worst,
            &title,
            config.plot_width,
            config.plot_height,
        )?;
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.residuals)?;
    }
    if let Some(path) = &config.export_fit {
        crate::io::fitfile::write_fit_json(path, &run.selection.best, &run.ingest.stats)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::fitfile::read_fit_json(&args.fit)?;
    let title = args
        .title
        .unwrap_or_else(|| format!("{} fit ({})", fit.model.display_name, fit.generated));
    crate::plot::render_grid_png(
        &args.out,
        &fit.grid.x,
        &fit.grid.y,
        &title,
        args.width,
        args.height,
    )
}

fn handle_mux(args: MuxArgs) -> Result<(), AppError> {
    let data = crate::io::ingest::load_mux_data(&args.data, args.sensors)?;
    let adc = args.board.config();

    let volts: Vec<Vec<f64>> = data
        .readouts
        .iter()
        .map(|column| column.iter().map(|&lsb| adc.lsb_to_volt(lsb)).collect())
        .collect();

    let mut stats = Vec::new();
    for (name, column) in data.readout_names.iter().zip(&volts) {
        stats.push(crate::report::describe(name, column));
    }
    for (name, column) in data.tc_names.iter().zip(&data.time_constants) {
        stats.push(crate::report::describe(name, column));
    }
    log::info!(
        "column statistics:\n{}",
        crate::report::format_column_stats(&stats)
    );

    if args.fit_decay {
        report_decay_fits(&data.readout_names, &volts)?;
    }

    let out = args.out.clone().unwrap_or_else(|| default_mux_out(&args.data));
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| format!("Muxed sensor readouts ({})", args.board.display_name()));
    crate::plot::render_mux_png(
        &out,
        &data.readout_names,
        &volts,
        &data.tc_names,
        &data.time_constants,
        &title,
        args.width,
        args.height,
    )
}

/// Fit an exponential decay to each readout column (x = readout index) and
/// print the recovered time constants.
fn report_decay_fits(names: &[String], columns: &[Vec<f64>]) -> Result<(), AppError> {
    let opts = FitOptions::default();
    for (name, column) in names.iter().zip(columns) {
        let points: Vec<SamplePoint> = column
            .iter()
            .enumerate()
            .map(|(index, &v)| SamplePoint {
                index,
                x: index as f64,
                y: v,
                weight: 1.0,
            })
            .collect();

        match crate::regress::fit_model(ModelKind::Exponential, &points, &opts) {
            Ok(fit) => match fit.time_constant() {
                Some(tau) => println!(
                    "{name}: time constant {tau:.6} readouts (rate {:.6}, RMSE {:.6})",
                    fit.shape[0], fit.rmse
                ),
                None => println!("{name}: no decay (rate {:.6})", fit.shape[0]),
            },
            Err(e) => log::warn!("decay fit failed for {name}: {e}"),
        }
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.clone(),
        x_column: args.x_column.clone(),
        y_column: args.y_column.clone(),
        weight_column: args.weight_column.clone(),
        model_spec: args.model,
        degree: args.degree,
        rate_min: args.rate_min,
        rate_max: args.rate_max,
        shift_max: args.shift_max,
        grid_steps: args.grid_steps,
        refine_iters: args.refine_iters,
        top_n: args.top,
        plot: args.plot.clone(),
        plot_width: args.width,
        plot_height: args.height,
        title: args.title.clone(),
        export_results: args.export_results.clone(),
        export_fit: args.export_fit.clone(),
    }
}

fn default_fit_title(best: &FitResult) -> String {
    format!(
        "{} fit - {}",
        best.model.display_name,
        Local::now().format("%Y-%m-%d")
    )
}

fn default_mux_out(data: &Path) -> PathBuf {
    let stem = data
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mux");
    data.with_file_name(format!("{stem}_{}.png", Local::now().format("%Y%m%d")))
}
