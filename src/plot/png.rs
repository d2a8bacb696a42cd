//! PNG chart rendering.
//!
//! Two chart shapes:
//!
//! - fit chart: observed points, the fitted curve, and the worst deviations
//!   highlighted
//! - mux chart: muxed ADC readouts (volts, left axis) and nominal time
//!   constants (seconds, right axis) against the readout index
//!
//! Bounds are computed and validated before any chart is built so a bad
//! dataset produces an error instead of a Plotters panic.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::{FitResult, PointResidual, SamplePoint};
use crate::error::AppError;
use crate::regress::predict;

/// Number of curve samples across the x range.
const CURVE_SAMPLES: usize = 200;

fn plot_err(e: impl std::fmt::Display) -> AppError {
    AppError::numeric(format!("Plot error: {e}"))
}

/// Render the fit chart: scatter + fitted curve + highlighted deviations.
pub fn render_fit_png(
    path: &Path,
    points: &[SamplePoint],
    best: &FitResult,
    worst: &[PointResidual],
    title: &str,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    if points.is_empty() {
        return Err(AppError::no_data("Nothing to plot: no points."));
    }

    let curve = sample_curve(best, points);

    let (x0, x1) = padded_bounds(
        points.iter().map(|p| p.x),
        curve.iter().map(|&(x, _)| x),
    )?;
    let (y0, y1) = padded_bounds(
        points.iter().map(|p| p.y),
        curve.iter().map(|&(_, y)| y),
    )?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.x, p.y), 3, BLUE.mix(0.6).filled())),
        )
        .map_err(plot_err)?
        .label("observed")
        .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(2)))
        .map_err(plot_err)?
        .label("fit")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], RED.stroke_width(2)));

    // Ring the worst deviations so they stand out against the scatter.
    chart
        .draw_series(
            worst
                .iter()
                .map(|r| Circle::new((r.point.x, r.point.y), 6, RED.stroke_width(2))),
        )
        .map_err(plot_err)?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85).filled())
        .border_style(BLACK.stroke_width(1))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    log::info!("wrote fit chart to {}", path.display());
    Ok(())
}

/// Render the muxed-readout chart: volts on the left axis, time constants on
/// the right, readout index on x.
pub fn render_mux_png(
    path: &Path,
    readout_names: &[String],
    readouts_volts: &[Vec<f64>],
    tc_names: &[String],
    time_constants: &[Vec<f64>],
    title: &str,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    let rows = readouts_volts.first().map(|c| c.len()).unwrap_or(0);
    if rows == 0 {
        return Err(AppError::no_data("Nothing to plot: no readout rows."));
    }

    let x1 = (rows - 1).max(1) as f64;
    let (v0, v1) = padded_bounds(
        readouts_volts.iter().flatten().copied(),
        std::iter::empty(),
    )?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70);

    if time_constants.is_empty() {
        let mut chart = builder
            .build_cartesian_2d(0.0..x1, v0..v1)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("Readout index")
            .y_desc("ADC output [V]")
            .draw()
            .map_err(plot_err)?;
        for (idx, (name, column)) in readout_names.iter().zip(readouts_volts).enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            chart
                .draw_series(LineSeries::new(
                    column.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                    color.stroke_width(2),
                ))
                .map_err(plot_err)?
                .label(name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85).filled())
            .border_style(BLACK.stroke_width(1))
            .draw()
            .map_err(plot_err)?;
    } else {
        let (t0, t1) = padded_bounds(
            time_constants.iter().flatten().copied(),
            std::iter::empty(),
        )?;
        let mut chart = builder
            .right_y_label_area_size(70)
            .build_cartesian_2d(0.0..x1, v0..v1)
            .map_err(plot_err)?
            .set_secondary_coord(0.0..x1, t0..t1);

        chart
            .configure_mesh()
            .x_desc("Readout index")
            .y_desc("ADC output [V]")
            .draw()
            .map_err(plot_err)?;
        chart
            .configure_secondary_axes()
            .y_desc("Time constant [s]")
            .draw()
            .map_err(plot_err)?;

        for (idx, (name, column)) in readout_names.iter().zip(readouts_volts).enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            chart
                .draw_series(LineSeries::new(
                    column.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                    color.stroke_width(2),
                ))
                .map_err(plot_err)?
                .label(name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }
        for (idx, (name, column)) in tc_names.iter().zip(time_constants).enumerate() {
            let color = Palette99::pick(readout_names.len() + idx).to_rgba();
            chart
                .draw_secondary_series(LineSeries::new(
                    column.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                    color.stroke_width(2),
                ))
                .map_err(plot_err)?
                .label(name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85).filled())
            .border_style(BLACK.stroke_width(1))
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    log::info!("wrote mux chart to {}", path.display());
    Ok(())
}

/// Render a stored fit-file grid (no raw data available).
pub fn render_grid_png(
    path: &Path,
    grid_x: &[f64],
    grid_y: &[f64],
    title: &str,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    if grid_x.is_empty() || grid_x.len() != grid_y.len() {
        return Err(AppError::no_data("Fit file contains no usable curve grid."));
    }

    let (x0, x1) = padded_bounds(grid_x.iter().copied(), std::iter::empty())?;
    let (y0, y1) = padded_bounds(grid_y.iter().copied(), std::iter::empty())?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            grid_x.iter().copied().zip(grid_y.iter().copied()),
            RED.stroke_width(2),
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    log::info!("wrote fit chart to {}", path.display());
    Ok(())
}

/// Sample the fitted curve across the observed x range, skipping x values
/// where the model is undefined.
fn sample_curve(best: &FitResult, points: &[SamplePoint]) -> Vec<(f64, f64)> {
    let x_min = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    if !(x_min.is_finite() && x_max.is_finite()) || x_max <= x_min {
        return Vec::new();
    }

    (0..CURVE_SAMPLES)
        .filter_map(|i| {
            let u = i as f64 / (CURVE_SAMPLES as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            let y = predict(best.model.name, x, &best.model.coeffs, &best.model.shape);
            y.is_finite().then_some((x, y))
        })
        .collect()
}

/// Min/max over the chained values with 5% padding, validated.
fn padded_bounds(
    a: impl Iterator<Item = f64>,
    b: impl Iterator<Item = f64>,
) -> Result<(f64, f64), AppError> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in a.chain(b) {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if !(min.is_finite() && max.is_finite()) {
        return Err(AppError::numeric("No finite values to derive plot bounds."));
    }
    let span = (max - min).max(1e-9);
    Ok((min - 0.05 * span, max + 0.05 * span))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_bounds_expand_the_range() {
        let (lo, hi) = padded_bounds([1.0, 3.0].into_iter(), std::iter::empty()).unwrap();
        assert!(lo < 1.0 && hi > 3.0);
    }

    #[test]
    fn padded_bounds_handle_a_flat_series() {
        let (lo, hi) = padded_bounds([2.0, 2.0].into_iter(), std::iter::empty()).unwrap();
        assert!(lo < hi);
    }

    #[test]
    fn padded_bounds_reject_all_nan_input() {
        let err = padded_bounds([f64::NAN].into_iter(), std::iter::empty()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
