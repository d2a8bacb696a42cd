//! Seeded synthetic sample generation.
//!
//! Used by the tests (known-coefficient sweeps with controllable noise) and by
//! `mux watch --demo`, which streams plausible sensor readouts without any
//! hardware attached. Everything is seeded and deterministic.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ModelKind, SamplePoint};
use crate::error::AppError;
use crate::regress::predict;

/// Configuration for a synthetic sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub kind: ModelKind,
    pub coeffs: Vec<f64>,
    pub shape: Vec<f64>,
    pub n: usize,
    pub x_min: f64,
    pub x_max: f64,
    /// Standard deviation of the additive Gaussian noise on y (0 = exact).
    pub noise_sigma: f64,
    pub seed: u64,
}

/// Generate an evenly spaced sweep from a known model.
pub fn generate_sweep(config: &SweepConfig) -> Result<Vec<SamplePoint>, AppError> {
    if config.n == 0 {
        return Err(AppError::usage("Sample count must be > 0."));
    }
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(AppError::usage("Invalid x range for sample generation."));
    }
    if !(config.noise_sigma.is_finite() && config.noise_sigma >= 0.0) {
        return Err(AppError::usage("Noise sigma must be finite and >= 0."));
    }
    if config.coeffs.len() != config.kind.coeff_len()
        || config.shape.len() != config.kind.shape_len()
    {
        return Err(AppError::usage(format!(
            "Parameter count mismatch for {}.",
            config.kind.display_name()
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let span = config.x_max - config.x_min;
    let step = if config.n > 1 {
        span / (config.n as f64 - 1.0)
    } else {
        0.0
    };

    let mut points = Vec::with_capacity(config.n);
    for i in 0..config.n {
        let x = config.x_min + step * i as f64;
        let mut y = predict(config.kind, x, &config.coeffs, &config.shape);
        if config.noise_sigma > 0.0 {
            y += config.noise_sigma * normal.sample(&mut rng);
        }
        points.push(SamplePoint {
            index: i,
            x,
            y,
            weight: 1.0,
        });
    }

    Ok(points)
}

/// Streaming demo source for `mux watch --demo`.
///
/// Each trace is a slow sine around midscale plus Gaussian noise, roughly what
/// a muxed sensor sweep looks like on a 9-bit ADC.
#[derive(Debug)]
pub struct DemoFeed {
    rng: StdRng,
    normal: Normal<f64>,
    t: f64,
    num_traces: usize,
}

impl DemoFeed {
    pub fn new(num_traces: usize, seed: u64) -> Result<Self, AppError> {
        let normal = Normal::new(0.0, 6.0)
            .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
            t: 0.0,
            num_traces,
        })
    }

    /// Produce the next batch of per-trace values.
    pub fn next_values(&mut self) -> Vec<f64> {
        self.t += 0.1;
        (0..self.num_traces)
            .map(|i| {
                let phase = i as f64 * 0.9;
                let base = 256.0 + 128.0 * (0.35 * self.t + phase).sin();
                base + self.normal.sample(&mut self.rng)
            })
            .collect()
    }
}
