//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model enums (`ModelSpec` for the CLI, `ModelKind` for concrete fits)
//! - normalized observation points (`SamplePoint`)
//! - fit outputs (`ModelFit`, `FitResult`, `FitQuality`)
//! - the portable fit-file schema (`FitFile`)

pub mod types;

pub use types::*;
