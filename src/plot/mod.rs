//! Plot rendering.
//!
//! All static output goes through the Plotters bitmap backend as PNG files;
//! the live terminal view has its own chart widget under `tui`.

pub mod png;

pub use png::*;
