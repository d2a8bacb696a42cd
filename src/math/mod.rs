//! Mathematical utilities: design-matrix helpers and weighted least squares.

pub mod design;
pub mod ols;

pub use design::*;
pub use ols::*;
