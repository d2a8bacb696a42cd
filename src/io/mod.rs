//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - per-point result exports (`export`)
//! - fit JSON read/write (`fitfile`)

pub mod export;
pub mod fitfile;
pub mod ingest;

pub use export::*;
pub use fitfile::*;
pub use ingest::*;
