//! Measurement-domain data helpers.
//!
//! - ADC board configurations and LSB→volt conversion (`adc`)
//! - seeded synthetic sweep/stream generation for tests and the demo feed
//!   (`sample`)

pub mod adc;
pub mod sample;

pub use adc::*;
pub use sample::*;
