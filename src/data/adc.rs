//! ADC board configurations.
//!
//! The characterization CSVs record raw ADC codes. Converting them to volts
//! needs the per-board resolution and full-scale voltage, which differ across
//! chip revisions.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported board revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AdcBoard {
    /// 9-bit sensor ADC, 1.2 V full scale.
    M2,
    /// 9-bit sensor ADC, 1.1 V full scale.
    L35,
}

/// Conversion parameters for one board's sensor ADC.
#[derive(Debug, Clone, Copy)]
pub struct AdcConfig {
    pub resolution_bits: u32,
    pub full_scale_volts: f64,
}

impl AdcBoard {
    pub fn display_name(self) -> &'static str {
        match self {
            AdcBoard::M2 => "m2",
            AdcBoard::L35 => "l35",
        }
    }

    pub fn config(self) -> AdcConfig {
        match self {
            AdcBoard::M2 => AdcConfig {
                resolution_bits: 9,
                full_scale_volts: 1.2,
            },
            AdcBoard::L35 => AdcConfig {
                resolution_bits: 9,
                full_scale_volts: 1.1,
            },
        }
    }
}

impl AdcConfig {
    /// Number of ADC codes (one past the largest representable code).
    pub fn num_codes(&self) -> f64 {
        (1u64 << self.resolution_bits) as f64
    }

    /// Convert a raw ADC code to volts.
    pub fn lsb_to_volt(&self, lsb: f64) -> f64 {
        lsb * self.full_scale_volts / self.num_codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_code_maps_to_full_scale_volts() {
        let config = AdcBoard::M2.config();
        assert_eq!(config.num_codes(), 512.0);
        let v = config.lsb_to_volt(512.0);
        assert!((v - 1.2).abs() < 1e-12);
    }

    #[test]
    fn zero_code_maps_to_zero_volts() {
        let config = AdcBoard::L35.config();
        assert_eq!(config.lsb_to_volt(0.0), 0.0);
    }

    #[test]
    fn midscale_is_half_full_scale() {
        let config = AdcBoard::M2.config();
        let v = config.lsb_to_volt(256.0);
        assert!((v - 0.6).abs() < 1e-12);
    }
}
