//! Machine-fault benchmark frequencies for overlaying on a spectrum.

use serde::{Deserialize, Serialize};

use crate::{AnalyticsError, Result};

/// Rolling-element bearing geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingGeometry {
    pub rolling_elements: u32,
    /// Rolling element diameter (any length unit, same as pitch)
    pub element_diameter: f64,
    pub pitch_diameter: f64,
    /// Contact angle (rad)
    pub contact_angle: f64,
}

/// Characteristic defect frequencies (Hz)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingFaultFrequencies {
    /// Ball pass frequency, outer race
    pub bpfo: f64,
    /// Ball pass frequency, inner race
    pub bpfi: f64,
    /// Fundamental train (cage) frequency
    pub ftf: f64,
    /// Ball spin frequency
    pub bsf: f64,
}

impl BearingGeometry {
    /// Defect frequencies for a shaft turning at `shaft_hz`.
    pub fn fault_frequencies(&self, shaft_hz: f64) -> Result<BearingFaultFrequencies> {
        if self.element_diameter <= 0.0 || self.pitch_diameter <= 0.0 {
            return Err(AnalyticsError::InvalidGeometry(
                "element and pitch diameters must be positive".into(),
            ));
        }
        if self.rolling_elements == 0 {
            return Err(AnalyticsError::InvalidGeometry(
                "at least one rolling element required".into(),
            ));
        }

        let n = self.rolling_elements as f64;
        let ratio = self.element_diameter / self.pitch_diameter * self.contact_angle.cos();

        Ok(BearingFaultFrequencies {
            bpfo: n * shaft_hz / 2.0 * (1.0 - ratio),
            bpfi: n * shaft_hz / 2.0 * (1.0 + ratio),
            ftf: shaft_hz / 2.0 * (1.0 - ratio),
            bsf: self.pitch_diameter * shaft_hz / (2.0 * self.element_diameter)
                * (1.0 - ratio * ratio),
        })
    }
}

/// Running speed and its harmonics: `rpm / 60 * i` for `i` in `1..=count`.
pub fn motor_harmonics(rpm: f64, count: usize) -> Vec<f64> {
    let base = rpm / 60.0;
    (1..=count).map(|i| base * i as f64).collect()
}
