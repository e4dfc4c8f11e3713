//! Per-axis zero-offset calibration.

use contracts::{ideal_code, Axis, CalibrationMethod, RawCodes, MID_SCALE};
use tracing::{debug, info};

/// Result of one calibration attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// Offset computed and stored for the axis
    Applied { axis: Axis, offset: f64 },
    /// Axis was already calibrated; offset untouched
    AlreadyCalibrated { axis: Axis },
    /// Frame had no axis or no samples
    Unavailable,
}

/// Offsets in ADC codes, subtracted from raw codes on read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetCalibrator {
    offsets: [f64; 3],
    calibrated: [bool; 3],
}

impl OffsetCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrate the axis of `codes` once; later calls are no-ops until
    /// [`reset`](Self::reset).
    pub fn calibrate(&mut self, codes: &RawCodes, method: CalibrationMethod) -> CalibrationOutcome {
        let Some(axis) = codes.axis else {
            return CalibrationOutcome::Unavailable;
        };
        let i = axis.index();
        if self.calibrated[i] {
            debug!(%axis, "axis already calibrated");
            return CalibrationOutcome::AlreadyCalibrated { axis };
        }
        let Some(mean) = codes.mean() else {
            return CalibrationOutcome::Unavailable;
        };

        let reference = match method {
            CalibrationMethod::Orientation => ideal_code(axis.rest_g()),
            CalibrationMethod::EmpiricalZero => MID_SCALE,
        };
        let offset = mean - reference;
        self.offsets[i] = offset;
        self.calibrated[i] = true;
        info!(%axis, ?method, offset, "axis offset calibrated");
        CalibrationOutcome::Applied { axis, offset }
    }

    #[inline]
    pub fn offset(&self, axis: Axis) -> f64 {
        self.offsets[axis.index()]
    }

    pub fn is_calibrated(&self, axis: Axis) -> bool {
        self.calibrated[axis.index()]
    }

    pub fn all_calibrated(&self) -> bool {
        self.calibrated[0] && self.calibrated[1] && self.calibrated[2]
    }

    /// Clear all three axes at once.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
