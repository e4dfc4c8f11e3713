//! Time and frequency axes for plotting or exporting a frame.

use serde::Serialize;

use crate::{AnalyticsError, Result};

/// Sample instants and spectrum bin centres for one sampling setup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingAxes {
    /// `f_k = fs / n * k`, `k` in `[0, n / 2)`
    pub frequencies: Vec<f64>,
    /// `t_k = k / fs`, `k` in `[0, n)`
    pub times: Vec<f64>,
}

impl SamplingAxes {
    pub fn new(frequency_hz: f64, sample_count: usize) -> Result<Self> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(AnalyticsError::InvalidSampling(format!(
                "frequency must be positive, got {frequency_hz}"
            )));
        }
        if sample_count == 0 {
            return Err(AnalyticsError::InvalidSampling(
                "sample count must be positive".into(),
            ));
        }

        let resolution = frequency_hz / sample_count as f64;
        Ok(Self {
            frequencies: (0..sample_count / 2)
                .map(|k| resolution * k as f64)
                .collect(),
            times: (0..sample_count).map(|k| k as f64 / frequency_hz).collect(),
        })
    }

    /// Bin width (Hz)
    pub fn resolution(&self) -> Option<f64> {
        self.frequencies.get(1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes() {
        let axes = SamplingAxes::new(512.0, 8).unwrap();
        assert_eq!(axes.frequencies, vec![0.0, 64.0, 128.0, 192.0]);
        assert_eq!(axes.times.len(), 8);
        assert!((axes.times[1] - 1.0 / 512.0).abs() < 1e-15);
        assert_eq!(axes.resolution(), Some(64.0));
    }

    #[test]
    fn test_invalid() {
        assert!(SamplingAxes::new(0.0, 8).is_err());
        assert!(SamplingAxes::new(f64::NAN, 8).is_err());
        assert!(SamplingAxes::new(100.0, 0).is_err());
    }
}
