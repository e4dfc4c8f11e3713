//! Statistic record and alarm configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Axis, ContractError};

/// Per-frame vibration features for one axis.
///
/// A metric is `None` when its arithmetic is undefined for the frame
/// (e.g. crest factor of an all-zero frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub axis: Axis,
    pub peak: Option<f64>,
    pub peak_to_peak: Option<f64>,
    pub rms: Option<f64>,
    pub standard_deviation: Option<f64>,
    pub kurtosis: Option<f64>,
    pub skew: Option<f64>,
    pub crest: Option<f64>,
}

impl StatisticRecord {
    pub fn metric(&self, metric: AlarmMetric) -> Option<f64> {
        match metric {
            AlarmMetric::Peak => self.peak,
            AlarmMetric::PeakToPeak => self.peak_to_peak,
            AlarmMetric::Rms => self.rms,
            AlarmMetric::StandardDeviation => self.standard_deviation,
            AlarmMetric::Kurtosis => self.kurtosis,
            AlarmMetric::Skew => self.skew,
            AlarmMetric::Crest => self.crest,
        }
    }
}

/// Statistic an alarm threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmMetric {
    Peak,
    PeakToPeak,
    Rms,
    StandardDeviation,
    Kurtosis,
    Skew,
    Crest,
}

impl AlarmMetric {
    pub const ALL: [AlarmMetric; 7] = [
        AlarmMetric::Peak,
        AlarmMetric::PeakToPeak,
        AlarmMetric::Rms,
        AlarmMetric::StandardDeviation,
        AlarmMetric::Kurtosis,
        AlarmMetric::Skew,
        AlarmMetric::Crest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmMetric::Peak => "peak",
            AlarmMetric::PeakToPeak => "peak_to_peak",
            AlarmMetric::Rms => "rms",
            AlarmMetric::StandardDeviation => "standard_deviation",
            AlarmMetric::Kurtosis => "kurtosis",
            AlarmMetric::Skew => "skew",
            AlarmMetric::Crest => "crest",
        }
    }
}

impl fmt::Display for AlarmMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmMetric {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlarmMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                ContractError::config_validation("alarm.metric", format!("unknown metric '{s}'"))
            })
    }
}

/// Alarm threshold configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    pub metric: AlarmMetric,
    pub threshold: f64,
    #[serde(default)]
    pub armed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_lookup() {
        let record = StatisticRecord {
            axis: Axis::X,
            peak: Some(-5.0),
            peak_to_peak: Some(6.0),
            rms: Some(2.0),
            standard_deviation: None,
            kurtosis: None,
            skew: Some(0.1),
            crest: Some(-2.5),
        };
        assert_eq!(record.metric(AlarmMetric::Peak), Some(-5.0));
        assert_eq!(record.metric(AlarmMetric::Crest), Some(-2.5));
        assert_eq!(record.metric(AlarmMetric::StandardDeviation), None);
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("rms".parse::<AlarmMetric>().unwrap(), AlarmMetric::Rms);
        assert_eq!(
            "peak_to_peak".parse::<AlarmMetric>().unwrap(),
            AlarmMetric::PeakToPeak
        );
        assert!("loudness".parse::<AlarmMetric>().is_err());
    }

    #[test]
    fn test_alarm_config_serde() {
        let config: AlarmConfig =
            serde_json::from_str(r#"{"metric":"kurtosis","threshold":3.5}"#).unwrap();
        assert_eq!(config.metric, AlarmMetric::Kurtosis);
        assert!(!config.armed);
    }
}
