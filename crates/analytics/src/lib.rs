//! # Analytics
//!
//! Vibration features derived from completed frames:
//! - Statistic functions and per-axis history ([`StatisticsEngine`])
//! - One-shot threshold alarm ([`AlarmEvaluator`])
//! - Spectrum/time axes and machine-fault benchmark frequencies

mod alarm;
mod engine;
mod faults;
mod spectrum;
pub mod statistics;

pub use alarm::{AlarmDecision, AlarmEvaluator};
pub use engine::{AxisStatistics, StatisticsEngine, INITIAL_SCALE, SCALE_HEADROOM};
pub use faults::{motor_harmonics, BearingFaultFrequencies, BearingGeometry};
pub use spectrum::SamplingAxes;

use thiserror::Error;

/// Analytics error type
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid sampling setup: {0}")]
    InvalidSampling(String),

    #[error("invalid bearing geometry: {0}")]
    InvalidGeometry(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AnalyticsError>;
