//! One-shot alarm threshold evaluation.

use contracts::{AlarmConfig, AlarmMetric, StatisticRecord};
use tracing::{debug, info};

/// Outcome of evaluating one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlarmDecision {
    /// Nothing configured or not armed
    Disarmed,
    /// Selected metric absent in the record
    Skipped,
    /// Value at or below threshold
    Clear { value: f64 },
    /// Threshold exceeded; the evaluator is now disarmed
    Fired { metric: AlarmMetric, value: f64 },
}

impl AlarmDecision {
    pub fn fired(&self) -> bool {
        matches!(self, AlarmDecision::Fired { .. })
    }
}

/// Compares the newest record against a threshold, fires once, then
/// stays disarmed until re-armed.
#[derive(Debug, Clone, Default)]
pub struct AlarmEvaluator {
    config: Option<AlarmConfig>,
}

impl AlarmEvaluator {
    pub fn new(config: Option<AlarmConfig>) -> Self {
        Self { config }
    }

    pub fn arm(&mut self, metric: AlarmMetric, threshold: f64) {
        info!(%metric, threshold, "alarm armed");
        self.config = Some(AlarmConfig {
            metric,
            threshold,
            armed: true,
        });
    }

    /// Disarm, keeping the metric and threshold.
    pub fn reset(&mut self) {
        if let Some(config) = self.config.as_mut() {
            config.armed = false;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.config.is_some_and(|c| c.armed)
    }

    pub fn config(&self) -> Option<AlarmConfig> {
        self.config
    }

    pub fn evaluate(&mut self, record: &StatisticRecord) -> AlarmDecision {
        let Some(config) = self.config.as_mut().filter(|c| c.armed) else {
            return AlarmDecision::Disarmed;
        };
        let Some(value) = record.metric(config.metric) else {
            debug!(metric = %config.metric, axis = %record.axis, "metric absent, alarm check skipped");
            return AlarmDecision::Skipped;
        };
        if value > config.threshold {
            config.armed = false;
            info!(
                metric = %config.metric,
                value,
                threshold = config.threshold,
                axis = %record.axis,
                "alarm threshold exceeded"
            );
            AlarmDecision::Fired {
                metric: config.metric,
                value,
            }
        } else {
            AlarmDecision::Clear { value }
        }
    }
}
