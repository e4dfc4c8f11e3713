//! Per-axis statistic history.

use std::collections::VecDeque;

use contracts::{Axis, Frame, StatisticRecord};
use serde::Serialize;
use tracing::debug;

use crate::statistics::compute_record;

/// Display scale before any frame has been seen (g)
pub const INITIAL_SCALE: f64 = 0.75;
/// Headroom applied to a new running peak when rescaling
pub const SCALE_HEADROOM: f64 = 1.2;

/// Derives a [`StatisticRecord`] per completed frame and keeps an
/// append-only history for each axis.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    histories: [VecDeque<StatisticRecord>; 3],
    capacity: Option<usize>,
    evicted: [u64; 3],
    max_peak: [f64; 3],
    max_peak_to_peak: [f64; 3],
    scale: [f64; 3],
}

/// Point-in-time copy of one axis for readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisStatistics {
    pub axis: Axis,
    pub history: Vec<StatisticRecord>,
    pub evicted: u64,
    pub max_peak: f64,
    pub max_peak_to_peak: f64,
    pub scale: f64,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StatisticsEngine {
    /// `capacity` caps each axis history; `None` keeps everything.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            histories: Default::default(),
            capacity,
            evicted: [0; 3],
            max_peak: [0.0; 3],
            max_peak_to_peak: [0.0; 3],
            scale: [INITIAL_SCALE; 3],
        }
    }

    /// Process a completed frame. Frames without a decoded axis are skipped.
    pub fn process(&mut self, frame: &Frame) -> Option<StatisticRecord> {
        let axis = frame.axis?;
        let record = compute_record(axis, &frame.raw);
        self.push(record);
        Some(record)
    }

    /// Append a record and update running maxima.
    pub fn push(&mut self, record: StatisticRecord) {
        let i = record.axis.index();

        // 基线为 0，scale 只增不减
        if let Some(peak) = record.peak {
            if peak > self.max_peak[i] {
                self.max_peak[i] = peak;
            }
            if peak > self.scale[i] {
                self.scale[i] = SCALE_HEADROOM * peak;
            }
        }
        if let Some(p2p) = record.peak_to_peak {
            if p2p > self.max_peak_to_peak[i] {
                self.max_peak_to_peak[i] = p2p;
            }
        }

        let history = &mut self.histories[i];
        history.push_back(record);
        if let Some(cap) = self.capacity {
            while history.len() > cap {
                history.pop_front();
                self.evicted[i] += 1;
            }
        }
        debug!(axis = %record.axis, len = history.len(), "statistic record appended");
    }

    pub fn latest(&self, axis: Axis) -> Option<&StatisticRecord> {
        self.histories[axis.index()].back()
    }

    pub fn history(&self, axis: Axis) -> impl Iterator<Item = &StatisticRecord> {
        self.histories[axis.index()].iter()
    }

    pub fn len(&self, axis: Axis) -> usize {
        self.histories[axis.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.iter().all(VecDeque::is_empty)
    }

    /// Records dropped by the history cap
    pub fn evicted(&self, axis: Axis) -> u64 {
        self.evicted[axis.index()]
    }

    /// Largest signed peak seen, 0 before any positive peak
    pub fn max_peak(&self, axis: Axis) -> f64 {
        self.max_peak[axis.index()]
    }

    pub fn max_peak_to_peak(&self, axis: Axis) -> f64 {
        self.max_peak_to_peak[axis.index()]
    }

    /// Display auto-scale for the axis (g), never shrinks until `reset`
    pub fn scale(&self, axis: Axis) -> f64 {
        self.scale[axis.index()]
    }

    pub fn snapshot(&self, axis: Axis) -> AxisStatistics {
        let i = axis.index();
        AxisStatistics {
            axis,
            history: self.histories[i].iter().copied().collect(),
            evicted: self.evicted[i],
            max_peak: self.max_peak[i],
            max_peak_to_peak: self.max_peak_to_peak[i],
            scale: self.scale[i],
        }
    }

    /// Clear histories, maxima and scale. The capacity is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }
}
