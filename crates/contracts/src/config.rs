//! Monitor configuration contracts shared by the loader and the pipeline.

use serde::{Deserialize, Serialize};

use crate::{AlarmConfig, Axis, ContractError, FrameLayout, DEFAULT_PROTOCOL_VERSION};

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub reorder: ReorderConfig,

    /// Calibration requested at start-up
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Alarm armed at start-up
    #[serde(default)]
    pub alarm: Option<AlarmConfig>,

    #[serde(default)]
    pub statistics: StatisticsConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Sampling parameters pushed to every node with command `22`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub frequency_hz: u32,
    pub sample_count: usize,
    /// 0 streams continuously
    #[serde(default)]
    pub sleep_s: u32,
    #[serde(default)]
    pub axes: AxisSelection,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 512,
            sample_count: 512,
            sleep_s: 0,
            axes: AxisSelection::default(),
        }
    }
}

impl SamplingConfig {
    pub fn layout(&self) -> Result<FrameLayout, ContractError> {
        FrameLayout::new(self.sample_count)
    }
}

/// Axes a node should sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    #[serde(default)]
    pub x: bool,
    #[serde(default)]
    pub y: bool,
    #[serde(default)]
    pub z: bool,
}

impl Default for AxisSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl AxisSelection {
    pub fn all() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
        }
    }

    pub fn contains(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.x || self.y || self.z)
    }

    /// Three `0`/`1` characters in x, y, z order, e.g. `110`
    pub fn selector_text(&self) -> String {
        [self.x, self.y, self.z]
            .iter()
            .map(|&on| if on { '1' } else { '0' })
            .collect()
    }

    pub fn from_selector_text(text: &str) -> Result<Self, ContractError> {
        let bits: Vec<bool> = text
            .chars()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                other => Err(ContractError::config_validation(
                    "sampling.axes",
                    format!("invalid selector character '{other}'"),
                )),
            })
            .collect::<Result<_, _>>()?;
        match bits.as_slice() {
            [x, y, z] => Ok(Self {
                x: *x,
                y: *y,
                z: *z,
            }),
            _ => Err(ContractError::config_validation(
                "sampling.axes",
                format!("selector '{text}' must be 3 characters"),
            )),
        }
    }
}

/// Reorder buffer drain policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderConfig {
    /// After handshake, drain only while more than this many packets are buffered
    #[serde(default)]
    pub drain_threshold: usize,
}

/// Offset calibration method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Sensor mounted upright: x = 0 g, y = 0 g, z = 1 g
    Orientation,
    /// Every axis assumed at 0 g
    EmpiricalZero,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub method: Option<CalibrationMethod>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Per-axis history cap; unbounded when absent
    #[serde(default)]
    pub history_capacity: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_protocol_version")]
    pub expected_version: u8,
}

fn default_protocol_version() -> u8 {
    DEFAULT_PROTOCOL_VERSION
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            expected_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}
