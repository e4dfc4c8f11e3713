//! Outbound node commands and their fixed-width text encoding.
//!
//! A command is six 8-character fields concatenated:
//! `frequency | alarm | axes | sample_count | sleep | descriptor`.
//! Each field is a decimal literal right-padded with `x`, or all `x`.

use serde::{Deserialize, Serialize};

use crate::{AxisSelection, ContractError, SamplingConfig};

pub const COMMAND_FIELD_WIDTH: usize = 8;
pub const COMMAND_FIELD_COUNT: usize = 6;
pub const COMMAND_FILLER: char = 'x';

/// Command sent from the gateway to a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Manager ready, keep streaming (`11`)
    Ready,
    /// Full sampling parameter set (`22`)
    SamplingParameters { sampling: SamplingConfig, alarm: bool },
    /// Axis selection only (`33`)
    AxisSelection(AxisSelection),
    /// Light the node's alarm indicator (`44`)
    AlarmTrigger,
    /// Clear the node's alarm indicator (`55`)
    AlarmReset,
}

impl Command {
    pub fn descriptor(&self) -> u8 {
        match self {
            Command::Ready => 11,
            Command::SamplingParameters { .. } => 22,
            Command::AxisSelection(_) => 33,
            Command::AlarmTrigger => 44,
            Command::AlarmReset => 55,
        }
    }

    /// Encode to the 48-character wire text.
    pub fn encode(&self) -> Result<String, ContractError> {
        let mut fields: [Option<String>; COMMAND_FIELD_COUNT] = Default::default();
        match self {
            Command::Ready | Command::AlarmReset => {
                fields[1] = Some("0".into());
            }
            Command::SamplingParameters { sampling, alarm } => {
                fields[0] = Some(sampling.frequency_hz.to_string());
                fields[1] = Some(if *alarm { "1" } else { "0" }.into());
                fields[2] = Some(sampling.axes.selector_text());
                fields[3] = Some(sampling.sample_count.to_string());
                fields[4] = Some(sampling.sleep_s.to_string());
            }
            Command::AxisSelection(axes) => {
                fields[1] = Some("0".into());
                fields[2] = Some(axes.selector_text());
            }
            Command::AlarmTrigger => {
                fields[1] = Some("1".into());
            }
        }
        fields[5] = Some(self.descriptor().to_string());

        let mut out = String::with_capacity(COMMAND_FIELD_WIDTH * COMMAND_FIELD_COUNT);
        for (name, field) in FIELD_NAMES.iter().zip(fields.iter()) {
            let value = field.as_deref().unwrap_or("");
            if value.len() > COMMAND_FIELD_WIDTH {
                return Err(ContractError::CommandFieldOverflow {
                    field: *name,
                    value: value.to_string(),
                    width: COMMAND_FIELD_WIDTH,
                });
            }
            out.push_str(value);
            out.extend(
                std::iter::repeat(COMMAND_FILLER).take(COMMAND_FIELD_WIDTH - value.len()),
            );
        }
        Ok(out)
    }
}

const FIELD_NAMES: [&str; COMMAND_FIELD_COUNT] = [
    "frequency",
    "alarm",
    "axes",
    "sample_count",
    "sleep",
    "descriptor",
];
