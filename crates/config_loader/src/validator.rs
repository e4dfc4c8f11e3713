//! 配置校验模块
//!
//! 校验规则：
//! - 0 < frequency_hz <= 1_000_000
//! - sample_count 为 2 的幂，且在 32..=1_000_000 内（超过 1024 时节点不发送频谱）
//! - 至少启用一个轴
//! - 报警阈值为有限数
//! - history_capacity > 0（如果设置）
//! - 协议版本可放入帧头 4 位

use contracts::{ContractError, MonitorConfig};

/// 最高采样频率 (Hz)
pub const MAX_FREQUENCY_HZ: u32 = 1_000_000;
/// 最小采样点数
pub const MIN_SAMPLE_COUNT: usize = 32;
/// 最大采样点数
pub const MAX_SAMPLE_COUNT: usize = 1_000_000;
/// 帧头版本字段上限
const MAX_PROTOCOL_VERSION: u8 = 0x0F;

/// 校验 MonitorConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &MonitorConfig) -> Result<(), ContractError> {
    validate_frequency(config)?;
    validate_sample_count(config)?;
    validate_axes(config)?;
    validate_alarm(config)?;
    validate_statistics(config)?;
    validate_protocol(config)?;
    Ok(())
}

/// 校验采样频率
fn validate_frequency(config: &MonitorConfig) -> Result<(), ContractError> {
    let frequency = config.sampling.frequency_hz;
    if frequency == 0 || frequency > MAX_FREQUENCY_HZ {
        return Err(ContractError::config_validation(
            "sampling.frequency_hz",
            format!("frequency_hz must be in (0, {MAX_FREQUENCY_HZ}], got {frequency}"),
        ));
    }
    Ok(())
}

/// 校验采样点数
fn validate_sample_count(config: &MonitorConfig) -> Result<(), ContractError> {
    let n = config.sampling.sample_count;
    if !(MIN_SAMPLE_COUNT..=MAX_SAMPLE_COUNT).contains(&n) || !n.is_power_of_two() {
        return Err(ContractError::config_validation(
            "sampling.sample_count",
            format!(
                "sample_count must be a power of two in {MIN_SAMPLE_COUNT}..={MAX_SAMPLE_COUNT}, got {n}"
            ),
        ));
    }
    Ok(())
}

/// 校验采样轴
fn validate_axes(config: &MonitorConfig) -> Result<(), ContractError> {
    if config.sampling.axes.is_empty() {
        return Err(ContractError::config_validation(
            "sampling.axes",
            "at least one axis must be enabled",
        ));
    }
    Ok(())
}

/// 校验报警配置
fn validate_alarm(config: &MonitorConfig) -> Result<(), ContractError> {
    if let Some(alarm) = &config.alarm {
        if !alarm.threshold.is_finite() {
            return Err(ContractError::config_validation(
                "alarm.threshold",
                format!("threshold must be finite, got {}", alarm.threshold),
            ));
        }
    }
    Ok(())
}

/// 校验统计历史容量
fn validate_statistics(config: &MonitorConfig) -> Result<(), ContractError> {
    if config.statistics.history_capacity == Some(0) {
        return Err(ContractError::config_validation(
            "statistics.history_capacity",
            "history_capacity must be > 0 when set",
        ));
    }
    Ok(())
}

/// 校验协议版本
fn validate_protocol(config: &MonitorConfig) -> Result<(), ContractError> {
    let version = config.protocol.expected_version;
    if version > MAX_PROTOCOL_VERSION {
        return Err(ContractError::config_validation(
            "protocol.expected_version",
            format!("expected_version must fit in 4 bits, got {version}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AlarmConfig, AlarmMetric, AxisSelection};

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_frequency_bounds() {
        let mut config = MonitorConfig::default();
        config.sampling.frequency_hz = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "sampling.frequency_hz"
        );

        config.sampling.frequency_hz = MAX_FREQUENCY_HZ;
        assert!(validate(&config).is_ok());

        config.sampling.frequency_hz = MAX_FREQUENCY_HZ + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_sample_count_rules() {
        let mut config = MonitorConfig::default();
        for ok in [32, 64, 128, 256, 512, 1024, 2048, 524_288] {
            config.sampling.sample_count = ok;
            assert!(validate(&config).is_ok(), "{ok} should be accepted");
        }
        for bad in [0, 16, 48, 100, 1000, 1025, 3000, 1_000_000, 1_048_576] {
            config.sampling.sample_count = bad;
            assert_eq!(
                field_of(validate(&config).unwrap_err()),
                "sampling.sample_count",
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_axes_required() {
        let mut config = MonitorConfig::default();
        config.sampling.axes = AxisSelection {
            x: false,
            y: false,
            z: false,
        };
        assert_eq!(field_of(validate(&config).unwrap_err()), "sampling.axes");
    }

    #[test]
    fn test_alarm_threshold_finite() {
        let mut config = MonitorConfig::default();
        config.alarm = Some(AlarmConfig {
            metric: AlarmMetric::Rms,
            threshold: f64::NAN,
            armed: true,
        });
        assert_eq!(field_of(validate(&config).unwrap_err()), "alarm.threshold");
    }

    #[test]
    fn test_history_capacity_positive() {
        let mut config = MonitorConfig::default();
        config.statistics.history_capacity = Some(0);
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "statistics.history_capacity"
        );
    }

    #[test]
    fn test_protocol_version_fits_header() {
        let mut config = MonitorConfig::default();
        config.protocol.expected_version = 16;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "protocol.expected_version"
        );
    }

    #[test]
    fn test_first_error_wins() {
        let mut config = MonitorConfig::default();
        config.sampling.frequency_hz = 0;
        config.sampling.sample_count = 3;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "sampling.frequency_hz"
        );
    }
}
