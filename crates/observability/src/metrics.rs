//! 帧流水线指标收集模块
//!
//! `record_*` 函数写入全局 `metrics` recorder（未安装 recorder 时为空操作）；
//! `FrameMetricsAggregator` 在内存中聚合，便于输出摘要。

use std::collections::BTreeMap;

use contracts::{AlarmMetric, Axis, StatisticRecord};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 为 Prometheus 导出注册指标说明
pub fn describe_metrics() {
    describe_counter!(
        "vibemon_packets_received_total",
        "Packets accepted into a node's reorder buffer"
    );
    describe_gauge!("vibemon_reorder_depth", "Packets waiting in the reorder buffer");
    describe_counter!(
        "vibemon_frame_resets_total",
        "Soft resets of the frame fill cursor"
    );
    describe_counter!(
        "vibemon_version_mismatch_total",
        "Frames whose header version differs from the expected one"
    );
    describe_counter!("vibemon_frames_total", "Completed frames");
    describe_histogram!(
        "vibemon_frame_duration_seconds",
        Unit::Seconds,
        "Gateway time from a frame's first packet to its last"
    );
    describe_counter!("vibemon_alarms_fired_total", "Alarm commands sent");
    describe_counter!("vibemon_commands_sent_total", "Downlink commands by status");
    describe_counter!(
        "vibemon_gateway_packets_dropped_total",
        "Packets dropped on a full node queue"
    );
    describe_counter!(
        "vibemon_handshake_failures_total",
        "Handshakes that could not be answered"
    );
}

/// 记录节点数据包接收
pub fn record_packet_received(node: &str) {
    counter!("vibemon_packets_received_total", "node" => node.to_string()).increment(1);
}

/// 记录重排缓冲区深度
pub fn record_reorder_depth(node: &str, depth: usize) {
    gauge!("vibemon_reorder_depth", "node" => node.to_string()).set(depth as f64);
}

/// 记录帧游标软复位（overflow / realigned）
pub fn record_realignment(node: &str, reason: &str) {
    counter!(
        "vibemon_frame_resets_total",
        "node" => node.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录固件协议版本不一致
pub fn record_version_mismatch(node: &str) {
    counter!("vibemon_version_mismatch_total", "node" => node.to_string()).increment(1);
}

/// 记录帧完成
///
/// `duration_s` 为首包到末包的网关时间差。
pub fn record_frame_completed(node: &str, duration_s: Option<f64>) {
    counter!("vibemon_frames_total", "node" => node.to_string()).increment(1);
    if let Some(duration) = duration_s {
        histogram!("vibemon_frame_duration_seconds", "node" => node.to_string()).record(duration);
    }
}

/// 记录每帧统计量（仅记录有定义的指标）
pub fn record_frame_statistics(node: &str, record: &StatisticRecord) {
    let axis = record.axis.to_string();
    for metric in AlarmMetric::ALL {
        if let Some(value) = record.metric(metric) {
            gauge!(
                "vibemon_frame_statistic",
                "node" => node.to_string(),
                "axis" => axis.clone(),
                "metric" => metric.as_str()
            )
            .set(value);
        }
    }
}

/// 记录报警触发
pub fn record_alarm_fired(node: &str, metric: AlarmMetric) {
    counter!(
        "vibemon_alarms_fired_total",
        "node" => node.to_string(),
        "metric" => metric.as_str()
    )
    .increment(1);
}

/// 记录下行命令发送
pub fn record_command_sent(node: &str, descriptor: u8, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "vibemon_commands_sent_total",
        "node" => node.to_string(),
        "descriptor" => descriptor.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 帧指标聚合器
#[derive(Debug, Clone, Default)]
pub struct FrameMetricsAggregator {
    /// 完成帧数
    pub total_frames: u64,
    /// 各轴统计记录数
    pub frames_per_axis: BTreeMap<Axis, u64>,
    /// 报警次数
    pub alarms_fired: u64,
    /// 命令发送失败次数
    pub command_failures: u64,
    /// 帧耗时统计（秒）
    pub frame_duration_s: RunningStats,
    /// 各轴 RMS 统计 (g)
    pub rms: BTreeMap<Axis, RunningStats>,
}

impl FrameMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, duration_s: Option<f64>) {
        self.total_frames += 1;
        if let Some(duration) = duration_s {
            self.frame_duration_s.push(duration);
        }
    }

    pub fn record_statistics(&mut self, record: &StatisticRecord) {
        *self.frames_per_axis.entry(record.axis).or_insert(0) += 1;
        if let Some(rms) = record.rms {
            self.rms.entry(record.axis).or_default().push(rms);
        }
    }

    pub fn record_alarm(&mut self) {
        self.alarms_fired += 1;
    }

    pub fn record_command(&mut self, success: bool) {
        if !success {
            self.command_failures += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            frames_per_axis: self.frames_per_axis.clone(),
            alarms_fired: self.alarms_fired,
            command_failures: self.command_failures,
            frame_duration_s: StatsSummary::from(&self.frame_duration_s),
            rms: self
                .rms
                .iter()
                .map(|(axis, stats)| (*axis, StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub frames_per_axis: BTreeMap<Axis, u64>,
    pub alarms_fired: u64,
    pub command_failures: u64,
    pub frame_duration_s: StatsSummary,
    pub rms: BTreeMap<Axis, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Frame Metrics Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        for (axis, count) in &self.frames_per_axis {
            writeln!(f, "  {axis} axis frames: {count}")?;
        }
        writeln!(f, "Alarms fired: {}", self.alarms_fired)?;
        writeln!(f, "Command failures: {}", self.command_failures)?;
        writeln!(f, "Frame duration (s): {}", self.frame_duration_s)?;
        for (axis, stats) in &self.rms {
            writeln!(f, "RMS {axis} (g): {stats}")?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差 (n - 1)
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(axis: Axis, rms: Option<f64>) -> StatisticRecord {
        StatisticRecord {
            axis,
            peak: None,
            peak_to_peak: None,
            rms,
            standard_deviation: None,
            kurtosis: None,
            skew: None,
            crest: None,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = FrameMetricsAggregator::new();
        aggregator.record_frame(Some(0.5));
        aggregator.record_frame(None);
        aggregator.record_statistics(&record(Axis::X, Some(0.2)));
        aggregator.record_statistics(&record(Axis::X, None));
        aggregator.record_alarm();
        aggregator.record_command(true);
        aggregator.record_command(false);

        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.frames_per_axis.get(&Axis::X), Some(&2));
        assert_eq!(summary.rms.get(&Axis::X).map(|s| s.count), Some(1));
        assert_eq!(summary.frame_duration_s.count, 1);
        assert_eq!(summary.alarms_fired, 1);
        assert_eq!(summary.command_failures, 1);

        aggregator.reset();
        assert_eq!(aggregator.total_frames, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = FrameMetricsAggregator::new();
        aggregator.record_frame(Some(1.25));
        aggregator.record_statistics(&record(Axis::Z, Some(0.1)));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total frames: 1"));
        assert!(output.contains("z axis frames: 1"));
        assert!(output.contains("RMS z (g)"));
    }

    #[test]
    fn test_record_helpers_without_recorder() {
        // No recorder installed: must be no-ops
        record_packet_received("node-1");
        record_reorder_depth("node-1", 3);
        record_frame_completed("node-1", Some(0.1));
        record_frame_statistics("node-1", &record(Axis::Y, Some(1.0)));
        record_alarm_fired("node-1", AlarmMetric::Rms);
        record_command_sent("node-1", 44, false);
    }
}
