//! SensorNode - one physical mote and its whole pipeline.
//!
//! Two locks per node:
//! - `pipeline`: reorder buffer, assembler, statistics, alarm (producer side)
//! - `store`: ping-pong buffers, axis metadata, offsets (shared with readers)
//!
//! Lock order is always pipeline -> store. Snapshot readers only take the
//! store lock, or only the pipeline lock, never both.

use std::sync::{Arc, Mutex, MutexGuard};

use analytics::{AlarmDecision, AlarmEvaluator, AxisStatistics, StatisticsEngine};
use contracts::{
    AlarmConfig, AlarmMetric, Axis, AxisSelection, CalibrationMethod, Command, CommandSink,
    ContractError, Frame, MonitorConfig, NodeId, RawCodes, RawPacket, SamplingConfig,
    StatisticRecord,
};
use observability::metrics::{
    record_alarm_fired, record_command_sent, record_frame_completed, record_frame_statistics,
    record_packet_received, record_reorder_depth, FrameMetricsAggregator, MetricsSummary,
};
use tracing::{debug, info, instrument, warn};

use crate::assembler::{AssemblerState, AssemblyEvent, FrameAssembler};
use crate::calibration::CalibrationOutcome;
use crate::error::Result;
use crate::reorder::PacketReorderBuffer;
use crate::store::FrameStore;

/// What one `handle_packet` call did
#[derive(Debug, Default)]
pub struct NodeReport {
    /// A packet left the reorder buffer
    pub drained: bool,
    pub handshake_acknowledged: bool,
    pub frame_completed: bool,
    pub statistics: Option<StatisticRecord>,
    pub alarm_fired: bool,
    pub calibration: Option<CalibrationOutcome>,
    /// Non-fatal outbound command failures
    pub command_errors: Vec<ContractError>,
}

#[derive(Debug)]
struct Pipeline {
    reorder: PacketReorderBuffer,
    assembler: FrameAssembler,
    statistics: StatisticsEngine,
    alarm: AlarmEvaluator,
    sampling: SamplingConfig,
    pending_calibration: Option<CalibrationMethod>,
    handshake_acknowledged: bool,
    aggregator: FrameMetricsAggregator,
}

/// Per-node pipeline: reorder -> assemble -> statistics -> alarm
pub struct SensorNode {
    id: NodeId,
    store: FrameStore,
    pipeline: Mutex<Pipeline>,
    commands: Arc<dyn CommandSink>,
}

impl std::fmt::Debug for SensorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorNode")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SensorNode {
    /// Create a node from the monitor configuration.
    pub fn new(
        id: NodeId,
        config: &MonitorConfig,
        commands: Arc<dyn CommandSink>,
    ) -> Result<Self> {
        let layout = config.sampling.layout()?;
        let pipeline = Pipeline {
            reorder: PacketReorderBuffer::new(config.reorder.drain_threshold),
            assembler: FrameAssembler::new(id.clone(), config.protocol.expected_version),
            statistics: StatisticsEngine::new(config.statistics.history_capacity),
            alarm: AlarmEvaluator::new(config.alarm),
            sampling: config.sampling,
            pending_calibration: config.calibration.method,
            handshake_acknowledged: false,
            aggregator: FrameMetricsAggregator::new(),
        };
        info!(node = %id, sample_count = layout.sample_count(), "sensor node created");

        Ok(Self {
            id,
            store: FrameStore::new(layout),
            pipeline: Mutex::new(pipeline),
            commands,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    fn pipeline(&self) -> MutexGuard<'_, Pipeline> {
        self.pipeline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, command: &Command) -> std::result::Result<(), ContractError> {
        let result = self.commands.send(&self.id, command);
        record_command_sent(&self.id, command.descriptor(), result.is_ok());
        if let Err(err) = &result {
            warn!(node = %self.id, descriptor = command.descriptor(), error = %err, "command send failed");
        }
        result
    }

    /// Accept one packet from the gateway and drive the pipeline.
    ///
    /// Returns `HandshakeFailed` when the first handshake cannot be answered.
    #[instrument(
        level = "trace",
        name = "sensor_node_handle_packet",
        skip(self, packet),
        fields(node = %self.id, timestamp = packet.timestamp)
    )]
    pub fn handle_packet(&self, packet: RawPacket) -> Result<NodeReport> {
        record_packet_received(&self.id);
        let mut guard = self.pipeline();
        let pipeline = &mut *guard;
        let mut report = NodeReport::default();

        pipeline.reorder.accept(packet);
        let next = pipeline.reorder.next_ready(pipeline.handshake_acknowledged);
        record_reorder_depth(&self.id, pipeline.reorder.len());
        let Some(packet) = next else {
            return Ok(report);
        };
        report.drained = true;

        let sampling = pipeline.sampling;
        let step = pipeline.assembler.handle(&packet, &self.store, || {
            self.send(&Command::SamplingParameters {
                sampling,
                alarm: false,
            })
        })?;
        if let Some(err) = step.command_error {
            pipeline.aggregator.record_command(false);
            report.command_errors.push(err);
        }

        match step.event {
            AssemblyEvent::HandshakeAcknowledged { first } => {
                if first {
                    info!(node = %self.id, "handshake acknowledged");
                }
                pipeline.handshake_acknowledged = true;
                report.handshake_acknowledged = true;
            }
            AssemblyEvent::FrameCompleted { duration_s } => {
                report.frame_completed = true;
                record_frame_completed(&self.id, duration_s);
                pipeline.aggregator.record_frame(duration_s);
                self.on_frame_completed(pipeline, &mut report);
            }
            AssemblyEvent::Dropped | AssemblyEvent::Progress => {}
        }

        Ok(report)
    }

    /// Statistics, then alarm, then any pending calibration.
    fn on_frame_completed(&self, pipeline: &mut Pipeline, report: &mut NodeReport) {
        let Some(frame) = self.store.latest_frame() else {
            return;
        };

        match pipeline.statistics.process(&frame) {
            Some(record) => {
                record_frame_statistics(&self.id, &record);
                pipeline.aggregator.record_statistics(&record);
                report.statistics = Some(record);

                if let AlarmDecision::Fired { metric, value } = pipeline.alarm.evaluate(&record) {
                    record_alarm_fired(&self.id, metric);
                    pipeline.aggregator.record_alarm();
                    report.alarm_fired = true;
                    info!(node = %self.id, %metric, value, "alarm fired");
                    if let Err(err) = self.send(&Command::AlarmTrigger) {
                        pipeline.aggregator.record_command(false);
                        report.command_errors.push(err);
                    }
                }
            }
            None => debug!(node = %self.id, "frame without axis, statistics skipped"),
        }

        if let Some(method) = pipeline.pending_calibration {
            let outcome = self.store.calibrate(method);
            report.calibration = Some(outcome);
            if self.store.all_calibrated() {
                info!(node = %self.id, "all axes calibrated");
                pipeline.pending_calibration = None;
            }
        }
    }

    // ========================================================================
    // Snapshot readers
    // ========================================================================

    /// Latest completed frame, offsets applied.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.store.latest_frame()
    }

    /// Latest completed frame as uncorrected ADC codes.
    pub fn latest_raw_codes(&self) -> Option<RawCodes> {
        self.store.latest_codes()
    }

    pub fn statistics(&self, axis: Axis) -> AxisStatistics {
        self.pipeline().statistics.snapshot(axis)
    }

    pub fn latest_statistics(&self, axis: Axis) -> Option<StatisticRecord> {
        self.pipeline().statistics.latest(axis).copied()
    }

    pub fn alarm_config(&self) -> Option<AlarmConfig> {
        self.pipeline().alarm.config()
    }

    pub fn assembler_state(&self) -> AssemblerState {
        self.pipeline().assembler.state()
    }

    pub fn handshake_acknowledged(&self) -> bool {
        self.pipeline().handshake_acknowledged
    }

    pub fn reorder_depth(&self) -> usize {
        self.pipeline().reorder.len()
    }

    pub fn sampling(&self) -> SamplingConfig {
        self.pipeline().sampling
    }

    pub fn offset(&self, axis: Axis) -> f64 {
        self.store.offset(axis)
    }

    pub fn calibration_pending(&self) -> bool {
        self.pipeline().pending_calibration.is_some()
    }

    pub fn frames_completed(&self) -> u64 {
        self.store.frames_completed()
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.pipeline().aggregator.summary()
    }

    // ========================================================================
    // Operator commands
    // ========================================================================

    /// Apply new sampling parameters and push them to the node (`22`).
    ///
    /// Buffers are reallocated and anything still queued for reordering is
    /// discarded.
    pub fn update_sampling(&self, sampling: SamplingConfig) -> Result<()> {
        let layout = sampling.layout()?;
        let mut pipeline = self.pipeline();
        self.store.resize(layout);
        pipeline.reorder.clear();
        pipeline.assembler.abandon_frame();
        pipeline.sampling = sampling;
        info!(
            node = %self.id,
            frequency_hz = sampling.frequency_hz,
            sample_count = sampling.sample_count,
            "sampling parameters updated"
        );
        self.send(&Command::SamplingParameters {
            sampling,
            alarm: false,
        })?;
        Ok(())
    }

    /// Change the sampled axes (`33`).
    pub fn select_axes(&self, axes: AxisSelection) -> Result<()> {
        self.pipeline().sampling.axes = axes;
        self.send(&Command::AxisSelection(axes))?;
        Ok(())
    }

    pub fn arm_alarm(&self, metric: AlarmMetric, threshold: f64) {
        self.pipeline().alarm.arm(metric, threshold);
    }

    /// Disarm and clear the node's alarm indicator (`55`).
    pub fn reset_alarm(&self) -> Result<()> {
        self.pipeline().alarm.reset();
        self.send(&Command::AlarmReset)?;
        Ok(())
    }

    /// Calibrate each axis from the next frame it completes.
    pub fn request_calibration(&self, method: CalibrationMethod) {
        info!(node = %self.id, ?method, "calibration requested");
        self.pipeline().pending_calibration = Some(method);
    }

    /// Clear all offsets so they can be recalibrated.
    pub fn reset_calibration(&self) {
        self.store.reset_calibration();
    }

    pub fn reset_statistics(&self) {
        self.pipeline().statistics.reset();
    }

    /// Tell the node the manager is ready (`11`).
    pub fn announce_ready(&self) -> Result<()> {
        self.send(&Command::Ready)?;
        Ok(())
    }

    /// Transport lost: drop session state and wait for a new handshake.
    /// Statistic history and alarm configuration are kept.
    pub fn disconnect(&self) {
        let mut pipeline = self.pipeline();
        pipeline.reorder.clear();
        pipeline.assembler.reset();
        pipeline.handshake_acknowledged = false;
        self.store.reset();
        info!(node = %self.id, "node disconnected, session reset");
    }
}
