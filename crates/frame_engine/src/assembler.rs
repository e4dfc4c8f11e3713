//! Frame assembly state machine.
//!
//! ```text
//! AwaitingHandshake --preamble--> AwaitingFrameStart --0xFF start--> Accumulating
//!                                        ^                               |
//!                                        +------- frame complete --------+
//! ```

use contracts::{ContractError, FrameHeader, NodeId, RawPacket};
use observability::metrics::{record_realignment, record_version_mismatch};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FrameEngineError, Result};
use crate::store::{FrameStore, IngestOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblerState {
    AwaitingHandshake,
    AwaitingFrameStart,
    Accumulating,
}

/// Result of feeding one ordered packet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssemblyEvent {
    /// Handshake preamble answered with sampling parameters
    HandshakeAcknowledged { first: bool },
    /// Data before the handshake, or not aligned to a frame
    Dropped,
    /// Words appended to the frame in progress
    Progress,
    /// A frame was published to the store
    FrameCompleted {
        /// Gateway seconds from the frame's first packet to its last
        duration_s: Option<f64>,
    },
}

/// One assembly step: the event plus any non-fatal command failure
#[derive(Debug)]
pub struct AssemblyStep {
    pub event: AssemblyEvent,
    pub command_error: Option<ContractError>,
}

impl AssemblyStep {
    fn new(event: AssemblyEvent) -> Self {
        Self {
            event,
            command_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameAssembler {
    node: NodeId,
    state: AssemblerState,
    expected_version: u8,
    frame_started_at: Option<f64>,
}

impl FrameAssembler {
    pub fn new(node: NodeId, expected_version: u8) -> Self {
        Self {
            node,
            state: AssemblerState::AwaitingHandshake,
            expected_version,
            frame_started_at: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn expected_version(&self) -> u8 {
        self.expected_version
    }

    /// Back to `AwaitingHandshake`.
    pub fn reset(&mut self) {
        self.state = AssemblerState::AwaitingHandshake;
        self.frame_started_at = None;
    }

    /// Drop the frame in progress after a buffer resize. The handshake
    /// state is kept.
    pub fn abandon_frame(&mut self) {
        if self.state == AssemblerState::Accumulating {
            self.state = AssemblerState::AwaitingFrameStart;
        }
        self.frame_started_at = None;
    }

    /// Feed one packet in timestamp order.
    ///
    /// `announce` sends the sampling parameters (`22`). A failure while
    /// answering the first handshake is fatal and leaves the state
    /// unchanged; any other failure is returned in the step.
    pub fn handle<F>(
        &mut self,
        packet: &RawPacket,
        store: &FrameStore,
        mut announce: F,
    ) -> Result<AssemblyStep>
    where
        F: FnMut() -> std::result::Result<(), ContractError>,
    {
        if packet.is_handshake() {
            return self.on_handshake(&mut announce);
        }
        if self.state == AssemblerState::AwaitingHandshake {
            debug!(node = %self.node, "data before handshake dropped");
            return Ok(AssemblyStep::new(AssemblyEvent::Dropped));
        }

        let report = store.ingest(&packet.payload);
        if let Some(reset) = report.reset {
            warn!(node = %self.node, ?reset, "frame cursor reset");
            record_realignment(&self.node, reset.reason());
        }

        let started = match report.outcome {
            IngestOutcome::Discarded => {
                debug!(node = %self.node, "waiting for start of new frame");
                self.state = AssemblerState::AwaitingFrameStart;
                return Ok(AssemblyStep::new(AssemblyEvent::Dropped));
            }
            IngestOutcome::Oversized { words, capacity } => {
                warn!(node = %self.node, words, capacity, "payload larger than a frame dropped");
                self.state = AssemblerState::AwaitingFrameStart;
                return Ok(AssemblyStep::new(AssemblyEvent::Dropped));
            }
            IngestOutcome::Appended { started, .. } | IngestOutcome::Completed { started } => {
                started
            }
        };

        let mut command_error = None;
        if let Some(header) = started {
            command_error = self.on_frame_start(packet.timestamp, header, &mut announce);
        }

        let event = if let IngestOutcome::Completed { .. } = report.outcome {
            self.state = AssemblerState::AwaitingFrameStart;
            let duration_s = self
                .frame_started_at
                .take()
                .map(|start| packet.timestamp - start);
            debug!(node = %self.node, ?duration_s, "frame complete");
            AssemblyEvent::FrameCompleted { duration_s }
        } else {
            self.state = AssemblerState::Accumulating;
            AssemblyEvent::Progress
        };

        Ok(AssemblyStep {
            event,
            command_error,
        })
    }

    fn on_handshake<F>(&mut self, announce: &mut F) -> Result<AssemblyStep>
    where
        F: FnMut() -> std::result::Result<(), ContractError>,
    {
        let first = self.state == AssemblerState::AwaitingHandshake;
        info!(node = %self.node, first, "node advertised it is ready");

        match announce() {
            Ok(()) => {
                if first {
                    self.state = AssemblerState::AwaitingFrameStart;
                }
                Ok(AssemblyStep::new(AssemblyEvent::HandshakeAcknowledged {
                    first,
                }))
            }
            Err(source) if first => Err(FrameEngineError::HandshakeFailed {
                node: self.node.to_string(),
                source,
            }),
            Err(err) => {
                warn!(node = %self.node, error = %err, "re-handshake parameters not sent");
                Ok(AssemblyStep {
                    event: AssemblyEvent::HandshakeAcknowledged { first },
                    command_error: Some(err),
                })
            }
        }
    }

    fn on_frame_start<F>(
        &mut self,
        timestamp: f64,
        header: FrameHeader,
        announce: &mut F,
    ) -> Option<ContractError>
    where
        F: FnMut() -> std::result::Result<(), ContractError>,
    {
        self.frame_started_at = Some(timestamp);
        debug!(node = %self.node, timestamp, axis = ?header.axis, "frame beginning");

        if header.version != self.expected_version {
            warn!(
                node = %self.node,
                expected = self.expected_version,
                firmware = header.version,
                "protocol version mismatch"
            );
            record_version_mismatch(&self.node);
        }
        if header.axis.is_none() {
            warn!(node = %self.node, "frame header axis selector not decodable");
        }

        // 节点依赖持续收到参数才会继续采样
        announce()
            .map_err(|err| {
                warn!(node = %self.node, error = %err, "sampling parameters not re-sent");
                err
            })
            .err()
    }
}
