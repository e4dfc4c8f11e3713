//! # Frame Engine
//!
//! 振动传感器节点的帧重建流水线。
//!
//! 负责：
//! - 按时间戳重排 mesh 网络乱序到达的数据包
//! - 握手与帧对齐状态机
//! - 双缓冲（ping-pong）帧存储与原子切换
//! - 零点偏移校准
//! - 每帧统计与报警判定（委托给 `analytics`）
//!
//! ## 使用示例
//!
//! ```ignore
//! use frame_engine::SensorNode;
//!
//! let node = SensorNode::new(node_id, &config, command_sink)?;
//!
//! // Feed packets as the gateway delivers them
//! let report = node.handle_packet(packet)?;
//! if report.frame_completed {
//!     let frame = node.latest_frame();
//! }
//! ```

mod assembler;
mod calibration;
mod error;
mod node;
mod reorder;
mod store;

pub use assembler::{AssemblerState, AssemblyEvent, AssemblyStep, FrameAssembler};
pub use calibration::{CalibrationOutcome, OffsetCalibrator};
pub use error::{FrameEngineError, Result};
pub use node::{NodeReport, SensorNode};
pub use reorder::PacketReorderBuffer;
pub use store::{FrameStore, IngestOutcome, IngestReport, SoftReset};
