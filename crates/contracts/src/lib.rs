//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Packet timestamps are gateway UTC seconds (`f64`), `secs + 1e-6 * usecs`
//! - Ordering inside a node is by timestamp, ties broken by arrival order

mod command;
mod config;
mod error;
mod frame;
mod node_id;
mod packet;
mod packet_source;
mod statistics;

pub use command::{Command, COMMAND_FIELD_COUNT, COMMAND_FIELD_WIDTH, COMMAND_FILLER};
pub use config::*;
pub use error::*;
pub use frame::*;
pub use node_id::NodeId;
pub use packet::RawPacket;
pub use packet_source::{CommandSink, PacketCallback, PacketSource};
pub use statistics::*;
