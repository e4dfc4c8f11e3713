//! PacketSource / CommandSink traits - Gateway abstraction
//!
//! Decouples the frame pipeline from the concrete mesh gateway. A real
//! SmartMesh manager and the mock mote implement the same interface.

use std::sync::Arc;

use crate::{Command, ContractError, NodeId, RawPacket};

/// Packet callback type
///
/// Invoked from the gateway's delivery context for every notification of
/// one node. Must not block.
pub type PacketCallback = Arc<dyn Fn(RawPacket) + Send + Sync>;

/// Packet source for a single node
///
/// # Example
///
/// ```ignore
/// let source: Arc<dyn PacketSource> = gateway.source_for(&node_id);
/// source.listen(Arc::new(|packet| {
///     println!("{} bytes at {}", packet.payload.len(), packet.timestamp);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait PacketSource: Send + Sync {
    /// Node this source delivers packets for
    fn node_id(&self) -> &NodeId;

    /// Register the delivery callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: PacketCallback);

    /// Stop delivery
    fn stop(&self);

    fn is_listening(&self) -> bool;
}

/// Outbound command path to the gateway
///
/// Called while the node's pipeline lock is held; implementations must
/// hand off without waiting on the radio.
pub trait CommandSink: Send + Sync {
    fn send(&self, node: &NodeId, command: &Command) -> Result<(), ContractError>;
}
