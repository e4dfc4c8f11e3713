//! Channel-backed command sink
//!
//! Encodes commands and queues them for the task that owns the gateway
//! connection. `send` never waits on the radio.

use async_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use contracts::{Command, CommandSink, ContractError, NodeId};
use tracing::trace;

/// One encoded command waiting for the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCommand {
    pub node: NodeId,
    pub command: Command,
    /// 48-byte wire message
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    tx: Sender<OutboundCommand>,
}

impl ChannelCommandSink {
    pub fn new(tx: Sender<OutboundCommand>) -> Self {
        Self { tx }
    }

    pub fn unbounded() -> (Self, Receiver<OutboundCommand>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// Commands beyond `capacity` in flight are rejected with `CommandSend`.
    pub fn bounded(capacity: usize) -> (Self, Receiver<OutboundCommand>) {
        let (tx, rx) = bounded(capacity);
        (Self::new(tx), rx)
    }
}

impl CommandSink for ChannelCommandSink {
    fn send(&self, node: &NodeId, command: &Command) -> Result<(), ContractError> {
        let message = command.encode()?;
        let descriptor = command.descriptor();
        let outbound = OutboundCommand {
            node: node.clone(),
            command: *command,
            message,
        };

        match self.tx.try_send(outbound) {
            Ok(()) => {
                trace!(node = %node, descriptor, "command queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ContractError::command_send(
                node.as_str(),
                descriptor,
                "outbound queue full",
            )),
            Err(TrySendError::Closed(_)) => Err(ContractError::GatewayDisconnected {
                message: format!("command {descriptor} for {node} not delivered"),
            }),
        }
    }
}
