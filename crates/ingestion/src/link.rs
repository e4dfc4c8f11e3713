//! GatewayLink - packet callbacks to per-node tasks
//!
//! Each attached source delivers into its own channel; a tokio task per node
//! drains the channel into `SensorNode::handle_packet`. The callback only
//! does a non-blocking send.

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use contracts::{NodeId, PacketCallback, PacketSource, RawPacket};
use frame_engine::{FrameEngineError, SensorNode};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{IngestionMetrics, LinkConfig};
use crate::error::{IngestionError, Result};
use crate::registry::NodeRegistry;

struct NodeSession {
    node: Arc<SensorNode>,
    source: Arc<dyn PacketSource>,
    receiver: Option<Receiver<RawPacket>>,
    task: Option<JoinHandle<()>>,
}

/// Gateway link
///
/// `start_all` spawns tasks and must be called inside a tokio runtime.
pub struct GatewayLink {
    registry: Arc<NodeRegistry>,
    sessions: HashMap<NodeId, NodeSession>,
    metrics: Arc<IngestionMetrics>,
    config: LinkConfig,
}

impl GatewayLink {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_config(registry, LinkConfig::default())
    }

    pub fn with_config(registry: Arc<NodeRegistry>, config: LinkConfig) -> Self {
        Self {
            registry,
            sessions: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            config,
        }
    }

    /// Attach a node's packet source, creating the node if needed.
    #[instrument(
        name = "gateway_link_attach",
        skip(self, source),
        fields(node = %source.node_id())
    )]
    pub fn attach(&mut self, source: Arc<dyn PacketSource>) -> Result<Arc<SensorNode>> {
        let id = source.node_id().clone();
        if self.sessions.contains_key(&id) {
            return Err(IngestionError::AlreadyAttached {
                node_id: id.to_string(),
            });
        }

        let node = self.registry.get_or_create(&id)?;
        self.sessions.insert(
            id.clone(),
            NodeSession {
                node: node.clone(),
                source,
                receiver: None,
                task: None,
            },
        );
        debug!(node = %id, "packet source attached");
        Ok(node)
    }

    /// Start delivery for every attached source not yet running
    #[instrument(name = "gateway_link_start_all", skip(self))]
    pub fn start_all(&mut self) {
        info!(count = self.sessions.len(), "starting node sessions");
        for (id, session) in self.sessions.iter_mut() {
            if session.task.is_none() {
                Self::start_session(id, session, &self.config, &self.metrics);
            }
        }
    }

    fn start_session(
        id: &NodeId,
        session: &mut NodeSession,
        config: &LinkConfig,
        metrics: &Arc<IngestionMetrics>,
    ) {
        let (tx, rx) = match config.channel_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };

        let callback: PacketCallback = {
            let metrics = metrics.clone();
            let id = id.clone();
            Arc::new(move |packet: RawPacket| deliver(&tx, packet, &metrics, &id))
        };
        session.source.listen(callback);

        session.task = Some(tokio::spawn(run_session(
            session.node.clone(),
            rx.clone(),
            metrics.clone(),
        )));
        session.receiver = Some(rx);
        debug!(node = %id, "node session started");
    }

    /// Stop all sources. Queued packets are still processed.
    #[instrument(name = "gateway_link_stop_all", skip(self))]
    pub fn stop_all(&mut self) {
        info!(count = self.sessions.len(), "stopping node sessions");
        for session in self.sessions.values_mut() {
            session.source.stop();
            if let Some(rx) = session.receiver.take() {
                rx.close();
            }
        }
    }

    /// Wait for every session task to finish.
    ///
    /// Tasks end once their source stops delivering, or after `stop_all`.
    pub async fn join_all(&mut self) {
        for (id, session) in self.sessions.iter_mut() {
            if let Some(task) = session.task.take() {
                if let Err(err) = task.await {
                    error!(node = %id, error = %err, "node session task failed");
                }
            }
        }
    }

    /// Transport to one node lost: stop its source, discard queued packets
    /// and reset the node. Calling `start_all` again resumes delivery.
    #[instrument(name = "gateway_link_disconnect", skip(self), fields(node = %id))]
    pub fn disconnect(&mut self, id: &NodeId) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| IngestionError::NotAttached {
                node_id: id.to_string(),
            })?;

        session.source.stop();
        if let Some(rx) = session.receiver.take() {
            rx.close();
            while rx.try_recv().is_ok() {}
        }
        if let Some(task) = session.task.take() {
            task.abort();
        }
        session.node.disconnect();
        warn!(node = %id, "node link lost");
        Ok(())
    }

    pub fn node(&self, id: &NodeId) -> Option<Arc<SensorNode>> {
        self.sessions.get(id).map(|session| session.node.clone())
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn node_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_node_listening(&self, id: &NodeId) -> bool {
        self.sessions
            .get(id)
            .map(|session| session.source.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for GatewayLink {
    fn drop(&mut self) {
        for session in self.sessions.values() {
            session.source.stop();
        }
    }
}

#[inline]
fn deliver(tx: &Sender<RawPacket>, packet: RawPacket, metrics: &IngestionMetrics, id: &NodeId) {
    metrics.record_received();
    match tx.try_send(packet) {
        Ok(()) => {
            trace!(node = %id, "packet queued");
        }
        Err(TrySendError::Full(_)) => {
            metrics.record_dropped();
            metrics::counter!("vibemon_gateway_packets_dropped_total", "node" => id.to_string())
                .increment(1);
            warn!(node = %id, "node queue full, packet dropped");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(node = %id, "node session closed, packet dropped");
        }
    }
}

async fn run_session(
    node: Arc<SensorNode>,
    rx: Receiver<RawPacket>,
    metrics: Arc<IngestionMetrics>,
) {
    while let Ok(packet) = rx.recv().await {
        metrics.update_queue_len(rx.len());
        match node.handle_packet(packet) {
            Ok(report) => {
                if report.frame_completed {
                    metrics.record_frame();
                }
            }
            Err(err @ FrameEngineError::HandshakeFailed { .. }) => {
                // 节点保持等待握手，下一个前导码会重试
                metrics.record_handshake_failure();
                metrics::counter!(
                    "vibemon_handshake_failures_total",
                    "node" => node.id().to_string()
                )
                .increment(1);
                error!(node = %node.id(), error = %err, "node bring-up failed");
            }
            Err(err) => {
                warn!(node = %node.id(), error = %err, "packet handling failed");
            }
        }
    }
    debug!(node = %node.id(), "node session ended");
}
