//! Node registry
//!
//! Nodes are created on first contact with the shared monitor
//! configuration and command sink, then looked up by id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use contracts::{CommandSink, MonitorConfig, NodeId};
use frame_engine::SensorNode;
use tracing::info;

use crate::error::Result;

pub struct NodeRegistry {
    config: MonitorConfig,
    commands: Arc<dyn CommandSink>,
    nodes: RwLock<HashMap<NodeId, Arc<SensorNode>>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("config", &self.config)
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}

impl NodeRegistry {
    pub fn new(config: MonitorConfig, commands: Arc<dyn CommandSink>) -> Self {
        Self {
            config,
            commands,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<NodeId, Arc<SensorNode>>> {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<NodeId, Arc<SensorNode>>> {
        self.nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Look up a node, creating it on first contact.
    pub fn get_or_create(&self, id: &NodeId) -> Result<Arc<SensorNode>> {
        if let Some(node) = self.read().get(id) {
            return Ok(node.clone());
        }

        let mut nodes = self.write();
        if let Some(node) = nodes.get(id) {
            return Ok(node.clone());
        }
        let node = Arc::new(SensorNode::new(
            id.clone(),
            &self.config,
            self.commands.clone(),
        )?);
        nodes.insert(id.clone(), node.clone());
        info!(node = %id, total = nodes.len(), "node discovered");
        Ok(node)
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<SensorNode>> {
        self.read().get(id).cloned()
    }

    pub fn remove(&self, id: &NodeId) -> Option<Arc<SensorNode>> {
        self.write().remove(id)
    }

    /// Registered node ids, sorted
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.read().keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
