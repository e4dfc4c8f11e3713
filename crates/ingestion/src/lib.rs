//! # Ingestion
//!
//! Gateway side of the vibration monitor.
//!
//! Responsibilities:
//! - Attach per-node packet sources (real gateway or mock mote)
//! - Hand packets from delivery callbacks to per-node tasks via async-channel
//! - Create nodes on discovery with the shared configuration
//! - Queue encoded downlink commands for the gateway
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ChannelCommandSink, GatewayLink, NodeRegistry};
//!
//! let (sink, outbound) = ChannelCommandSink::unbounded();
//! let registry = Arc::new(NodeRegistry::new(config, Arc::new(sink)));
//! let mut link = GatewayLink::new(registry);
//!
//! let node = link.attach(gateway.source_for(&node_id))?;
//! link.start_all();
//!
//! while let Ok(cmd) = outbound.recv().await {
//!     gateway.send_data(&cmd.node, cmd.message.as_bytes()).await?;
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{MockMote, MockMoteSource};
//!
//! let mut mote = MockMote::new("node-1", config.sampling)?;
//! let mut script = vec![mote.handshake()];
//! script.extend(mote.sine_frame(Axis::X, 0.5, 16.0));
//! link.attach(Arc::new(MockMoteSource::new(mote.id().clone(), script)))?;
//! ```

mod command_sink;
mod config;
mod error;
mod link;
mod mock;
mod registry;

pub use command_sink::{ChannelCommandSink, OutboundCommand};
pub use config::{IngestionMetrics, LinkConfig, MetricsSnapshot};
pub use contracts::RawPacket;
pub use error::{IngestionError, Result};
pub use link::GatewayLink;
pub use mock::{MockMote, MockMoteSource, DEFAULT_PACKET_WORDS};
pub use registry::NodeRegistry;
