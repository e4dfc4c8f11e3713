//! Ingestion 错误类型

use frame_engine::FrameEngineError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 节点已注册到网关链路
    #[error("node {node_id} is already attached")]
    AlreadyAttached {
        /// 节点 ID
        node_id: String,
    },

    /// 节点未注册
    #[error("node {node_id} is not attached")]
    NotAttached {
        /// 节点 ID
        node_id: String,
    },

    /// 通道已关闭
    #[error("channel closed for node {node_id}")]
    ChannelClosed {
        /// 节点 ID
        node_id: String,
    },

    /// 节点创建失败
    #[error(transparent)]
    Engine(#[from] FrameEngineError),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
