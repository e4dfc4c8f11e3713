//! Frame engine error types.

use contracts::ContractError;
use thiserror::Error;

/// Frame engine error type
#[derive(Debug, Error)]
pub enum FrameEngineError {
    /// Parameters could not be sent in reply to the node's first handshake.
    /// The node stays in `AwaitingHandshake`.
    #[error("handshake with node '{node}' failed")]
    HandshakeFailed {
        node: String,
        #[source]
        source: ContractError,
    },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FrameEngineError>;
