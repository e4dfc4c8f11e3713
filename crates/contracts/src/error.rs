//! Layered error definitions
//!
//! Categorized by source: config / layout / command / gateway

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Frame Layout Errors =====
    /// Sample count cannot be laid out as a frame
    #[error("invalid frame layout for sample_count={sample_count}: {message}")]
    InvalidLayout { sample_count: usize, message: String },

    // ===== Command Errors =====
    /// A command field does not fit in its fixed-width slot
    #[error("command field '{field}' value '{value}' exceeds {width} characters")]
    CommandFieldOverflow {
        field: &'static str,
        value: String,
        width: usize,
    },

    /// Outbound command could not be delivered to the node
    #[error("command {descriptor} to node '{node}' failed: {message}")]
    CommandSend {
        node: String,
        descriptor: u8,
        message: String,
    },

    // ===== Gateway Errors =====
    /// Gateway transport lost
    #[error("gateway disconnected: {message}")]
    GatewayDisconnected { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create frame layout error
    pub fn invalid_layout(sample_count: usize, message: impl Into<String>) -> Self {
        Self::InvalidLayout {
            sample_count,
            message: message.into(),
        }
    }

    /// Create command delivery error
    pub fn command_send(
        node: impl Into<String>,
        descriptor: u8,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandSend {
            node: node.into(),
            descriptor,
            message: message.into(),
        }
    }
}
