//! Raw gateway packet

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One radio payload as delivered by the gateway.
///
/// `timestamp` is gateway UTC seconds (`secs + 1e-6 * usecs`). The payload
/// is a run of little-endian 16-bit words, or the 4-byte handshake preamble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPacket {
    pub timestamp: f64,
    pub payload: Bytes,
}

impl RawPacket {
    pub fn new(timestamp: f64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Build from the gateway's split `secs`/`usecs` notification fields.
    pub fn from_utc(secs: u64, usecs: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(secs as f64 + 1e-6 * usecs as f64, payload)
    }

    /// Whether this payload is exactly the handshake preamble.
    pub fn is_handshake(&self) -> bool {
        self.payload.as_ref() == crate::HANDSHAKE_PREAMBLE
    }
}
