//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("oversized input set ({0} keys)")]
    OversizedInput(usize),
}
