//! Shared protocol crate for pepo.
//!
//! This crate contains:
//! - Packet definitions for both directions of the JSON wire protocol
//! - Strict decode/encode helpers
//! - The close-code taxonomy used when the server rejects a connection

mod error;
pub mod packets;

pub use error::ProtocolError;
pub use packets::{
    CellState, ClientPacket, DisconnectPayload, GameJoinPayload, MapState, Me, PlayerPhysics,
    PlayerSnapshot, ServerPacket, UpdateStatePayload,
};

/// Maximum number of keys a client may report pressed in one `Input` packet.
pub const MAX_INPUT_KEYS: usize = 30;

/// Username length bounds (in chars) enforced at login.
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 16;

/// Why the server is closing a connection.
///
/// Clients treat the codes as a closed taxonomy, so every rejection reason
/// keeps a stable, distinct code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The first message was not a well-formed `Login`.
    BadLogin,
    /// The requested username is already registered.
    DuplicateUsername,
    /// Malformed packet, unexpected opcode or oversized input while active.
    ProtocolViolation,
    /// No login arrived within the authentication window.
    AuthTimeout,
}

impl CloseReason {
    /// WebSocket close code sent with the closing frame.
    pub fn code(self) -> u16 {
        match self {
            CloseReason::BadLogin => 4000,
            CloseReason::DuplicateUsername => 4003,
            CloseReason::ProtocolViolation => 4005,
            CloseReason::AuthTimeout => 4008,
        }
    }

    /// Short human-readable reason attached to the closing frame.
    pub fn message(self) -> &'static str {
        match self {
            CloseReason::BadLogin => "invalid login",
            CloseReason::DuplicateUsername => "username is already taken",
            CloseReason::ProtocolViolation => "protocol violation",
            CloseReason::AuthTimeout => "authentication timed out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_codes_are_distinct() {
        let reasons = [
            CloseReason::BadLogin,
            CloseReason::DuplicateUsername,
            CloseReason::ProtocolViolation,
            CloseReason::AuthTimeout,
        ];
        for a in &reasons {
            for b in &reasons {
                if a != b {
                    assert_ne!(a.code(), b.code());
                }
            }
        }
    }

    #[test]
    fn test_close_codes_in_private_range() {
        assert_eq!(CloseReason::BadLogin.code(), 4000);
        assert_eq!(CloseReason::DuplicateUsername.code(), 4003);
        assert_eq!(CloseReason::ProtocolViolation.code(), 4005);
        assert_eq!(CloseReason::AuthTimeout.code(), 4008);
    }
}
