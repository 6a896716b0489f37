//! Client -> Server packets.

use crate::{MAX_INPUT_KEYS, ProtocolError};
use serde::{Deserialize, Serialize};

/// A packet sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientPacket {
    /// Choose a username. Must be the first message on the connection and
    /// is invalid afterwards.
    Login(String),
    /// Keepalive carrying the client's clock in milliseconds.
    Ping(f64),
    /// Replace the pressed-key set.
    Input(Vec<String>),
}

impl ClientPacket {
    /// Decode a single text frame, enforcing payload shape limits.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let packet: ClientPacket = serde_json::from_str(text)?;
        if let ClientPacket::Input(keys) = &packet {
            if keys.len() > MAX_INPUT_KEYS {
                return Err(ProtocolError::OversizedInput(keys.len()));
            }
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_login() {
        let packet = ClientPacket::decode(r#"{"op":"Login","d":"alice"}"#).unwrap();
        assert_eq!(packet, ClientPacket::Login("alice".to_owned()));
    }

    #[test]
    fn test_decode_ping() {
        let packet = ClientPacket::decode(r#"{"op":"Ping","d":1700000000000}"#).unwrap();
        assert_eq!(packet, ClientPacket::Ping(1_700_000_000_000.0));
    }

    #[test]
    fn test_decode_input() {
        let packet = ClientPacket::decode(r#"{"op":"Input","d":["ArrowUp","ArrowLeft"]}"#).unwrap();
        assert_eq!(
            packet,
            ClientPacket::Input(vec!["ArrowUp".to_owned(), "ArrowLeft".to_owned()])
        );
    }

    #[test]
    fn test_decode_unknown_opcode() {
        assert!(matches!(
            ClientPacket::decode(r#"{"op":"Teleport","d":[0,0]}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_input_not_an_array() {
        assert!(matches!(
            ClientPacket::decode(r#"{"op":"Input","d":"ArrowUp"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_input_over_limit() {
        let keys: Vec<String> = (0..31).map(|i| format!("k{i}")).collect();
        let frame = serde_json::to_string(&serde_json::json!({ "op": "Input", "d": keys })).unwrap();
        assert!(matches!(
            ClientPacket::decode(&frame),
            Err(ProtocolError::OversizedInput(31))
        ));
    }

    #[test]
    fn test_decode_input_at_limit() {
        let keys: Vec<String> = (0..30).map(|i| format!("k{i}")).collect();
        let frame = serde_json::to_string(&serde_json::json!({ "op": "Input", "d": keys })).unwrap();
        assert!(ClientPacket::decode(&frame).is_ok());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(ClientPacket::decode("not json at all").is_err());
        assert!(ClientPacket::decode(r#"{"d":"alice"}"#).is_err());
    }
}
