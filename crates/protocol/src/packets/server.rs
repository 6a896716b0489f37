//! Server -> Client packets.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// One grid cell on the wire: `[owner, claimed]`.
///
/// An owner with `claimed == false` is an unsealed trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellState(pub Option<String>, pub bool);

/// Full map snapshot, outer index x, inner index y.
pub type MapState = Vec<Vec<CellState>>;

/// Full player state, sent when a player first becomes visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub username: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

/// Per-tick physical state carried inside `UpdateState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPhysics {
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

/// The joining player's own identity inside `GameJoin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Me {
    pub username: String,
}

/// Initial snapshot sent once after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameJoinPayload {
    pub me: Me,
    pub players: Vec<PlayerSnapshot>,
    pub map: MapState,
}

/// World state broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatePayload {
    pub map: MapState,
    pub players_states: Vec<PlayerPhysics>,
}

/// Explanation sent just before a forced close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectPayload {
    pub reason: String,
}

/// A packet sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ServerPacket {
    /// Keepalive reply carrying the server's clock in milliseconds.
    Pong(u64),
    /// Sent once on successful join.
    GameJoin(GameJoinPayload),
    /// Another player connected.
    PlayerJoin(PlayerSnapshot),
    /// A player disconnected.
    PlayerLeave(String),
    /// Per-tick broadcast of the whole world.
    UpdateState(UpdateStatePayload),
    /// Sent just before a forced close (e.g. duplicate name).
    Disconnect(DisconnectPayload),
}

impl ServerPacket {
    /// Serialize into a single text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn to_value(packet: &ServerPacket) -> Value {
        serde_json::from_str(&packet.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_encode_pong() {
        let value = to_value(&ServerPacket::Pong(1_700_000_000_000));
        assert_eq!(value, json!({ "op": "Pong", "d": 1_700_000_000_000u64 }));
    }

    #[test]
    fn test_encode_player_join_uses_camel_case() {
        let value = to_value(&ServerPacket::PlayerJoin(PlayerSnapshot {
            username: "alice".to_owned(),
            color: "#22D445".to_owned(),
            x: 200.0,
            y: 200.0,
            vel_x: 5.0,
            vel_y: 0.0,
        }));
        assert_eq!(
            value,
            json!({
                "op": "PlayerJoin",
                "d": {
                    "username": "alice",
                    "color": "#22D445",
                    "x": 200.0,
                    "y": 200.0,
                    "velX": 5.0,
                    "velY": 0.0,
                }
            })
        );
    }

    #[test]
    fn test_encode_player_leave() {
        let value = to_value(&ServerPacket::PlayerLeave("bob".to_owned()));
        assert_eq!(value, json!({ "op": "PlayerLeave", "d": "bob" }));
    }

    #[test]
    fn test_encode_update_state() {
        let map: MapState = vec![vec![
            CellState(None, false),
            CellState(Some("bob".to_owned()), true),
        ]];
        let value = to_value(&ServerPacket::UpdateState(UpdateStatePayload {
            map,
            players_states: vec![PlayerPhysics {
                username: "bob".to_owned(),
                x: 40.0,
                y: 0.0,
                vel_x: 0.0,
                vel_y: -5.0,
            }],
        }));
        assert_eq!(
            value,
            json!({
                "op": "UpdateState",
                "d": {
                    "map": [[[null, false], ["bob", true]]],
                    "playersStates": [{
                        "username": "bob",
                        "x": 40.0,
                        "y": 0.0,
                        "velX": 0.0,
                        "velY": -5.0,
                    }],
                }
            })
        );
    }

    #[test]
    fn test_encode_disconnect() {
        let value = to_value(&ServerPacket::Disconnect(DisconnectPayload {
            reason: "Username is already taken.".to_owned(),
        }));
        assert_eq!(
            value,
            json!({ "op": "Disconnect", "d": { "reason": "Username is already taken." } })
        );
    }

    #[test]
    fn test_game_join_roundtrip() {
        let packet = ServerPacket::GameJoin(GameJoinPayload {
            me: Me { username: "alice".to_owned() },
            players: vec![],
            map: vec![vec![CellState::default()]],
        });
        let decoded: ServerPacket = serde_json::from_str(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded, packet);
    }
}
