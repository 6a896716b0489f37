//! Packet definitions for the JSON wire protocol.
//!
//! Every frame is a JSON object of the form `{"op": <opcode>, "d": <payload>}`.
//! Anything that does not decode into one of the known opcode/payload shapes
//! is rejected at the boundary.

mod client;
mod server;

pub use client::ClientPacket;
pub use server::{
    CellState, DisconnectPayload, GameJoinPayload, MapState, Me, PlayerPhysics, PlayerSnapshot,
    ServerPacket, UpdateStatePayload,
};
