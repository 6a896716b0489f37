//! Pepo game server library.

pub mod config;
pub mod map;
pub mod movement;
pub mod server;
pub mod session;
pub mod territory;

// Re-export commonly used types
pub use config::Config;
pub use map::{Cell, GridMap};
pub use server::{GameState, RegisterError, TickAccumulator, run, run_game_loop};
pub use session::{Player, Registry};
