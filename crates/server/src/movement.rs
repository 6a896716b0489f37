//! Per-tick movement and grid alignment.
//!
//! Players move continuously but only change direction (and only trigger
//! territory resolution) on the ticks where their position sits exactly on
//! a cell boundary.

use crate::session::Player;
use glam::Vec2;

/// Pressed-key identifiers recognized by the movement state machine.
pub const KEY_STOP: &str = " ";
pub const KEY_DOWN: &str = "ArrowDown";
pub const KEY_UP: &str = "ArrowUp";
pub const KEY_RIGHT: &str = "ArrowRight";
pub const KEY_LEFT: &str = "ArrowLeft";

/// Advance the player's position by its velocity and confine it to the map.
pub fn advance(player: &mut Player, map_size: usize, cell_size: f32) {
    let max = (map_size as f32 - 1.0) * cell_size;
    player.position += player.velocity;
    player.position.x = player.position.x.clamp(0.0, max);
    player.position.y = player.position.y.clamp(0.0, max);
}

/// Whether both coordinates sit exactly on a cell boundary.
pub fn is_aligned(player: &Player, cell_size: f32) -> bool {
    player.position.x % cell_size == 0.0 && player.position.y % cell_size == 0.0
}

/// Re-derive velocity from the pressed-key set. Only called on aligned ticks.
///
/// The priority order is a fixed tie-break when a client holds several
/// directions at once: stop beats down beats up beats right beats left.
pub fn steer(player: &mut Player) {
    if player.inputs.contains(KEY_STOP) {
        player.velocity = Vec2::ZERO;
    } else if player.inputs.contains(KEY_DOWN) {
        player.velocity = Vec2::new(0.0, player.speed);
    } else if player.inputs.contains(KEY_UP) {
        player.velocity = Vec2::new(0.0, -player.speed);
    } else if player.inputs.contains(KEY_RIGHT) {
        player.velocity = Vec2::new(player.speed, 0.0);
    } else if player.inputs.contains(KEY_LEFT) {
        player.velocity = Vec2::new(-player.speed, 0.0);
    } else {
        player.velocity = Vec2::ZERO;
    }
}

/// Cell under the player. Valid only while the position is clamped in-map.
pub fn current_cell(player: &Player, cell_size: f32) -> (usize, usize) {
    (
        (player.position.x / cell_size).floor() as usize,
        (player.position.y / cell_size).floor() as usize,
    )
}
