//! Player sessions and the connected-player registry.

use crate::map::GridMap;
use glam::Vec2;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Fixed color palette; one entry is picked at random per join.
pub const PALETTE: [&str; 9] = [
    "#22D445", "#DC3C8C", "#3841D5", "#3DE6E8", "#F09214", "#A314F0", "#F01414", "#F0E839",
    "#673737",
];

/// A connected, authenticated player.
///
/// The registry exclusively owns these; the grid map refers to players by
/// username only.
#[derive(Debug, Clone)]
pub struct Player {
    pub username: String,
    pub color: String,
    /// Continuous position in pixels.
    pub position: Vec2,
    /// Pixels per tick.
    pub velocity: Vec2,
    pub speed: f32,
    /// Currently pressed keys, replaced wholesale by `Input` packets.
    pub inputs: HashSet<String>,
}

impl Player {
    pub fn new(username: &str, speed: f32) -> Self {
        let mut rng = rand::rng();
        Self {
            username: username.to_owned(),
            color: PALETTE[rng.random_range(0..PALETTE.len())].to_owned(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            speed,
            inputs: HashSet::new(),
        }
    }
}

/// The set of connected players.
///
/// Iteration follows join order, which fixes the per-tick processing order:
/// simultaneous claims resolve player-by-player, each seeing the map left by
/// the previous one.
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<String, Player>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.players.contains_key(username)
    }

    pub fn insert(&mut self, player: Player) {
        debug_assert!(!self.players.contains_key(&player.username));
        self.order.push(player.username.clone());
        self.players.insert(player.username.clone(), player);
    }

    pub fn remove(&mut self, username: &str) -> Option<Player> {
        let player = self.players.remove(username)?;
        self.order.retain(|name| name != username);
        Some(player)
    }

    pub fn get(&self, username: &str) -> Option<&Player> {
        self.players.get(username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut Player> {
        self.players.get_mut(username)
    }

    /// Usernames in join order.
    pub fn join_order(&self) -> &[String] {
        &self.order
    }

    /// Players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|name| self.players.get(name))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Spawn cells on one axis, derived from the map size.
///
/// For the default 50-cell map this yields 5, 25 and 45; the nine
/// combinations form the spawn point list.
fn spawn_axis(size: usize) -> [usize; 3] {
    [size / 10, size / 2, size * 9 / 10]
}

/// Pick a uniformly random spawn cell for a map of `size` cells.
pub fn random_spawn(size: usize) -> (usize, usize) {
    let axis = spawn_axis(size);
    let mut rng = rand::rng();
    (
        axis[rng.random_range(0..axis.len())],
        axis[rng.random_range(0..axis.len())],
    )
}

/// Respawn `player` at a random spawn point.
///
/// The 3x3 block centered on the spawn cell is overwritten to claimed
/// territory of the player, so every (re)spawn starts on safe land. The
/// player's land elsewhere on the map is not touched here.
pub fn respawn_player(player: &mut Player, map: &mut GridMap, cell_size: f32) {
    let (cx, cy) = random_spawn(map.size());
    debug_assert!(cx >= 1 && cx + 1 < map.size() && cy >= 1 && cy + 1 < map.size());

    for x in (cx - 1)..=(cx + 1) {
        for y in (cy - 1)..=(cy + 1) {
            map.set(x, y, Some(&player.username), true);
        }
    }

    player.inputs.clear();
    player.velocity = Vec2::ZERO;
    player.position = Vec2::new(cx as f32 * cell_size, cy as f32 * cell_size);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_axis_matches_default_map() {
        assert_eq!(spawn_axis(50), [5, 25, 45]);
    }

    #[test]
    fn test_random_spawn_is_a_known_point() {
        for _ in 0..100 {
            let (x, y) = random_spawn(50);
            assert!([5, 25, 45].contains(&x));
            assert!([5, 25, 45].contains(&y));
        }
    }

    #[test]
    fn test_registry_preserves_join_order() {
        let mut registry = Registry::new();
        registry.insert(Player::new("alice", 5.0));
        registry.insert(Player::new("bob", 5.0));
        registry.insert(Player::new("carol", 5.0));
        assert_eq!(registry.join_order(), ["alice", "bob", "carol"]);

        registry.remove("bob");
        assert_eq!(registry.join_order(), ["alice", "carol"]);
        assert!(!registry.contains("bob"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_respawn_claims_centered_block() {
        let mut map = GridMap::new(50);
        let mut player = Player::new("alice", 5.0);
        player.inputs.insert("ArrowUp".to_owned());
        player.velocity = Vec2::new(5.0, 0.0);

        respawn_player(&mut player, &mut map, 40.0);

        let cx = (player.position.x / 40.0) as usize;
        let cy = (player.position.y / 40.0) as usize;
        assert!([5, 25, 45].contains(&cx));
        assert!([5, 25, 45].contains(&cy));
        // Center-aligned on the spawn cell, stopped, inputs flushed.
        assert_eq!(player.position.x % 40.0, 0.0);
        assert_eq!(player.position.y % 40.0, 0.0);
        assert_eq!(player.velocity, Vec2::ZERO);
        assert!(player.inputs.is_empty());

        for x in (cx - 1)..=(cx + 1) {
            for y in (cy - 1)..=(cy + 1) {
                assert!(map.get(x, y).is_owned_by("alice"));
                assert!(map.get(x, y).claimed);
            }
        }
        assert_eq!(map.owned_count("alice"), 9);
        assert!(map.check_invariants());
    }
}
