//! Game state and the fixed-timestep loop.

use crate::config::Config;
use crate::map::GridMap;
use crate::movement;
use crate::session::{Player, Registry, respawn_player};
use crate::territory;
use protocol::{
    GameJoinPayload, Me, PlayerPhysics, PlayerSnapshot, ServerPacket, UpdateStatePayload,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{info, warn};

use super::OutboundFrame;

/// Registration failures surfaced to the gateway.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
}

/// Main game state: the grid, the session registry and the broadcast
/// fan-out. One tick step owns all of it exclusively.
pub struct GameState {
    pub config: Config,
    pub map: GridMap,
    pub registry: Registry,
    pub tick_count: u64,
    broadcast_tx: broadcast::Sender<OutboundFrame>,
}

impl GameState {
    pub fn new(config: &Config, broadcast_tx: broadcast::Sender<OutboundFrame>) -> Self {
        Self {
            config: config.clone(),
            map: GridMap::new(config.game.map_size),
            registry: Registry::new(),
            tick_count: 0,
            broadcast_tx,
        }
    }

    /// Register a freshly authenticated player.
    ///
    /// Returns the `GameJoin` snapshot to send back on the new session.
    pub fn register(&mut self, username: &str) -> Result<ServerPacket, RegisterError> {
        if self.registry.contains(username) {
            return Err(RegisterError::DuplicateUsername(username.to_owned()));
        }

        let mut player = Player::new(username, self.config.game.player_speed);
        respawn_player(&mut player, &mut self.map, self.config.game.cell_size);

        // Announce to everyone else; the joining session first hears about
        // itself through `GameJoin`.
        self.broadcast_excluding(&ServerPacket::PlayerJoin(snapshot_of(&player)), Some(username));
        self.registry.insert(player);
        info!("{} joined ({} players online)", username, self.registry.len());

        Ok(ServerPacket::GameJoin(GameJoinPayload {
            me: Me { username: username.to_owned() },
            players: self.registry.iter().map(snapshot_of).collect(),
            map: self.map.to_wire(),
        }))
    }

    /// Replace a player's pressed-key set.
    pub fn set_inputs(&mut self, username: &str, keys: Vec<String>) {
        if let Some(player) = self.registry.get_mut(username) {
            player.inputs = keys.into_iter().collect();
        }
    }

    /// Remove a session: release its land and tell everyone.
    pub fn remove_player(&mut self, username: &str) {
        if self.registry.remove(username).is_some() {
            self.map.release(username);
            self.broadcast(&ServerPacket::PlayerLeave(username.to_owned()));
            info!("{} left ({} players online)", username, self.registry.len());
        }
    }

    /// One simulation step: movement then territory resolution for every
    /// player, in join order.
    pub fn step(&mut self) {
        self.tick_count += 1;
        let order: Vec<String> = self.registry.join_order().to_vec();
        let map_size = self.config.game.map_size;
        let cell_size = self.config.game.cell_size;

        for username in order {
            let Some(player) = self.registry.get_mut(&username) else {
                continue;
            };
            movement::advance(player, map_size, cell_size);
            if !movement::is_aligned(player, cell_size) {
                continue;
            }
            movement::steer(player);
            if let Err(e) = territory::resolve(&mut self.map, &mut self.registry, &username, cell_size)
            {
                warn!("territory resolution aborted for {}: {}", username, e);
            }
        }
    }

    /// Serialize the world once and fan it out to every session.
    pub fn broadcast_update(&self) {
        let payload = UpdateStatePayload {
            map: self.map.to_wire(),
            players_states: self
                .registry
                .iter()
                .map(|p| PlayerPhysics {
                    username: p.username.clone(),
                    x: p.position.x,
                    y: p.position.y,
                    vel_x: p.velocity.x,
                    vel_y: p.velocity.y,
                })
                .collect(),
        };
        self.broadcast(&ServerPacket::UpdateState(payload));
    }

    fn broadcast(&self, packet: &ServerPacket) {
        self.broadcast_excluding(packet, None);
    }

    fn broadcast_excluding(&self, packet: &ServerPacket, exclude: Option<&str>) {
        match packet.encode() {
            // Fire-and-forget: a send error just means nobody is listening.
            Ok(text) => {
                let _ = self.broadcast_tx.send(OutboundFrame {
                    exclude: exclude.map(str::to_owned),
                    frame: text.into(),
                });
            }
            Err(e) => warn!("failed to encode broadcast packet: {}", e),
        }
    }
}

fn snapshot_of(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        username: player.username.clone(),
        color: player.color.clone(),
        x: player.position.x,
        y: player.position.y,
        vel_x: player.velocity.x,
        vel_y: player.velocity.y,
    }
}

/// Fixed-timestep accumulator.
///
/// Credits real elapsed time and hands back the number of whole tick steps
/// owed, keeping the simulation rate decoupled from scheduling jitter:
/// however the elapsed time is chunked across invocations, N ticks worth of
/// time yields exactly N steps.
#[derive(Debug)]
pub struct TickAccumulator {
    delta: Duration,
    accumulated: Duration,
}

impl TickAccumulator {
    pub fn new(delta: Duration) -> Self {
        Self {
            delta,
            accumulated: Duration::ZERO,
        }
    }

    /// Credit `elapsed` wall-clock time and drain it in whole steps.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;
        let mut steps = 0;
        while self.accumulated >= self.delta {
            self.accumulated -= self.delta;
            steps += 1;
        }
        steps
    }
}

/// Run the main game loop.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_delta: Duration) {
    let mut ticker = interval(tick_delta);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut accumulator = TickAccumulator::new(tick_delta);
    let mut last = Instant::now();

    info!("Game loop started ({:?} per tick)", tick_delta);

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let steps = accumulator.advance(now.duration_since(last));
        last = now;
        if steps == 0 {
            continue;
        }

        let mut game = state.write().await;
        if game.registry.is_empty() {
            // Idle server: nothing to simulate or broadcast.
            continue;
        }

        let batch_start = std::time::Instant::now();
        for _ in 0..steps {
            game.step();
        }
        game.broadcast_update();

        let batch_ms = batch_start.elapsed().as_secs_f64() * 1000.0;
        let budget_ms = tick_delta.as_secs_f64() * 1000.0 * steps as f64;
        if batch_ms > budget_ms * 0.9 {
            warn!(
                "Slow tick batch #{}: {:.2}ms for {} steps (budget {:.1}ms), {} players",
                game.tick_count,
                batch_ms,
                steps,
                budget_ms,
                game.registry.len()
            );
        }
    }
}
