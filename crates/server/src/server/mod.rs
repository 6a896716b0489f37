//! WebSocket gateway: authentication, session lifecycle and fan-out.
//!
//! Each connection walks Connecting -> Authenticating -> Active -> Closed.
//! Socket callbacks only ever touch a player's input set or perform registry
//! insert/remove; all other mutation happens inside the tick step.

use crate::config::Config;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::{
    ClientPacket, CloseReason, DisconnectPayload, ServerPacket, USERNAME_MAX_CHARS,
    USERNAME_MIN_CHARS,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{error, info, warn};

pub mod game;

pub use game::{GameState, RegisterError, TickAccumulator, run_game_loop};

/// A pre-serialized frame fanned out to every session.
///
/// `exclude` skips one username, so a joining player does not hear its own
/// `PlayerJoin` (it learns about itself through `GameJoin` instead).
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub exclude: Option<String>,
    pub frame: Utf8Bytes,
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));

    // One channel fans pre-serialized frames out to every connection.
    let (broadcast_tx, _broadcast_rx) = broadcast::channel::<OutboundFrame>(64);
    let game_state = Arc::new(RwLock::new(GameState::new(&config, broadcast_tx.clone())));

    let game_loop_state = Arc::clone(&game_state);
    let tick_delta = config.game.tick_delta();
    tokio::spawn(async move {
        game::run_game_loop(game_loop_state, tick_delta).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;
    let auth_timeout = Duration::from_secs(config.server.auth_timeout_secs);

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let game_state = Arc::clone(&game_state);
        let conn_state = Arc::clone(&conn_state);
        let broadcast_rx = broadcast_tx.subscribe();

        tokio::spawn(async move {
            let result =
                handle_connection(stream, addr, game_state, broadcast_rx, auth_timeout).await;

            // Always remove from connection tracking when done
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection from handshake to cleanup.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    mut broadcast_rx: broadcast::Receiver<OutboundFrame>,
    auth_timeout: Duration,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let username = match authenticate(&mut read, auth_timeout).await {
        Ok(name) => name,
        Err(reason) => {
            warn!("Authentication failed for {} ({})", addr, reason.message());
            return close_with(&mut write, reason).await;
        }
    };

    let join = {
        let mut game = game_state.write().await;
        game.register(&username)
    };
    let join = match join {
        Ok(packet) => packet,
        Err(RegisterError::DuplicateUsername(_)) => {
            warn!("Rejected duplicate login '{}' from {}", username, addr);
            let disconnect = ServerPacket::Disconnect(DisconnectPayload {
                reason: "Username is already taken.".to_owned(),
            });
            write.send(Message::Text(disconnect.encode()?.into())).await?;
            return close_with(&mut write, CloseReason::DuplicateUsername).await;
        }
    };
    write.send(Message::Text(join.encode()?.into())).await?;

    let result = active_loop(&mut write, &mut read, &game_state, &username, &mut broadcast_rx).await;

    // Cleanup runs on every exit path once the player is registered.
    {
        let mut game = game_state.write().await;
        game.remove_player(&username);
    }

    result
}

/// Pump client packets and broadcast frames until either side closes.
async fn active_loop(
    write: &mut WsSink,
    read: &mut WsStream,
    game_state: &Arc<RwLock<GameState>>,
    username: &str,
    broadcast_rx: &mut broadcast::Receiver<OutboundFrame>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ClientPacket::decode(text.as_str()) {
                            Ok(ClientPacket::Ping(_)) => {
                                let pong = ServerPacket::Pong(now_millis());
                                write.send(Message::Text(pong.encode()?.into())).await?;
                            }
                            Ok(ClientPacket::Input(keys)) => {
                                let mut game = game_state.write().await;
                                game.set_inputs(username, keys);
                            }
                            Ok(ClientPacket::Login(_)) => {
                                warn!("{} sent Login while active", username);
                                return close_with(write, CloseReason::ProtocolViolation).await;
                            }
                            Err(e) => {
                                warn!("Bad packet from {}: {}", username, e);
                                return close_with(write, CloseReason::ProtocolViolation).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("{} disconnected", username);
                        return Ok(());
                    }
                    // Binary, ping and pong frames carry nothing here.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", username, e);
                        return Ok(());
                    }
                }
            }
            packet = broadcast_rx.recv() => {
                match packet {
                    Ok(outbound) => {
                        if outbound.exclude.as_deref() == Some(username) {
                            continue;
                        }
                        if write.send(Message::Text(outbound.frame)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("{} lagged behind, skipped {} broadcast frames", username, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

/// Wait for the login frame. Anything but one well-formed `Login` within
/// the window rejects the connection.
async fn authenticate(read: &mut WsStream, window: Duration) -> Result<String, CloseReason> {
    let msg = match timeout(window, read.next()).await {
        Ok(msg) => msg,
        Err(_) => return Err(CloseReason::AuthTimeout),
    };
    match msg {
        Some(Ok(Message::Text(text))) => parse_login(text.as_str()),
        _ => Err(CloseReason::BadLogin),
    }
}

/// Validate the first frame of a connection.
fn parse_login(text: &str) -> Result<String, CloseReason> {
    match ClientPacket::decode(text) {
        Ok(ClientPacket::Login(name))
            if (USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&name.chars().count()) =>
        {
            Ok(name)
        }
        _ => Err(CloseReason::BadLogin),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Send a closing frame carrying the rejection code. The peer may already
/// be gone, so send errors are ignored.
async fn close_with(write: &mut WsSink, reason: CloseReason) -> anyhow::Result<()> {
    let _ = write
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(reason.code()),
            reason: Utf8Bytes::from_static(reason.message()),
        })))
        .await;
    Ok(())
}
