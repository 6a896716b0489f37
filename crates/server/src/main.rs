//! Pepo game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod map;
mod movement;
mod server;
mod session;
mod territory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Pepo Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!(
        "  Map: {}x{} cells of {}px",
        config.game.map_size, config.game.map_size, config.game.cell_size
    );
    info!("  Tick rate: {}/s", config.game.ticks_per_second);

    // Start the game server
    server::run(config).await?;

    Ok(())
}
