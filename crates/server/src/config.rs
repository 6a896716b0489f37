//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulation cannot run on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.game.map_size < 20 {
            anyhow::bail!(
                "map_size must be at least 20 cells (got {})",
                self.game.map_size
            );
        }
        if self.game.ticks_per_second == 0 {
            anyhow::bail!("ticks_per_second must be non-zero");
        }
        if self.game.cell_size <= 0.0 || self.game.player_speed <= 0.0 {
            anyhow::bail!("cell_size and player_speed must be positive");
        }
        // Players only turn on exact grid alignment; a speed that does not
        // divide the cell size makes alignment unreachable.
        if self.game.cell_size % self.game.player_speed != 0.0 {
            anyhow::bail!(
                "cell_size ({}) must be a multiple of player_speed ({})",
                self.game.cell_size,
                self.game.player_speed
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            game: GameConfig::default(),
        }
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Seconds a connection may stay unauthenticated.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            auth_timeout_secs: default_auth_timeout(),
        }
    }
}

fn default_port() -> u16 {
    8958
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    10
}
fn default_auth_timeout() -> u64 {
    5
}

/// Simulation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    /// Map side length in cells.
    #[serde(default = "default_map_size")]
    pub map_size: usize,
    /// Cell side length in pixels.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Fixed simulation rate.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    /// Player speed in pixels per tick.
    #[serde(default = "default_player_speed")]
    pub player_speed: f32,
}

impl GameConfig {
    /// Duration of one simulation step.
    pub fn tick_delta(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second as f64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_size: default_map_size(),
            cell_size: default_cell_size(),
            ticks_per_second: default_ticks_per_second(),
            player_speed: default_player_speed(),
        }
    }
}

fn default_map_size() -> usize {
    50
}
fn default_cell_size() -> f32 {
    40.0
}
fn default_ticks_per_second() -> u32 {
    40
}
fn default_player_speed() -> f32 {
    5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.tick_delta(), Duration::from_millis(25));
    }

    #[test]
    fn test_rejects_misaligned_speed() {
        let mut config = Config::default();
        config.game.player_speed = 7.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_map() {
        let mut config = Config::default();
        config.game.map_size = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [game]
            map_size = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.game.map_size, 64);
        assert_eq!(config.game.cell_size, 40.0);
    }
}
