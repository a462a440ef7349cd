//! Configuration management for the tabletop server.
//!
//! Settings are read from a TOML file, which is created with defaults on
//! first start, and converted into the game server's [`ServerConfig`].

use anyhow::Context;
use game_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub rooms: RoomSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network binding, connection limits and idle eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds of inactivity before a room or connection is reaped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Seconds between reaper sweeps (-1 to disable)
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: i64,
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout() -> u64 {
    3600
}

fn default_reap_interval() -> i64 {
    60
}

/// Table rules applied to every room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    pub max_seats: u8,
    pub starting_life: i32,
    pub opening_hand_size: u32,
    /// Fixed seed for reproducible shuffles and packs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for RoomSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            max_seats: defaults.max_seats,
            starting_life: defaults.starting_life,
            opening_hand_size: defaults.opening_hand_size,
            rng_seed: None,
        }
    }
}

/// Where card definitions, booster sets and saved decks live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub directory: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { directory: "data".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                max_connections: default_max_connections(),
                idle_timeout_secs: default_idle_timeout(),
                reap_interval_secs: default_reap_interval(),
            },
            rooms: RoomSettings::default(),
            data: DataSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and
    /// returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn to_server_config(&self) -> anyhow::Result<ServerConfig> {
        Ok(ServerConfig {
            bind_address: self
                .server
                .bind_address
                .parse()
                .with_context(|| format!("invalid bind address {}", self.server.bind_address))?,
            max_connections: self.server.max_connections,
            idle_timeout_secs: self.server.idle_timeout_secs,
            reap_interval_secs: self.server.reap_interval_secs,
            max_seats: self.rooms.max_seats,
            starting_life: self.rooms.starting_life,
            opening_hand_size: self.rooms.opening_hand_size,
            rng_seed: self.rooms.rng_seed,
        })
    }

    /// Checks the file-level settings, then the server settings they produce.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if self.data.directory.is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        self.to_server_config().map_err(|e| e.to_string())?.validate()
    }
}
