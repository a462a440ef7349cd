//! Server configuration types and defaults.

use std::net::SocketAddr;
use std::time::Duration;
use tabletop_board::GameSettings;
use tabletop_types::MAX_SEATS;

/// Configuration structure for the game server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Seconds without inbound traffic (connections) or state changes (rooms)
    /// before the reaper evicts them
    pub idle_timeout_secs: u64,

    /// Seconds between reaper sweeps; `-1` disables reaping
    pub reap_interval_secs: i64,

    /// Upper bound on the seats a lobby may declare
    pub max_seats: u8,

    pub starting_life: i32,
    pub opening_hand_size: u32,

    /// Fixed seed for room randomness. Rooms draw from entropy when unset.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            idle_timeout_secs: 3600,
            reap_interval_secs: 60,
            max_seats: 8,
            starting_life: 20,
            opening_hand_size: 7,
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// `None` when reaping is disabled.
    pub fn reap_interval(&self) -> Option<Duration> {
        (self.reap_interval_secs > 0).then(|| Duration::from_secs(self.reap_interval_secs as u64))
    }

    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            starting_life: self.starting_life,
            opening_hand_size: self.opening_hand_size,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than 0".to_string());
        }
        if self.reap_interval_secs == 0 || self.reap_interval_secs < -1 {
            return Err(format!(
                "reap_interval_secs must be positive or -1 to disable, got {}",
                self.reap_interval_secs
            ));
        }
        if self.max_seats == 0 || self.max_seats as usize > MAX_SEATS {
            return Err(format!("max_seats must be between 1 and {MAX_SEATS}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reap_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.game_settings(), GameSettings::default());
    }

    #[test]
    fn test_negative_interval_disables_reaping() {
        let config = ServerConfig { reap_interval_secs: -1, ..ServerConfig::default() };
        assert!(config.validate().is_ok());
        assert_eq!(config.reap_interval(), None);

        let config = ServerConfig { reap_interval_secs: -5, ..ServerConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seat_limit_respects_identifier_width() {
        let config = ServerConfig { max_seats: 17, ..ServerConfig::default() };
        assert!(config.validate().is_err());
        let config = ServerConfig { max_seats: 16, ..ServerConfig::default() };
        assert!(config.validate().is_ok());
    }
}
