//! Convenience constructors.

use crate::collaborators::Collaborators;
use crate::config::ServerConfig;
use crate::server::GameServer;

/// A server with default configuration and empty in-memory collaborators.
pub fn create_server() -> GameServer {
    create_server_with_config(ServerConfig::default(), Collaborators::in_memory())
}

pub fn create_server_with_config(config: ServerConfig, collaborators: Collaborators) -> GameServer {
    GameServer::new(config, collaborators)
}
