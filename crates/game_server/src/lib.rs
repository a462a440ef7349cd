//! # Game Server - Real-time Card Table
//!
//! The networked half of Tabletop: websocket connections, the room registry,
//! and the glue that turns inbound actions into per-observer broadcasts.
//! Board and draft rules live in `tabletop_board` and `tabletop_draft`; this
//! crate decides who hears about what.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Connection Manager** - one outbound queue per live websocket, keyed by
//!   connection and by player
//! * **Room Registry** - lobbies, sessions and drafts, plus which room each
//!   player is in
//! * **Rooms** - [`rooms::Lobby`] stages entrants, [`rooms::Session`] runs a
//!   game and publishes its diff events, [`rooms::DraftRoom`] runs a draft
//! * **Collaborators** - card catalog, deck store and booster source traits
//!   with in-memory and JSON-file implementations
//! * **Reaper** - periodic eviction of idle rooms and connections
//!
//! ### Message Flow
//!
//! 1. A client connects with `?player=<uuid>` and receives `identity` first
//! 2. The server resends the player's current room state, or the room listing
//! 3. Each inbound text frame is parsed as a `ClientMessage`; malformed
//!    frames are dropped and the connection stays open
//! 4. The registry locks the target room, applies the action and delivers the
//!    resulting messages before releasing the lock
//!
//! ### Visibility
//!
//! Every subscriber of a session receives the same `board_update`. Printed
//! identities travel separately in `oracle_card_info`, addressed only to the
//! subscribers a reveal names, together with any token definitions the
//! revealed cards can create.
//!
//! ## Configuration
//!
//! See [`ServerConfig`]: bind address, connection limit, idle timeout, reap
//! interval (`-1` disables reaping), seat limit, game defaults and an optional
//! fixed random seed.
//!
//! ## Error Handling
//!
//! [`ServerError`] separates network, protocol, collaborator, draft and
//! internal failures. Stale references and illegal transitions are not
//! errors; they simply produce no messages.
//!
//! ## Thread Safety
//!
//! * Registries are `DashMap`s; no map guard is ever held across an await
//! * Each room sits behind its own `tokio::sync::Mutex`, held for a whole
//!   mutate-and-publish cycle
//! * Room actions run on spawned tasks, so a dropped connection never cancels
//!   a half-applied action

pub use collaborators::{
    BoosterSource, CardCatalog, Collaborators, DeckStore, MemoryBoosters, MemoryCatalog, MemoryDeckStore,
};
pub use config::ServerConfig;
pub use connection::{ConnectionId, ConnectionManager, Outbound};
pub use error::{CollaboratorError, ServerError};
pub use registry::{ReapReport, RoomRegistry};
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config};

pub mod collaborators;
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod reaper;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_core_server_creation() {
        let server = create_server();
        assert_eq!(server.registry().room_count(), 0);
        assert_eq!(server.connections().connection_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_stops_on_shutdown() {
        let config = ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let server = std::sync::Arc::new(create_server_with_config(config, Collaborators::in_memory()));
        let listener = server.bind().unwrap();

        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
