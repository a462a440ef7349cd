//! Connection management for client connections.
//!
//! Each websocket is owned by a reader loop and a writer task. Everything
//! else in the server talks to a connection through the [`Outbound`]
//! channel held by the [`ConnectionManager`].

pub mod client;
pub mod manager;

pub use client::ClientConnection;
pub use manager::ConnectionManager;

use tabletop_types::ServerMessage;

/// Type alias for connection identifiers.
///
/// Connection IDs are unique for the lifetime of the process; a player who
/// reconnects gets a new one.
pub type ConnectionId = usize;

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    /// Send a normal-closure frame with `reason` and stop writing.
    Close { reason: String },
}
