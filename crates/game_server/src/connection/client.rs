//! Client connection representation.

use super::{ConnectionId, Outbound};
use std::net::SocketAddr;
use std::time::{Instant, SystemTime};
use tabletop_types::{PlayerId, ServerMessage};
use tokio::sync::mpsc;

/// One live connection and the queue feeding its writer.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,

    /// The authenticated user on the other end
    pub player: PlayerId,

    /// `None` for in-process connections
    pub remote_addr: Option<SocketAddr>,

    pub connected_at: SystemTime,

    /// Last time a frame arrived from the client
    pub last_inbound: Instant,

    sender: mpsc::UnboundedSender<Outbound>,
}

impl ClientConnection {
    pub fn new(
        id: ConnectionId,
        player: PlayerId,
        remote_addr: Option<SocketAddr>,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            id,
            player,
            remote_addr,
            connected_at: SystemTime::now(),
            last_inbound: Instant::now(),
            sender,
        }
    }

    /// Queues `message`. Returns `false` once the writer has gone away.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.sender.send(Outbound::Message(message)).is_ok()
    }

    pub fn close(&self, reason: impl Into<String>) -> bool {
        self.sender.send(Outbound::Close { reason: reason.into() }).is_ok()
    }

    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_inbound)
    }
}
