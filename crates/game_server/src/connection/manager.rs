//! Registry of live connections.

use super::{ClientConnection, ConnectionId, Outbound};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tabletop_types::{PlayerId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Tracks every open connection and which player it belongs to. A player
/// holds at most one connection; a newer one replaces the older.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, ClientConnection>,
    players: DashMap<PlayerId, ConnectionId>,
    next_id: AtomicUsize,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            players: DashMap::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Registers a connection for `player` and returns the receiving end of
    /// its outbound queue. The queue starts with the player's identity, so
    /// nothing routed to the player can overtake it.
    pub fn add_connection(
        &self,
        player: PlayerId,
        remote_addr: Option<SocketAddr>,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Outbound::Message(ServerMessage::Identity { player }));
        self.connections.insert(id, ClientConnection::new(id, player, remote_addr, sender));
        if let Some(previous) = self.players.insert(player, id) {
            if let Some((_, old)) = self.connections.remove(&previous) {
                old.close("replaced by a newer connection");
                debug!("Connection {} for player {} replaced by {}", previous, player, id);
            }
        }
        info!("🔗 Connection {} registered for player {}", id, player);
        (id, receiver)
    }

    /// Forgets `id`. The player mapping is only dropped if it still points
    /// at this connection.
    pub fn remove_connection(&self, id: ConnectionId) -> Option<PlayerId> {
        let connection = self.remove_connection_entry(id)?;
        debug!("Connection {} removed", id);
        Some(connection.player)
    }

    pub fn player_of(&self, id: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&id).map(|connection| connection.player)
    }

    pub fn connection_of(&self, player: PlayerId) -> Option<ConnectionId> {
        self.players.get(&player).map(|entry| *entry)
    }

    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Records inbound traffic on `id`.
    pub fn touch(&self, id: ConnectionId) {
        if let Some(mut connection) = self.connections.get_mut(&id) {
            connection.last_inbound = Instant::now();
        }
    }

    /// Best-effort delivery. Returns `false` when the player has no live
    /// connection.
    pub fn send_to_player(&self, player: PlayerId, message: ServerMessage) -> bool {
        let Some(id) = self.connection_of(player) else {
            return false;
        };
        self.connections.get(&id).is_some_and(|connection| connection.send(message))
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        for connection in self.connections.iter() {
            connection.send(message.clone());
        }
    }

    pub fn close(&self, id: ConnectionId, reason: &str) -> bool {
        match self.remove_connection_entry(id) {
            Some(connection) => connection.close(reason),
            None => false,
        }
    }

    fn remove_connection_entry(&self, id: ConnectionId) -> Option<ClientConnection> {
        let (_, connection) = self.connections.remove(&id)?;
        self.players.remove_if(&connection.player, |_, current| *current == id);
        Some(connection)
    }

    /// Connections whose last inbound frame is older than `timeout` at `now`.
    pub fn idle_connections(&self, now: Instant, timeout: Duration) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|connection| connection.idle_for(now) > timeout)
            .map(|connection| connection.id)
            .collect()
    }

    /// Closes every connection with `reason` and empties the registry.
    pub fn close_all(&self, reason: &str) -> usize {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|c| c.id).collect();
        ids.into_iter().filter(|id| self.close(*id, reason)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_connection_replaces_older() {
        let manager = ConnectionManager::new();
        let player = PlayerId::new();
        let (first, mut first_rx) = manager.add_connection(player, None);
        let (second, _second_rx) = manager.add_connection(player, None);
        first_rx.try_recv().unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.connection_of(player), Some(second));
        assert_eq!(manager.connection_count(), 1);
        assert!(matches!(first_rx.try_recv(), Ok(Outbound::Close { .. })));

        // Removing the stale id must not unmap the live connection.
        assert!(manager.remove_connection(first).is_none());
        assert!(manager.is_connected(player));
    }

    #[test]
    fn test_send_to_player_reaches_queue() {
        let manager = ConnectionManager::new();
        let player = PlayerId::new();
        let (_, mut rx) = manager.add_connection(player, None);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Message(ServerMessage::Identity { player }));
        assert!(manager.send_to_player(player, ServerMessage::RedirectHome));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Message(ServerMessage::RedirectHome));
        assert!(!manager.send_to_player(PlayerId::new(), ServerMessage::RedirectHome));
    }

    #[test]
    fn test_idle_connections_use_last_inbound() {
        let manager = ConnectionManager::new();
        let (quiet, _rx1) = manager.add_connection(PlayerId::new(), None);
        let (_chatty, _rx2) = manager.add_connection(PlayerId::new(), None);
        let later = Instant::now() + Duration::from_secs(120);

        let idle = manager.idle_connections(later, Duration::from_secs(60));
        assert_eq!(idle.len(), 2);
        assert!(idle.contains(&quiet));
        assert!(manager.idle_connections(Instant::now(), Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_close_all_sends_close_frames() {
        let manager = ConnectionManager::new();
        let (_, mut rx) = manager.add_connection(PlayerId::new(), None);
        rx.try_recv().unwrap();
        assert_eq!(manager.close_all("server shutting down"), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Close { reason: "server shutting down".to_string() }
        );
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn test_identity_is_first_even_when_routing_races_registration() {
        let manager = ConnectionManager::new();
        let player = PlayerId::new();
        let (_, mut rx) = manager.add_connection(player, None);
        manager.broadcast(&ServerMessage::RedirectHome);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Message(ServerMessage::Identity { player }));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Message(ServerMessage::RedirectHome));
    }
}
