//! Room state machines: staging lobbies, running game sessions and drafts.
//!
//! Rooms never touch connections directly. Every operation returns an
//! [`Outbox`] of addressed messages which the registry delivers while it
//! still holds the room's lock, so deliveries for one room keep the order
//! in which its actions were applied.

pub mod draft_room;
pub mod lobby;
pub mod session;

pub use draft_room::DraftRoom;
pub use lobby::{Departure, Entrant, Lobby};
pub use session::Session;

use std::time::{Duration, Instant};
use tabletop_types::{PlayerId, ServerMessage};

/// A message addressed to one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: PlayerId,
    pub message: ServerMessage,
}

/// Messages produced by one room operation, in delivery order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, to: PlayerId, message: ServerMessage) {
        self.envelopes.push(Envelope { to, message });
    }

    /// Queues a copy of `message` for every player in `to`.
    pub fn send_all<'a>(&mut self, to: impl IntoIterator<Item = &'a PlayerId>, message: ServerMessage) {
        for player in to {
            self.send(*player, message.clone());
        }
    }

    pub fn extend(&mut self, other: Outbox) {
        self.envelopes.extend(other.envelopes);
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    /// Messages addressed to `player`.
    pub fn for_player(&self, player: PlayerId) -> impl Iterator<Item = &ServerMessage> + '_ {
        self.envelopes.iter().filter(move |e| e.to == player).map(|e| &e.message)
    }
}

impl IntoIterator for Outbox {
    type Item = Envelope;
    type IntoIter = std::vec::IntoIter<Envelope>;

    fn into_iter(self) -> Self::IntoIter {
        self.envelopes.into_iter()
    }
}

/// Last-activity bookkeeping and the closed flag shared by every room kind.
///
/// A room is closed once it has been started, torn down or reaped. Whoever
/// acquires a room's lock after that must treat it as gone.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    last_active: Instant,
    closed: bool,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self { last_active: Instant::now(), closed: false }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}
