//! The set of identities subscribed to a room.

use tabletop_types::PlayerId;

/// Seat holders and spectators of a room, passed into board operations so
/// that "reveal to everyone" resolves against the current subscriber list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observers {
    pub players: Vec<PlayerId>,
    pub spectators: Vec<PlayerId>,
}

impl Observers {
    pub fn new(players: Vec<PlayerId>, spectators: Vec<PlayerId>) -> Self {
        Self { players, spectators }
    }

    /// Every subscriber, seats first.
    pub fn all(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().chain(self.spectators.iter()).copied()
    }

    pub fn is_spectator(&self, player: PlayerId) -> bool {
        self.spectators.contains(&player)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player) || self.is_spectator(player)
    }
}
