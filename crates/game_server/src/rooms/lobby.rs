//! Staging area before a game or draft starts.

use super::Liveness;
use tabletop_types::view::{EntrantView, LobbyView, RoomStage, RoomSummary};
use tabletop_types::{DeckId, LobbySettings, PlayerId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    pub player: PlayerId,
    pub deck: Option<DeckId>,
}

/// What [`Lobby::leave`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The player was not an entrant.
    Absent,
    Left,
    /// The owner or the last entrant left; the lobby should close.
    Disbanded,
}

/// A room that has been created but not started.
///
/// Readiness is recomputed from the current entrants on every query: a game
/// lobby is ready when every seat is taken and every entrant has chosen a
/// deck, a draft lobby when humans plus bots fill the declared seats.
#[derive(Debug)]
pub struct Lobby {
    id: RoomId,
    name: String,
    owner: PlayerId,
    settings: LobbySettings,
    entrants: Vec<Entrant>,
    pub liveness: Liveness,
}

impl Lobby {
    /// The creator joins as the first entrant.
    pub fn new(id: RoomId, name: String, owner: PlayerId, settings: LobbySettings) -> Self {
        Self {
            id,
            name,
            owner,
            settings,
            entrants: vec![Entrant { player: owner, deck: None }],
            liveness: Liveness::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    pub fn members(&self) -> Vec<PlayerId> {
        self.entrants.iter().map(|e| e.player).collect()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.entrants.iter().any(|e| e.player == player)
    }

    /// Human places. Draft bots take the rest of the seats.
    pub fn capacity(&self) -> usize {
        match &self.settings {
            LobbySettings::Game { seats } => *seats as usize,
            LobbySettings::Draft { seats, bots, .. } => seats.saturating_sub(*bots) as usize,
        }
    }

    pub fn is_full(&self) -> bool {
        self.entrants.len() >= self.capacity()
    }

    pub fn join(&mut self, player: PlayerId) -> bool {
        if self.contains(player) || self.is_full() {
            return false;
        }
        self.entrants.push(Entrant { player, deck: None });
        self.liveness.touch();
        true
    }

    /// Removes `player`. The lobby does not outlive its owner.
    pub fn leave(&mut self, player: PlayerId) -> Departure {
        let before = self.entrants.len();
        self.entrants.retain(|e| e.player != player);
        if self.entrants.len() == before {
            return Departure::Absent;
        }
        self.liveness.touch();
        if self.owner == player || self.entrants.is_empty() {
            Departure::Disbanded
        } else {
            Departure::Left
        }
    }

    /// Only meaningful for game lobbies; drafts build their decks.
    pub fn choose_deck(&mut self, player: PlayerId, deck: DeckId) -> bool {
        if !matches!(self.settings, LobbySettings::Game { .. }) {
            return false;
        }
        let Some(entrant) = self.entrants.iter_mut().find(|e| e.player == player) else {
            return false;
        };
        entrant.deck = Some(deck);
        self.liveness.touch();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        match &self.settings {
            LobbySettings::Game { seats } => {
                *seats > 0
                    && self.entrants.len() == *seats as usize
                    && self.entrants.iter().all(|e| e.deck.is_some())
            }
            LobbySettings::Draft { seats, bots, .. } => {
                *seats > 0 && self.entrants.len() + *bots as usize == *seats as usize
            }
        }
    }

    pub fn view(&self) -> LobbyView {
        LobbyView {
            room: self.id,
            name: self.name.clone(),
            owner: self.owner,
            settings: self.settings.clone(),
            entrants: self
                .entrants
                .iter()
                .map(|e| EntrantView { player: e.player, deck: e.deck })
                .collect(),
            ready: self.is_ready(),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room: self.id,
            name: self.name.clone(),
            settings: self.settings.clone(),
            stage: RoomStage::Lobby,
            occupied: self.entrants.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_lobby(seats: u8) -> (Lobby, PlayerId) {
        let owner = PlayerId::new();
        let lobby = Lobby::new(RoomId::new(), "table".to_string(), owner, LobbySettings::Game { seats });
        (lobby, owner)
    }

    #[test]
    fn test_game_lobby_ready_when_all_decks_chosen() {
        let (mut lobby, owner) = game_lobby(2);
        let guest = PlayerId::new();
        assert!(!lobby.is_ready());
        assert!(lobby.join(guest));
        assert!(lobby.choose_deck(owner, DeckId::new()));
        assert!(!lobby.is_ready());
        assert!(lobby.choose_deck(guest, DeckId::new()));
        assert!(lobby.is_ready());
        assert!(lobby.view().ready);
    }

    #[test]
    fn test_join_rejected_when_full_or_duplicate() {
        let (mut lobby, owner) = game_lobby(2);
        assert!(!lobby.join(owner));
        assert!(lobby.join(PlayerId::new()));
        assert!(!lobby.join(PlayerId::new()));
        assert_eq!(lobby.entrants().len(), 2);
    }

    #[test]
    fn test_draft_lobby_counts_bots() {
        let owner = PlayerId::new();
        let settings = LobbySettings::Draft { seats: 4, sets: vec!["tst".to_string()], bots: 3 };
        let mut lobby = Lobby::new(RoomId::new(), "draft".to_string(), owner, settings);
        assert_eq!(lobby.capacity(), 1);
        assert!(lobby.is_ready());
        assert!(!lobby.join(PlayerId::new()));
        assert!(!lobby.choose_deck(owner, DeckId::new()));
    }

    #[test]
    fn test_guest_leaving_keeps_lobby_open() {
        let (mut lobby, owner) = game_lobby(3);
        let guest = PlayerId::new();
        lobby.join(guest);
        assert_eq!(lobby.leave(guest), Departure::Left);
        assert_eq!(lobby.leave(guest), Departure::Absent);
        assert_eq!(lobby.owner(), owner);
        assert_eq!(lobby.members(), vec![owner]);
    }

    #[test]
    fn test_owner_leaving_disbands_lobby() {
        let (mut lobby, owner) = game_lobby(3);
        let guest = PlayerId::new();
        lobby.join(guest);
        assert_eq!(lobby.leave(owner), Departure::Disbanded);
        assert_eq!(lobby.members(), vec![guest]);
    }
}
