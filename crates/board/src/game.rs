//! A game in progress: seats, spectators and turn order.
//!
//! [`Game::apply`] is the single entry point for in-game client actions. It
//! routes card references to the owning board through the seat field of the
//! card identifier and returns a [`Dispatch`] describing what to publish.

use crate::board::{BoardManager, VirtualCard, ZoneTransition};
use crate::card::BoardCard;
use crate::observers::Observers;
use crate::player::Player;
use std::sync::Arc;
use tabletop_types::view::GameView;
use tabletop_types::{
    AttributeChange, CardAttribute, CardId, CardIdAllocator, ClientMessage, DeckEntry, DiffEvent,
    GameRng, PlayerAttribute, PlayerId, ProtocolError, RoomId, SeatIndex, SpecialAction, Zone,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub starting_life: i32,
    pub opening_hand_size: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self { starting_life: 20, opening_hand_size: 7 }
    }
}

/// One seat's entry into a new game.
#[derive(Debug, Clone)]
pub struct SeatSetup {
    pub player: PlayerId,
    pub main: Vec<DeckEntry>,
    pub side: Vec<DeckEntry>,
}

/// Output of one applied action.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub events: Vec<DiffEvent>,
    /// Human-readable description for the game log. Never names a card.
    pub log: Option<String>,
    /// Virtual identifiers issued to the sender only.
    pub virtual_ids: Option<Vec<VirtualCard>>,
}

impl Dispatch {
    fn events(events: Vec<DiffEvent>) -> Self {
        Self { events, ..Self::default() }
    }

    fn logged(events: Vec<DiffEvent>, log: impl Into<String>) -> Self {
        let log = (!events.is_empty()).then(|| log.into());
        Self { events, log, virtual_ids: None }
    }
}

#[derive(Debug)]
pub struct Game {
    room: RoomId,
    seats: Vec<Player>,
    spectators: Vec<PlayerId>,
    turn: usize,
    ids: Arc<CardIdAllocator>,
    settings: GameSettings,
}

impl Game {
    /// Seats every entrant in order, loads their decks and makes seat 0 the
    /// active player. Each board gets its own forked random stream.
    pub fn new(room: RoomId, setups: Vec<SeatSetup>, settings: GameSettings, rng: &mut GameRng) -> Self {
        let ids = Arc::new(CardIdAllocator::new());
        let seats = setups
            .into_iter()
            .enumerate()
            .map(|(index, setup)| {
                let seat = index as SeatIndex;
                let mut board = BoardManager::new(seat, setup.player, ids.clone(), rng.fork());
                board.load_deck(&setup.main, &setup.side);
                let mut player = Player::new(setup.player, seat, settings.starting_life, board);
                player.active = index == 0;
                player
            })
            .collect();
        Self { room, seats, spectators: Vec::new(), turn: 0, ids, settings }
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    pub fn seats(&self) -> &[Player] {
        &self.seats
    }

    pub fn spectators(&self) -> &[PlayerId] {
        &self.spectators
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn ids(&self) -> &Arc<CardIdAllocator> {
        &self.ids
    }

    pub fn seat_of(&self, player: PlayerId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.id == player)
    }

    pub fn is_subscribed(&self, player: PlayerId) -> bool {
        self.seat_of(player).is_some() || self.spectators.contains(&player)
    }

    pub fn observers(&self) -> Observers {
        Observers::new(self.seats.iter().map(|seat| seat.id).collect(), self.spectators.clone())
    }

    /// The board that owns `card`, found through the identifier's seat field.
    fn board_for(&mut self, card: CardId) -> Option<&mut BoardManager> {
        let seat = card.seat() as usize;
        self.seats.get_mut(seat).map(|player| &mut player.board)
    }

    pub fn card(&self, card: CardId) -> Option<&BoardCard> {
        self.seats.get(card.seat() as usize)?.board.card(card)
    }

    pub fn add_spectator(&mut self, player: PlayerId) -> Vec<DiffEvent> {
        if self.is_subscribed(player) {
            return Vec::new();
        }
        self.spectators.push(player);
        let mut events = vec![DiffEvent::SpectatorJoin { player }];
        let observers = self.observers();
        for seat in &mut self.seats {
            events.extend(seat.board.reveal_public_to(&observers, player));
        }
        events
    }

    pub fn remove_spectator(&mut self, player: PlayerId) -> Vec<DiffEvent> {
        let before = self.spectators.len();
        self.spectators.retain(|p| *p != player);
        if self.spectators.len() == before {
            return Vec::new();
        }
        vec![DiffEvent::SpectatorLeave { player }]
    }

    /// Passes the turn to the next seat. Only the active player may do so.
    pub fn end_turn(&mut self, player: PlayerId) -> Vec<DiffEvent> {
        if self.seat_of(player) != Some(self.turn) || self.seats.is_empty() {
            return Vec::new();
        }
        let previous = self.turn;
        self.turn = (self.turn + 1) % self.seats.len();
        let mut events = self.seats[previous].set_attribute(PlayerAttribute::Active(false));
        events.extend(self.seats[self.turn].set_attribute(PlayerAttribute::Active(true)));
        events
    }

    pub fn view_for(&self, observer: PlayerId) -> GameView {
        GameView {
            room: self.room,
            seats: self.seats.iter().map(|seat| seat.view_for(observer)).collect(),
            spectators: self.spectators.clone(),
            turn: self.turn as SeatIndex,
        }
    }

    fn parse_attributes(changes: &[AttributeChange]) -> Result<Vec<CardAttribute>, ProtocolError> {
        changes.iter().map(AttributeChange::parse).collect()
    }

    /// Moves several cards, placing them consecutively from `index` when it
    /// is non-negative.
    fn move_many(
        &mut self,
        observers: &Observers,
        cards: &[CardId],
        zone: Zone,
        index: i64,
        face_down: bool,
    ) -> Vec<DiffEvent> {
        let mut events = Vec::new();
        let mut placed = 0i64;
        for card in cards {
            let Some(board) = self.board_for(*card) else {
                continue;
            };
            let (transition, moved) = board.change_zone(observers, *card, zone, face_down);
            events.extend(moved);
            if let ZoneTransition::Moved(new_id) = transition {
                if index >= 0 {
                    events.extend(board.move_card_to_index(new_id, index + placed));
                }
                placed += 1;
            }
        }
        events
    }

    /// Applies one in-game action from `sender`. Malformed attribute values
    /// are errors; references to cards that no longer exist are ignored.
    pub fn apply(&mut self, sender: PlayerId, message: &ClientMessage) -> Result<Dispatch, ProtocolError> {
        let Some(seat) = self.seat_of(sender) else {
            debug!(player = %sender, kind = message.kind(), "ignoring action from non-seated subscriber");
            return Ok(Dispatch::default());
        };
        let observers = self.observers();
        let hand_size = self.settings.opening_hand_size;

        let dispatch = match message {
            ClientMessage::DrawCard { count } => {
                let events = self.seats[seat].board.draw_cards(&observers, *count, Zone::Hand, false);
                let drawn = events.iter().filter(|e| matches!(e, DiffEvent::ChangeZone { .. })).count();
                let noun = if drawn == 1 { "card" } else { "cards" };
                Dispatch::logged(events, format!("drew {drawn} {noun}"))
            }
            ClientMessage::SpecialAction { action } => match action {
                SpecialAction::Mulligan => {
                    let board = &mut self.seats[seat].board;
                    let mut events = board.reset(&observers);
                    events.extend(board.draw_cards(&observers, hand_size, Zone::Hand, false));
                    Dispatch::logged(events, "took a mulligan")
                }
                SpecialAction::Scoop => {
                    Dispatch::logged(self.seats[seat].board.reset(&observers), "scooped")
                }
                SpecialAction::Shuffle => {
                    Dispatch::logged(self.seats[seat].board.shuffle_deck(), "shuffled their library")
                }
                SpecialAction::UntapAll => {
                    Dispatch::logged(self.seats[seat].board.untap_all(), "untapped all permanents")
                }
                SpecialAction::EndTurn => Dispatch::logged(self.end_turn(sender), "ended their turn"),
            },
            ClientMessage::ChangeCardAttribute { card, attribute, new_value } => {
                let attribute = CardAttribute::from_parts(*attribute, new_value)?;
                match self.board_for(*card) {
                    Some(board) => Dispatch::events(board.set_attribute(&observers, *card, attribute)),
                    None => Dispatch::default(),
                }
            }
            ClientMessage::ChangePlayerAttribute { attribute, new_value } => {
                let attribute = PlayerAttribute::from_client(*attribute, new_value)?;
                let events = self.seats[seat].set_attribute(attribute);
                let log = match attribute {
                    PlayerAttribute::Life(n) => format!("set life to {n}"),
                    PlayerAttribute::Poison(n) => format!("set poison to {n}"),
                    PlayerAttribute::Active(_) => String::new(),
                };
                Dispatch::logged(events, log)
            }
            ClientMessage::PlayCard { card, x, y, face_down } => {
                let Some(board) = self.board_for(*card) else {
                    return Ok(Dispatch::default());
                };
                let on_battlefield = card.zone() == Some(Zone::Battlefield);
                let mut events = Vec::new();
                let target = if on_battlefield && !face_down {
                    Some(*card)
                } else {
                    let (transition, moved) = board.change_zone(&observers, *card, Zone::Battlefield, *face_down);
                    events.extend(moved);
                    transition.moved()
                };
                if let Some(target) = target {
                    events.extend(board.move_card(target, *x, *y));
                }
                let log = if *face_down { "played a card face down" } else { "played a card" };
                if on_battlefield && !face_down {
                    Dispatch::events(events)
                } else {
                    Dispatch::logged(events, log)
                }
            }
            ClientMessage::ChangePosition { card, x, y } => match self.board_for(*card) {
                Some(board) => Dispatch::events(board.move_card(*card, *x, *y)),
                None => Dispatch::default(),
            },
            ClientMessage::ChangeZone { card, zone, index, face_down } => {
                let events = self.move_many(&observers, &[*card], *zone, *index, *face_down);
                Dispatch::logged(events, format!("moved a card to {}", zone_name(*zone)))
            }
            ClientMessage::ChangeIndex { card, index } => match self.board_for(*card) {
                Some(board) => Dispatch::events(board.move_card_to_index(*card, *index)),
                None => Dispatch::default(),
            },
            ClientMessage::ChangeZones { cards, zone, index, face_down } => {
                let events = self.move_many(&observers, cards, *zone, *index, *face_down);
                Dispatch::logged(events, format!("moved {} cards to {}", cards.len(), zone_name(*zone)))
            }
            ClientMessage::MoveCardVirtual { ids, zone, index } => {
                let cards = self.seats[seat].board.take_virtual(ids);
                let events = self.move_many(&observers, &cards, *zone, *index, false);
                Dispatch::logged(events, format!("moved {} cards to {}", cards.len(), zone_name(*zone)))
            }
            ClientMessage::RequestVirtualIds { zone } => Dispatch {
                virtual_ids: Some(self.seats[seat].board.get_virtual_ids(*zone)),
                ..Dispatch::default()
            },
            ClientMessage::RevealCard { card, reveal_to, reveal } => {
                if matches!(reveal_to, Some(player) if !observers.contains(*player)) {
                    return Ok(Dispatch::default());
                }
                let Some(board) = self.board_for(*card) else {
                    return Ok(Dispatch::default());
                };
                if *reveal {
                    Dispatch::logged(board.reveal_to(&observers, *card, *reveal_to), "revealed a card")
                } else {
                    Dispatch::events(board.unreveal_to(*card, *reveal_to))
                }
            }
            ClientMessage::Scry { count } => {
                let events = self.seats[seat].board.scry(&observers, *count);
                Dispatch::logged(events, format!("looked at the top {count} cards of their library"))
            }
            ClientMessage::CreateToken { id } | ClientMessage::CreateCard { id } => {
                let (_, events) = self.seats[seat].board.create_card(&observers, id.clone(), &[]);
                Dispatch::logged(events, "created a token")
            }
            ClientMessage::CreateClone { id, attributes } => {
                let attributes = Self::parse_attributes(attributes)?;
                let (_, events) = self.seats[seat].board.create_card(&observers, id.clone(), &attributes);
                Dispatch::logged(events, "created a copy")
            }
            ClientMessage::CloneCard { id, attributes } => {
                let attributes = Self::parse_attributes(attributes)?;
                let Some(template) = self.card(*id).cloned() else {
                    return Ok(Dispatch::default());
                };
                let (_, events) = self.seats[seat].board.clone_from(&observers, &template, &attributes);
                Dispatch::logged(events, "cloned a card")
            }
            ClientMessage::Sideboard { main, side } => {
                Dispatch::logged(self.seats[seat].board.sideboard(&observers, main, side), "sideboarded")
            }
            other => {
                debug!(kind = other.kind(), "message not handled by a game");
                Dispatch::default()
            }
        };
        Ok(dispatch)
    }
}

fn zone_name(zone: Zone) -> &'static str {
    match zone {
        Zone::Library => "the library",
        Zone::Hand => "hand",
        Zone::Battlefield => "the battlefield",
        Zone::Graveyard => "the graveyard",
        Zone::Exile => "exile",
        Zone::FaceDown => "the face-down pile",
        Zone::Sideboard => "the sideboard",
    }
}
