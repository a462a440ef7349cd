//! One seat's zones and the operations that move cards between them.
//!
//! Every mutating operation returns the ordered list of [`DiffEvent`]s it
//! produced; a rejected or no-op request returns an empty list and leaves the
//! board untouched. Visibility is tracked per card: an observer can only ever
//! learn a printing through a `reveal_card` event naming them.

use crate::card::{BoardCard, Origin};
use crate::observers::Observers;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tabletop_types::view::CardView;
use tabletop_types::{
    CardAttribute, CardId, CardIdAllocator, DeckEntry, DiffEvent, GameRng, Pivot, PlayerId,
    PrintingId, SeatIndex, Zone,
};
use tracing::debug;

/// Offset applied to a clone's position relative to its template.
pub const CLONE_OFFSET: f64 = 20.0;

/// Result of asking a card to change zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTransition {
    /// The card now lives under the new identifier.
    Moved(CardId),
    /// A token left the battlefield and ceased to exist.
    Destroyed,
    /// Nothing happened.
    Rejected,
}

impl ZoneTransition {
    pub fn moved(self) -> Option<CardId> {
        match self {
            ZoneTransition::Moved(id) => Some(id),
            _ => None,
        }
    }
}

/// A card handed out under an opaque virtual identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualCard {
    pub id: u32,
    pub zone: Zone,
    pub card: CardId,
    pub printing: PrintingId,
}

#[derive(Debug)]
pub struct BoardManager {
    seat: SeatIndex,
    owner: PlayerId,
    ids: Arc<CardIdAllocator>,
    zones: [Vec<BoardCard>; Zone::COUNT],
    rng: GameRng,
    virtual_ids: HashMap<u32, CardId>,
}

impl BoardManager {
    pub fn new(seat: SeatIndex, owner: PlayerId, ids: Arc<CardIdAllocator>, rng: GameRng) -> Self {
        Self {
            seat,
            owner,
            ids,
            zones: std::array::from_fn(|_| Vec::new()),
            rng,
            virtual_ids: HashMap::new(),
        }
    }

    /// Fills the library and sideboard from a deck list. The library is
    /// shuffled before identifiers are issued so that sequence numbers carry
    /// no information about the list order. Sideboard cards are visible to
    /// the owner from the start.
    pub fn load_deck(&mut self, main: &[DeckEntry], side: &[DeckEntry]) {
        let mut library: Vec<PrintingId> = main
            .iter()
            .flat_map(|entry| std::iter::repeat(entry.printing.clone()).take(entry.count as usize))
            .collect();
        self.rng.shuffle(&mut library);

        for printing in library {
            let Some(id) = self.ids.encode(Zone::Library, self.seat) else {
                break;
            };
            self.zones[Zone::Library.index()].push(BoardCard::new(id, printing, Origin::Deck));
        }

        for entry in side {
            for _ in 0..entry.count {
                let Some(id) = self.ids.encode(Zone::Sideboard, self.seat) else {
                    return;
                };
                let mut card = BoardCard::new(id, entry.printing.clone(), Origin::Sideboard);
                card.grant([self.owner]);
                self.zones[Zone::Sideboard.index()].push(card);
            }
        }
    }

    pub fn seat(&self) -> SeatIndex {
        self.seat
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn zone(&self, zone: Zone) -> &[BoardCard] {
        &self.zones[zone.index()]
    }

    pub fn card(&self, id: CardId) -> Option<&BoardCard> {
        let (zone, index) = self.locate(id)?;
        self.zones[zone.index()].get(index)
    }

    pub fn cards(&self) -> impl Iterator<Item = (Zone, &BoardCard)> + '_ {
        Zone::ALL
            .iter()
            .flat_map(move |zone| self.zones[zone.index()].iter().map(move |card| (*zone, card)))
    }

    /// Finds a live card by identifier, using the zone and seat fields to
    /// narrow the search to one list.
    pub fn locate(&self, id: CardId) -> Option<(Zone, usize)> {
        let (zone, seat) = id.decode()?;
        if seat != self.seat {
            return None;
        }
        let index = self.zones[zone.index()].iter().position(|card| card.id == id)?;
        Some((zone, index))
    }

    /// Grants visibility of the card at `zone[index]` to `targets`. With
    /// `cascade`, spectators that saw the card at some earlier point are
    /// included too.
    fn reveal_at(
        &mut self,
        observers: &Observers,
        zone: Zone,
        index: usize,
        targets: Vec<PlayerId>,
        cascade: bool,
    ) -> Option<DiffEvent> {
        let card = self.zones[zone.index()].get_mut(index)?;
        let mut players = targets;
        if cascade {
            for spectator in &observers.spectators {
                if card.has_been_seen_by(*spectator) && !players.contains(spectator) {
                    players.push(*spectator);
                }
            }
        }
        if players.is_empty() {
            return None;
        }
        card.grant(players.iter().copied());
        Some(DiffEvent::RevealCard {
            card: card.id,
            players,
            printing: card.printing.clone(),
        })
    }

    /// Grants `player` every face-up card sitting in a public zone, as a
    /// newcomer would have seen them had they been present all along.
    pub fn reveal_public_to(&mut self, observers: &Observers, player: PlayerId) -> Vec<DiffEvent> {
        let mut events = Vec::new();
        for zone in Zone::ALL.into_iter().filter(|zone| zone.is_public()) {
            for index in 0..self.zones[zone.index()].len() {
                let card = &self.zones[zone.index()][index];
                if card.flipped || card.is_visible_to(player) {
                    continue;
                }
                if let Some(reveal) = self.reveal_at(observers, zone, index, vec![player], false) {
                    events.push(reveal);
                }
            }
        }
        events
    }

    fn relocate(
        &mut self,
        observers: &Observers,
        id: CardId,
        target: Zone,
        face_down: bool,
        events: &mut Vec<DiffEvent>,
    ) -> ZoneTransition {
        let Some((from, index)) = self.locate(id) else {
            return ZoneTransition::Rejected;
        };
        if from == target && !face_down {
            return ZoneTransition::Rejected;
        }

        if self.zones[from.index()][index].origin == Origin::Token && from != target {
            let card = self.zones[from.index()].remove(index);
            events.push(DiffEvent::DestroyCard { card: card.id });
            return ZoneTransition::Destroyed;
        }

        let Some(new_id) = self.ids.encode(target, self.seat) else {
            debug!(seat = self.seat, "card identifier space exhausted");
            return ZoneTransition::Rejected;
        };

        let mut card = self.zones[from.index()].remove(index);
        card.reset_transient();
        card.id = new_id;

        let mut targets: Vec<PlayerId> = if face_down {
            card.revoke_all();
            card.flipped = true;
            Vec::new()
        } else {
            card.visible_to().collect()
        };
        let widened: Vec<PlayerId> = if face_down || target == Zone::Hand {
            vec![self.owner]
        } else if target.is_public() {
            observers.all().collect()
        } else {
            Vec::new()
        };
        for player in widened {
            if !targets.contains(&player) {
                targets.push(player);
            }
        }

        let list = &mut self.zones[target.index()];
        list.push(card);
        let new_index = list.len() - 1;
        events.push(DiffEvent::ChangeZone { card: id, new_card: new_id, zone: target, index: new_index });
        if face_down {
            events.push(DiffEvent::change_attribute(new_id, CardAttribute::Flipped(true)));
        }
        if let Some(reveal) = self.reveal_at(observers, target, new_index, targets, !face_down) {
            events.push(reveal);
        }
        ZoneTransition::Moved(new_id)
    }

    /// Moves `card` to the end of `zone`. Tokens leaving their zone are
    /// destroyed instead. Face-down moves narrow visibility to the owner.
    pub fn change_zone(
        &mut self,
        observers: &Observers,
        card: CardId,
        zone: Zone,
        face_down: bool,
    ) -> (ZoneTransition, Vec<DiffEvent>) {
        let mut events = Vec::new();
        let transition = self.relocate(observers, card, zone, face_down, &mut events);
        (transition, events)
    }

    /// Moves up to `count` cards from the top (or bottom) of the library into
    /// `target`. Stops early once the library is empty.
    pub fn draw_cards(
        &mut self,
        observers: &Observers,
        count: u32,
        target: Zone,
        from_bottom: bool,
    ) -> Vec<DiffEvent> {
        let mut events = Vec::new();
        if target == Zone::Library {
            return events;
        }
        for _ in 0..count {
            let library = &self.zones[Zone::Library.index()];
            let next = if from_bottom { library.last() } else { library.first() };
            let Some(id) = next.map(|card| card.id) else {
                break;
            };
            if self.relocate(observers, id, target, false, &mut events) == ZoneTransition::Rejected {
                break;
            }
        }
        events
    }

    pub fn move_card(&mut self, card: CardId, x: f64, y: f64) -> Vec<DiffEvent> {
        let Some((zone, index)) = self.locate(card) else {
            return Vec::new();
        };
        let entry = &mut self.zones[zone.index()][index];
        entry.x = x;
        entry.y = y;
        vec![DiffEvent::ChangePosition { card, x, y }]
    }

    /// Reorders `card` within its zone. Negative or out-of-range indices mean
    /// the end of the list.
    pub fn move_card_to_index(&mut self, card: CardId, index: i64) -> Vec<DiffEvent> {
        let Some((zone, current)) = self.locate(card) else {
            return Vec::new();
        };
        let list = &mut self.zones[zone.index()];
        let entry = list.remove(current);
        let target = usize::try_from(index).ok().filter(|i| *i <= list.len()).unwrap_or(list.len());
        list.insert(target, entry);
        if target == current {
            return Vec::new();
        }
        vec![DiffEvent::ChangeIndex { card, index: target }]
    }

    /// Shuffles the library. Every library card gets a fresh identifier and
    /// loses all visibility.
    pub fn shuffle_deck(&mut self) -> Vec<DiffEvent> {
        let mut library = std::mem::take(&mut self.zones[Zone::Library.index()]);
        if self.ids.remaining() < library.len() as u32 {
            self.zones[Zone::Library.index()] = library;
            return Vec::new();
        }
        self.rng.shuffle(&mut library);
        for card in &mut library {
            card.revoke_all();
            card.id = self.ids.encode(Zone::Library, self.seat).unwrap_or(card.id);
        }
        let cards = library.iter().map(|card| card.id).collect();
        self.zones[Zone::Library.index()] = library;
        vec![DiffEvent::ShuffleDeck { seat: self.seat, cards }]
    }

    /// Returns the board to its pre-game shape. Tokens are destroyed, deck
    /// cards are gathered into a freshly shuffled library, and sideboard
    /// cards return to the sideboard.
    pub fn reset(&mut self, observers: &Observers) -> Vec<DiffEvent> {
        let survivors = self.cards().filter(|(_, card)| card.origin != Origin::Token).count();
        if (self.ids.remaining() as usize) < survivors {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut library = Vec::new();
        let mut sideboard = Vec::new();
        for zone in Zone::ALL {
            for card in std::mem::take(&mut self.zones[zone.index()]) {
                match card.origin {
                    Origin::Token => events.push(DiffEvent::DestroyCard { card: card.id }),
                    Origin::Deck => library.push(card),
                    Origin::Sideboard => sideboard.push(card),
                }
            }
        }

        self.rng.shuffle(&mut library);
        for card in &mut library {
            card.reset_transient();
            card.revoke_all();
            card.id = self.ids.encode(Zone::Library, self.seat).unwrap_or(card.id);
        }
        for card in &mut sideboard {
            card.reset_transient();
            card.id = self.ids.encode(Zone::Sideboard, self.seat).unwrap_or(card.id);
        }

        events.push(DiffEvent::ScoopDeck {
            seat: self.seat,
            library: library.iter().map(|card| card.id).collect(),
            sideboard: sideboard.iter().map(|card| card.id).collect(),
        });
        let sideboard_len = sideboard.len();
        self.zones[Zone::Library.index()] = library;
        self.zones[Zone::Sideboard.index()] = sideboard;
        self.virtual_ids.clear();

        for index in 0..sideboard_len {
            let mut targets: Vec<PlayerId> = self.zones[Zone::Sideboard.index()][index].visible_to().collect();
            if !targets.contains(&self.owner) {
                targets.push(self.owner);
            }
            if let Some(reveal) = self.reveal_at(observers, Zone::Sideboard, index, targets, true) {
                events.push(reveal);
            }
        }
        events
    }

    /// Reassigns origins from a sideboarding decision, then resets.
    pub fn sideboard(&mut self, observers: &Observers, main: &[CardId], side: &[CardId]) -> Vec<DiffEvent> {
        for (ids, origin) in [(main, Origin::Deck), (side, Origin::Sideboard)] {
            for id in ids {
                let Some((zone, index)) = self.locate(*id) else {
                    continue;
                };
                let card = &mut self.zones[zone.index()][index];
                if card.origin != Origin::Token {
                    card.origin = origin;
                }
            }
        }
        self.reset(observers)
    }

    /// Applies an attribute change. Turning a card face up while it sits in a
    /// public zone reveals it to everyone.
    pub fn set_attribute(
        &mut self,
        observers: &Observers,
        card: CardId,
        attribute: CardAttribute,
    ) -> Vec<DiffEvent> {
        let Some((zone, index)) = self.locate(card) else {
            return Vec::new();
        };
        if !self.zones[zone.index()][index].apply(attribute) {
            return Vec::new();
        }
        let mut events = vec![DiffEvent::change_attribute(card, attribute)];
        if attribute == CardAttribute::Flipped(false) && zone.is_public() {
            if let Some(reveal) = self.reveal_at(observers, zone, index, observers.all().collect(), true) {
                events.push(reveal);
            }
        }
        events
    }

    /// Reveals `card` to one observer, or to everyone when `observer` is
    /// `None`.
    pub fn reveal_to(
        &mut self,
        observers: &Observers,
        card: CardId,
        observer: Option<PlayerId>,
    ) -> Vec<DiffEvent> {
        let Some((zone, index)) = self.locate(card) else {
            return Vec::new();
        };
        let targets = match observer {
            Some(player) => vec![player],
            None => observers.all().collect(),
        };
        self.reveal_at(observers, zone, index, targets, true).into_iter().collect()
    }

    pub fn unreveal_to(&mut self, card: CardId, observer: Option<PlayerId>) -> Vec<DiffEvent> {
        let Some((zone, index)) = self.locate(card) else {
            return Vec::new();
        };
        let entry = &mut self.zones[zone.index()][index];
        let players = match observer {
            Some(player) if entry.revoke(player) => vec![player],
            Some(_) => Vec::new(),
            None => entry.revoke_all(),
        };
        if players.is_empty() {
            return Vec::new();
        }
        vec![DiffEvent::HideCard { card, players }]
    }

    /// Reveals the top `count` library cards to the owner.
    pub fn scry(&mut self, observers: &Observers, count: u32) -> Vec<DiffEvent> {
        let depth = (count as usize).min(self.zones[Zone::Library.index()].len());
        (0..depth)
            .filter_map(|index| self.reveal_at(observers, Zone::Library, index, vec![self.owner], true))
            .collect()
    }

    fn spawn(
        &mut self,
        observers: &Observers,
        printing: PrintingId,
        attributes: &[CardAttribute],
        position: (f64, f64),
        audience: Option<Vec<PlayerId>>,
    ) -> (Option<CardId>, Vec<DiffEvent>) {
        let Some(id) = self.ids.encode(Zone::Battlefield, self.seat) else {
            return (None, Vec::new());
        };
        let (x, y) = position;
        let mut card = BoardCard::new(id, printing, Origin::Token);
        card.x = x;
        card.y = y;
        let mut events = vec![DiffEvent::CreateCard { card: id, seat: self.seat, zone: Zone::Battlefield, x, y }];
        for attribute in attributes {
            if card.apply(*attribute) {
                events.push(DiffEvent::change_attribute(id, *attribute));
            }
        }
        let flipped = card.flipped;
        let list = &mut self.zones[Zone::Battlefield.index()];
        list.push(card);
        let index = list.len() - 1;

        let targets = match audience {
            Some(players) => players,
            None if flipped => vec![self.owner],
            None => observers.all().collect(),
        };
        if let Some(reveal) = self.reveal_at(observers, Zone::Battlefield, index, targets, !flipped) {
            events.push(reveal);
        }
        (Some(id), events)
    }

    /// Creates a token on the battlefield.
    pub fn create_card(
        &mut self,
        observers: &Observers,
        printing: PrintingId,
        attributes: &[CardAttribute],
    ) -> (Option<CardId>, Vec<DiffEvent>) {
        self.spawn(observers, printing, attributes, (0.0, 0.0), None)
    }

    /// Creates a token copying `template`'s printing and table state, offset
    /// from its position. A clone of a face-down card is only shown to those
    /// who could see the original.
    pub fn clone_from(
        &mut self,
        observers: &Observers,
        template: &BoardCard,
        overrides: &[CardAttribute],
    ) -> (Option<CardId>, Vec<DiffEvent>) {
        let mut attributes = vec![
            CardAttribute::Pivot(template.pivot),
            CardAttribute::Counter(template.counter),
            CardAttribute::Transformed(template.transformed),
            CardAttribute::Flipped(template.flipped),
        ];
        attributes.extend_from_slice(overrides);
        let audience = template.flipped.then(|| template.visible_to().collect());
        self.spawn(
            observers,
            template.printing.clone(),
            &attributes,
            (template.x + CLONE_OFFSET, template.y + CLONE_OFFSET),
            audience,
        )
    }

    /// Clones a card living on this board.
    pub fn clone_card(
        &mut self,
        observers: &Observers,
        card: CardId,
        overrides: &[CardAttribute],
    ) -> (Option<CardId>, Vec<DiffEvent>) {
        let Some(template) = self.card(card).cloned() else {
            return (None, Vec::new());
        };
        self.clone_from(observers, &template, overrides)
    }

    pub fn untap_all(&mut self) -> Vec<DiffEvent> {
        self.zones[Zone::Battlefield.index()]
            .iter_mut()
            .filter_map(|card| {
                let untapped = CardAttribute::Pivot(Pivot::Untapped);
                card.apply(untapped).then(|| DiffEvent::change_attribute(card.id, untapped))
            })
            .collect()
    }

    /// Issues a fresh, shuffled set of virtual identifiers for this board's
    /// cards (optionally limited to one zone), replacing any earlier set.
    pub fn get_virtual_ids(&mut self, zone: Option<Zone>) -> Vec<VirtualCard> {
        let mut cards: Vec<(Zone, CardId, PrintingId)> = self
            .cards()
            .filter(|(z, _)| zone.map_or(true, |wanted| wanted == *z))
            .map(|(z, card)| (z, card.id, card.printing.clone()))
            .collect();
        self.rng.shuffle(&mut cards);

        self.virtual_ids.clear();
        cards
            .into_iter()
            .zip(1u32..)
            .map(|((zone, card, printing), id)| {
                self.virtual_ids.insert(id, card);
                VirtualCard { id, zone, card, printing }
            })
            .collect()
    }

    /// Resolves virtual identifiers to live cards and invalidates the whole
    /// mapping. Unknown or stale identifiers are skipped.
    pub fn take_virtual(&mut self, ids: &[u32]) -> Vec<CardId> {
        let mapping = std::mem::take(&mut self.virtual_ids);
        ids.iter()
            .filter_map(|id| mapping.get(id).copied())
            .filter(|card| self.locate(*card).is_some())
            .collect()
    }

    pub fn view_for(&self, observer: PlayerId) -> BTreeMap<Zone, Vec<CardView>> {
        Zone::ALL
            .iter()
            .map(|zone| {
                let cards = self.zones[zone.index()].iter().map(|card| card.view_for(observer)).collect();
                (*zone, cards)
            })
            .collect()
    }
}
