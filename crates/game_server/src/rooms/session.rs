//! A running game and the publication of its diff events.

use super::{Liveness, Outbox};
use crate::collaborators::{resolve_with_tokens, CardCatalog};
use crate::error::ServerError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tabletop_board::{Dispatch, Game};
use tabletop_types::view::{RoomStage, RoomSummary, VirtualCardView};
use tabletop_types::{
    CardId, CardInfo, ClientMessage, DiffEvent, LobbySettings, PlayerId, PrintingId, RoomId,
    ServerMessage,
};
use tracing::{debug, warn};

/// A [`Game`] plus everything needed to tell its subscribers about it.
///
/// Every subscriber receives the same `board_update`; printed identities go
/// out separately in `oracle_card_info`, and only to the subscribers a reveal
/// names.
pub struct Session {
    game: Game,
    name: String,
    settings: LobbySettings,
    catalog: Arc<dyn CardCatalog>,
    pub liveness: Liveness,
}

impl Session {
    pub fn new(game: Game, name: String, settings: LobbySettings, catalog: Arc<dyn CardCatalog>) -> Self {
        Self { game, name, settings, catalog, liveness: Liveness::new() }
    }

    pub fn id(&self) -> RoomId {
        self.game.room()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Seated players followed by spectators.
    pub fn members(&self) -> Vec<PlayerId> {
        self.game.observers().all().collect()
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.game.is_subscribed(player)
    }

    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.game.seat_of(player).is_some()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room: self.id(),
            name: self.name.clone(),
            settings: self.settings.clone(),
            stage: RoomStage::Active,
            occupied: self.game.seats().len(),
        }
    }

    /// Applies one in-game action and returns what to publish.
    ///
    /// Card creation looks the printing up first; an unknown printing is
    /// rejected before the board is touched, and a failing catalog aborts the
    /// action the same way.
    pub async fn handle(&mut self, sender: PlayerId, message: &ClientMessage) -> Result<Outbox, ServerError> {
        if let ClientMessage::CreateToken { id } | ClientMessage::CreateCard { id } | ClientMessage::CreateClone { id, .. } =
            message
        {
            if self.catalog.lookup(id).await?.is_none() {
                debug!(printing = %id, "rejecting card creation for unknown printing");
                return Ok(Outbox::new());
            }
        }

        let dispatch = self.game.apply(sender, message)?;
        if !dispatch.events.is_empty() {
            self.liveness.touch();
        }
        Ok(self.publish(sender, dispatch).await)
    }

    /// Board update to everyone, per-subscriber identity info, the log
    /// line, and any virtual identifiers back to the sender.
    async fn publish(&self, sender: PlayerId, dispatch: Dispatch) -> Outbox {
        let mut outbox = Outbox::new();
        let subscribers = self.members();
        let Dispatch { events, log, virtual_ids } = dispatch;

        if !events.is_empty() {
            for subscriber in &subscribers {
                outbox.send(*subscriber, ServerMessage::BoardUpdate { events: events.clone() });
                if let Some(info) = self.identity_info(*subscriber, &events).await {
                    outbox.send(*subscriber, info);
                }
            }
        }

        if let Some(message) = log {
            outbox.send_all(&subscribers, ServerMessage::GameLog { owner: Some(sender), message });
        }

        if let Some(cards) = virtual_ids {
            let cards = cards
                .into_iter()
                .map(|card| VirtualCardView { id: card.id, zone: card.zone, printing: card.printing })
                .collect();
            outbox.send(sender, ServerMessage::VirtualIds { cards });
        }
        outbox
    }

    /// The reveals and hides in `events` that name `subscriber`, or `None`
    /// when there are none.
    async fn identity_info(&self, subscriber: PlayerId, events: &[DiffEvent]) -> Option<ServerMessage> {
        let mut reveals = BTreeMap::new();
        let mut hides = Vec::new();
        for event in events {
            match event {
                DiffEvent::RevealCard { card, players, printing } if players.contains(&subscriber) => {
                    reveals.insert(*card, printing.clone());
                }
                DiffEvent::HideCard { card, players } if players.contains(&subscriber) => {
                    hides.push(*card);
                }
                _ => {}
            }
        }
        if reveals.is_empty() && hides.is_empty() {
            return None;
        }
        let card_info = self.card_info(reveals.values().cloned()).await;
        Some(ServerMessage::OracleCardInfo { reveals, card_info, hides })
    }

    /// Card definitions plus their related tokens. The board has already
    /// changed by the time this runs, so a failing catalog only costs the
    /// metadata.
    async fn card_info(&self, printings: impl Iterator<Item = PrintingId>) -> BTreeMap<PrintingId, CardInfo> {
        match resolve_with_tokens(self.catalog.as_ref(), printings).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Card catalog lookup failed in room {}: {}", self.id(), e);
                BTreeMap::new()
            }
        }
    }

    /// Full state for `player`, sent on (re)connect and when spectating.
    pub async fn snapshot(&self, player: PlayerId) -> Outbox {
        let state = self.game.view_for(player);
        let reveals: BTreeMap<CardId, PrintingId> = state
            .seats
            .iter()
            .flat_map(|seat| seat.zones.values().flatten())
            .filter_map(|card| Some((card.id, card.printing.clone()?)))
            .collect();

        let mut outbox = Outbox::new();
        outbox.send(player, ServerMessage::GameState { state });
        if !reveals.is_empty() {
            let card_info = self.card_info(reveals.values().cloned()).await;
            outbox.send(player, ServerMessage::OracleCardInfo { reveals, card_info, hides: Vec::new() });
        }
        outbox
    }

    pub async fn add_spectator(&mut self, player: PlayerId) -> Outbox {
        let events = self.game.add_spectator(player);
        let mut outbox = Outbox::new();
        if !events.is_empty() {
            self.liveness.touch();
            outbox.extend(self.publish(player, Dispatch { events, ..Dispatch::default() }).await);
        }
        outbox.extend(self.snapshot(player).await);
        outbox
    }

    pub async fn remove_spectator(&mut self, player: PlayerId) -> Outbox {
        let events = self.game.remove_spectator(player);
        if events.is_empty() {
            return Outbox::new();
        }
        self.liveness.touch();
        self.publish(player, Dispatch { events, ..Dispatch::default() }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MemoryCatalog;
    use tabletop_board::{GameSettings, SeatSetup};
    use tabletop_types::{DeckEntry, GameRng, Zone};

    fn deck(prefix: &str, n: u32) -> Vec<DeckEntry> {
        (0..n).map(|i| DeckEntry { printing: PrintingId::new(format!("{prefix}-{i}")), count: 1 }).collect()
    }

    fn catalog() -> Arc<MemoryCatalog> {
        let catalog = MemoryCatalog::new();
        for prefix in ["a", "b"] {
            for i in 0..20 {
                let id = PrintingId::new(format!("{prefix}-{i}"));
                catalog.insert(CardInfo {
                    id: id.clone(),
                    name: format!("Card {id}"),
                    mana_cost: None,
                    type_line: "Creature".to_string(),
                    related_tokens: Vec::new(),
                });
            }
        }
        catalog.insert(CardInfo {
            id: PrintingId::new("token-maker"),
            name: "Token Maker".to_string(),
            mana_cost: None,
            type_line: "Sorcery".to_string(),
            related_tokens: vec![PrintingId::new("soldier")],
        });
        catalog.insert(CardInfo {
            id: PrintingId::new("soldier"),
            name: "Soldier".to_string(),
            mana_cost: None,
            type_line: "Token Creature".to_string(),
            related_tokens: Vec::new(),
        });
        Arc::new(catalog)
    }

    fn session() -> (Session, PlayerId, PlayerId) {
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let setups = vec![
            SeatSetup { player: alice, main: deck("a", 20), side: Vec::new() },
            SeatSetup { player: bob, main: deck("b", 20), side: Vec::new() },
        ];
        let game = Game::new(RoomId::new(), setups, GameSettings::default(), &mut GameRng::new(7));
        let session = Session::new(game, "duel".to_string(), LobbySettings::Game { seats: 2 }, catalog());
        (session, alice, bob)
    }

    fn oracle_for(outbox: &Outbox, player: PlayerId) -> Vec<&ServerMessage> {
        outbox
            .for_player(player)
            .filter(|m| matches!(m, ServerMessage::OracleCardInfo { .. }))
            .collect()
    }

    #[tokio::test]
    async fn test_draw_reveals_only_to_drawer() {
        let (mut session, alice, bob) = session();
        let outbox = session.handle(alice, &ClientMessage::DrawCard { count: 2 }).await.unwrap();

        let boards = |p| outbox.for_player(p).filter(|m| matches!(m, ServerMessage::BoardUpdate { .. })).count();
        assert_eq!(boards(alice), 1);
        assert_eq!(boards(bob), 1);

        let alice_info = oracle_for(&outbox, alice);
        assert_eq!(alice_info.len(), 1);
        match alice_info[0] {
            ServerMessage::OracleCardInfo { reveals, card_info, .. } => {
                assert_eq!(reveals.len(), 2);
                assert!(reveals.values().all(|p| card_info.contains_key(p)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(oracle_for(&outbox, bob).is_empty());

        let logs: Vec<_> = outbox
            .for_player(bob)
            .filter_map(|m| match m {
                ServerMessage::GameLog { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(logs, vec!["drew 2 cards"]);
    }

    #[tokio::test]
    async fn test_unknown_printing_is_rejected_without_mutation() {
        let (mut session, alice, _) = session();
        let outbox = session
            .handle(alice, &ClientMessage::CreateToken { id: PrintingId::new("nonexistent") })
            .await
            .unwrap();
        assert!(outbox.is_empty());
        assert!(session.game().seats()[0].board.zone(Zone::Battlefield).is_empty());
    }

    #[tokio::test]
    async fn test_created_token_brings_related_definitions() {
        let (mut session, alice, bob) = session();
        let outbox = session
            .handle(alice, &ClientMessage::CreateCard { id: PrintingId::new("token-maker") })
            .await
            .unwrap();
        let info = oracle_for(&outbox, bob);
        assert_eq!(info.len(), 1);
        match info[0] {
            ServerMessage::OracleCardInfo { card_info, .. } => {
                assert!(card_info.contains_key(&PrintingId::new("soldier")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_virtual_ids_go_to_requester_only() {
        let (mut session, alice, bob) = session();
        let outbox = session
            .handle(alice, &ClientMessage::RequestVirtualIds { zone: Some(Zone::Library) })
            .await
            .unwrap();
        assert_eq!(outbox.len(), 1);
        assert!(matches!(
            outbox.for_player(alice).next(),
            Some(ServerMessage::VirtualIds { cards }) if cards.len() == 20
        ));
        assert_eq!(outbox.for_player(bob).count(), 0);
    }

    #[tokio::test]
    async fn test_spectator_receives_masked_snapshot() {
        let (mut session, alice, _) = session();
        session.handle(alice, &ClientMessage::DrawCard { count: 1 }).await.unwrap();
        let watcher = PlayerId::new();
        let outbox = session.add_spectator(watcher).await;

        let state = outbox.for_player(watcher).find_map(|m| match m {
            ServerMessage::GameState { state } => Some(state.clone()),
            _ => None,
        });
        let state = state.expect("spectator gets a game state");
        assert!(state.spectators.contains(&watcher));
        assert!(state.seats[0].zones[&Zone::Hand][0].printing.is_none());
        assert!(oracle_for(&outbox, watcher).is_empty());
        assert!(session.is_member(watcher));
        assert!(!session.is_seated(watcher));
    }
}
