//! A running booster draft.

use super::{Liveness, Outbox};
use crate::collaborators::DeckStore;
use crate::error::ServerError;
use tabletop_draft::{Draft, DraftNotice};
use tabletop_types::view::{RoomStage, RoomSummary};
use tabletop_types::{DraftUpdate, LobbySettings, PlayerId, PrintingId, RoomId, ServerMessage};
use tracing::{debug, info};

pub struct DraftRoom {
    id: RoomId,
    name: String,
    settings: LobbySettings,
    draft: Draft,
    pub liveness: Liveness,
}

impl DraftRoom {
    pub fn new(id: RoomId, name: String, settings: LobbySettings, draft: Draft) -> Self {
        Self { id, name, settings, draft, liveness: Liveness::new() }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_finished(&self) -> bool {
        self.draft.is_finished()
    }

    /// Human participants. Bots have no connection to notify.
    pub fn members(&self) -> Vec<PlayerId> {
        self.draft.humans().map(|(_, player)| player).collect()
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.draft.seat_of(player).is_some()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room: self.id,
            name: self.name.clone(),
            settings: self.settings.clone(),
            stage: RoomStage::Active,
            occupied: self.draft.seats(),
        }
    }

    /// Deals the first round.
    pub fn start(&mut self) -> Result<Outbox, ServerError> {
        let notices = self.draft.start()?;
        info!("🃏 Draft {} started with {} seats", self.id, self.draft.seats());
        Ok(self.route(notices))
    }

    pub fn pick(&mut self, sender: PlayerId, card: u32) -> Result<Outbox, ServerError> {
        let Some(seat) = self.draft.seat_of(sender) else {
            return Ok(Outbox::new());
        };
        let notices = self.draft.pick(seat, card)?;
        if !notices.is_empty() {
            self.liveness.touch();
        }
        Ok(self.route(notices))
    }

    pub fn move_card(&mut self, sender: PlayerId, printing: &PrintingId, sideboard: bool) -> Outbox {
        let mut outbox = Outbox::new();
        let Some(seat) = self.draft.seat_of(sender) else {
            return outbox;
        };
        if self.draft.move_card(seat, printing, sideboard) {
            self.liveness.touch();
            let update = DraftUpdate::MoveCard { card: printing.clone(), sideboard };
            outbox.send(sender, ServerMessage::DraftUpdate { update });
        }
        outbox
    }

    /// Full draft state for a (re)connecting participant.
    pub fn snapshot(&self, player: PlayerId) -> Outbox {
        let mut outbox = Outbox::new();
        if let Some(update) = self.draft.seat_of(player).and_then(|seat| self.draft.state_for(seat)) {
            outbox.send(player, ServerMessage::DraftUpdate { update });
        }
        outbox
    }

    fn route(&self, notices: Vec<DraftNotice>) -> Outbox {
        let mut outbox = Outbox::new();
        let members = self.members();
        for notice in notices {
            match notice {
                DraftNotice::ReceivePack { seat, update } => {
                    if let Some(player) = self.draft.agents().get(seat).and_then(|agent| agent.player()) {
                        outbox.send(player, ServerMessage::DraftUpdate { update });
                    }
                }
                DraftNotice::PackQueue(update) => {
                    outbox.send_all(&members, ServerMessage::DraftUpdate { update });
                }
                DraftNotice::Finished => debug!("Draft {} reported completion", self.id),
            }
        }
        outbox
    }

    /// Persists every human pool as a deck and tells its owner where it went.
    /// Bot pools are discarded.
    pub async fn finish(&self, decks: &dyn DeckStore) -> Result<Outbox, ServerError> {
        let mut outbox = Outbox::new();
        for (seat, player) in self.draft.humans() {
            let Some(pool) = self.draft.pool(seat) else {
                continue;
            };
            let (main, side) = pool.to_deck_lists();
            let deck = decks.create(player, format!("{} draft", self.name), main, side).await?;
            info!("💾 Saved draft pool of {} as deck {}", player, deck.id);
            outbox.send(player, ServerMessage::DraftUpdate { update: DraftUpdate::EndDraft { deck: Some(deck.id) } });
        }
        Ok(outbox)
    }
}
