//! A single card instance on a board.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tabletop_types::view::CardView;
use tabletop_types::{CardAttribute, CardAttributeKind, CardId, Pivot, PlayerId, PrintingId};

/// Where a card instance came from. Governs what a board reset does with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Deck,
    Sideboard,
    Token,
}

#[derive(Debug, Clone)]
pub struct BoardCard {
    pub id: CardId,
    pub printing: PrintingId,
    pub origin: Origin,
    pub x: f64,
    pub y: f64,
    pub pivot: Pivot,
    pub counter: i32,
    pub transformed: bool,
    pub flipped: bool,
    visible_to: BTreeSet<PlayerId>,
    /// Every observer that has ever been shown this card.
    seen_by: BTreeSet<PlayerId>,
}

impl BoardCard {
    pub fn new(id: CardId, printing: PrintingId, origin: Origin) -> Self {
        Self {
            id,
            printing,
            origin,
            x: 0.0,
            y: 0.0,
            pivot: Pivot::Untapped,
            counter: 0,
            transformed: false,
            flipped: false,
            visible_to: BTreeSet::new(),
            seen_by: BTreeSet::new(),
        }
    }

    /// Clears table state that does not survive a zone change.
    pub fn reset_transient(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.pivot = Pivot::Untapped;
        self.counter = 0;
        self.transformed = false;
        self.flipped = false;
    }

    pub fn is_visible_to(&self, player: PlayerId) -> bool {
        self.visible_to.contains(&player)
    }

    pub fn visible_to(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.visible_to.iter().copied()
    }

    pub fn has_been_seen_by(&self, player: PlayerId) -> bool {
        self.seen_by.contains(&player)
    }

    pub(crate) fn grant(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        for player in players {
            self.visible_to.insert(player);
            self.seen_by.insert(player);
        }
    }

    /// Removes one observer, returning whether it was present.
    pub(crate) fn revoke(&mut self, player: PlayerId) -> bool {
        self.visible_to.remove(&player)
    }

    /// Empties the visibility set, returning who lost sight of the card.
    pub(crate) fn revoke_all(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.visible_to).into_iter().collect()
    }

    pub fn attribute(&self, kind: CardAttributeKind) -> CardAttribute {
        match kind {
            CardAttributeKind::Pivot => CardAttribute::Pivot(self.pivot),
            CardAttributeKind::Counter => CardAttribute::Counter(self.counter),
            CardAttributeKind::Transformed => CardAttribute::Transformed(self.transformed),
            CardAttributeKind::Flipped => CardAttribute::Flipped(self.flipped),
        }
    }

    /// Applies `attribute`, returning whether anything changed.
    pub fn apply(&mut self, attribute: CardAttribute) -> bool {
        if self.attribute(attribute.kind()) == attribute {
            return false;
        }
        match attribute {
            CardAttribute::Pivot(pivot) => self.pivot = pivot,
            CardAttribute::Counter(n) => self.counter = n,
            CardAttribute::Transformed(b) => self.transformed = b,
            CardAttribute::Flipped(b) => self.flipped = b,
        }
        true
    }

    pub fn view_for(&self, observer: PlayerId) -> CardView {
        CardView {
            id: self.id,
            x: self.x,
            y: self.y,
            pivot: self.pivot,
            counter: self.counter,
            transformed: self.transformed,
            flipped: self.flipped,
            printing: self.is_visible_to(observer).then(|| self.printing.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> BoardCard {
        BoardCard::new(CardId(0x100), PrintingId::new("grizzly-bears"), Origin::Deck)
    }

    #[test]
    fn test_apply_reports_changes_only() {
        let mut card = card();
        assert!(card.apply(CardAttribute::Pivot(Pivot::Tapped)));
        assert!(!card.apply(CardAttribute::Pivot(Pivot::Tapped)));
        assert!(card.apply(CardAttribute::Counter(2)));
        assert_eq!(card.attribute(CardAttributeKind::Counter), CardAttribute::Counter(2));
    }

    #[test]
    fn test_reset_transient_keeps_origin_and_visibility() {
        let mut card = card();
        let owner = PlayerId::new();
        card.grant([owner]);
        card.x = 40.0;
        card.apply(CardAttribute::Flipped(true));
        card.reset_transient();
        assert_eq!(card.x, 0.0);
        assert!(!card.flipped);
        assert_eq!(card.origin, Origin::Deck);
        assert!(card.is_visible_to(owner));
    }

    #[test]
    fn test_revoke_keeps_history() {
        let mut card = card();
        let spectator = PlayerId::new();
        card.grant([spectator]);
        assert_eq!(card.revoke_all(), vec![spectator]);
        assert!(!card.is_visible_to(spectator));
        assert!(card.has_been_seen_by(spectator));
    }

    #[test]
    fn test_view_hides_printing_from_strangers() {
        let mut card = card();
        let owner = PlayerId::new();
        card.grant([owner]);
        assert_eq!(card.view_for(owner).printing, Some(PrintingId::new("grizzly-bears")));
        assert_eq!(card.view_for(PlayerId::new()).printing, None);
    }
}
