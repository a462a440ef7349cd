use tabletop_types::view::{DraftCardView, PackView};
use tabletop_types::PrintingId;

/// A card inside a pack. `id` is unique within the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftCard {
    pub id: u32,
    pub printing: PrintingId,
    pub token: bool,
}

/// A booster in flight. Shrinks with every pick and is dropped once empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pack {
    pub id: u32,
    pub cards: Vec<DraftCard>,
}

impl Pack {
    pub fn new(id: u32, cards: Vec<DraftCard>) -> Self {
        Self { id, cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: u32) -> bool {
        self.cards.iter().any(|c| c.id == card)
    }

    /// Removes and returns the card with identifier `card`.
    pub fn take(&mut self, card: u32) -> Option<DraftCard> {
        let index = self.cards.iter().position(|c| c.id == card)?;
        Some(self.cards.remove(index))
    }

    pub fn view(&self) -> PackView {
        PackView {
            id: self.id,
            cards: self
                .cards
                .iter()
                .map(|c| DraftCardView { id: c.id, printing: c.printing.clone() })
                .collect(),
        }
    }
}
