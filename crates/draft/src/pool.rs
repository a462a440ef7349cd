//! Cards a drafter has picked, split into main and side groups.

use std::collections::BTreeMap;
use tabletop_types::view::PoolEntry;
use tabletop_types::{DeckEntry, PrintingId};

/// Counts are always at least one; an entry is removed when it reaches zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPool {
    main: BTreeMap<PrintingId, u32>,
    side: BTreeMap<PrintingId, u32>,
}

impl DraftPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, printing: PrintingId) {
        *self.main.entry(printing).or_insert(0) += 1;
    }

    /// Moves one copy between the groups. Returns `false` when the source
    /// group holds no copy.
    pub fn move_card(&mut self, printing: &PrintingId, to_sideboard: bool) -> bool {
        let (from, to) = if to_sideboard {
            (&mut self.main, &mut self.side)
        } else {
            (&mut self.side, &mut self.main)
        };
        let Some(count) = from.get_mut(printing) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            from.remove(printing);
        }
        *to.entry(printing.clone()).or_insert(0) += 1;
        true
    }

    pub fn count(&self, printing: &PrintingId) -> u32 {
        self.main.get(printing).copied().unwrap_or(0) + self.side.get(printing).copied().unwrap_or(0)
    }

    /// Total number of cards in both groups.
    pub fn len(&self) -> usize {
        self.main.values().chain(self.side.values()).map(|n| *n as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.side.is_empty()
    }

    pub fn printings(&self) -> impl Iterator<Item = (&PrintingId, u32)> + '_ {
        self.main.iter().chain(self.side.iter()).map(|(p, n)| (p, *n))
    }

    pub fn main(&self) -> Vec<PoolEntry> {
        Self::entries(&self.main)
    }

    pub fn side(&self) -> Vec<PoolEntry> {
        Self::entries(&self.side)
    }

    fn entries(group: &BTreeMap<PrintingId, u32>) -> Vec<PoolEntry> {
        group.iter().map(|(printing, count)| PoolEntry { printing: printing.clone(), count: *count }).collect()
    }

    /// Main and side groups as deck lists.
    pub fn to_deck_lists(&self) -> (Vec<DeckEntry>, Vec<DeckEntry>) {
        let list = |group: &BTreeMap<PrintingId, u32>| -> Vec<DeckEntry> {
            group.iter().map(|(printing, count)| DeckEntry { printing: printing.clone(), count: *count }).collect()
        };
        (list(&self.main), list(&self.side))
    }
}
