//! Interfaces to the services the room layer depends on but does not own.
//!
//! Card metadata, deck persistence and booster configuration are looked up
//! through these traits. The in-memory implementations back tests and small
//! deployments; [`crate::storage`] provides JSON-file backed ones.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tabletop_draft::SetInfo;
use tabletop_types::{CardInfo, Deck, DeckEntry, DeckId, PlayerId, PrintingId};

/// Printed card metadata lookup.
#[async_trait]
pub trait CardCatalog: Send + Sync {
    /// `Ok(None)` when the printing is unknown.
    async fn lookup(&self, printing: &PrintingId) -> Result<Option<CardInfo>, CollaboratorError>;
}

/// Deck persistence.
#[async_trait]
pub trait DeckStore: Send + Sync {
    async fn get(&self, deck: DeckId) -> Result<Option<Deck>, CollaboratorError>;

    async fn create(
        &self,
        owner: PlayerId,
        name: String,
        main: Vec<DeckEntry>,
        side: Vec<DeckEntry>,
    ) -> Result<Deck, CollaboratorError>;
}

/// Booster configuration by set code.
#[async_trait]
pub trait BoosterSource: Send + Sync {
    async fn set(&self, code: &str) -> Result<Option<Arc<SetInfo>>, CollaboratorError>;
}

/// The collaborator handles a registry is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CardCatalog>,
    pub decks: Arc<dyn DeckStore>,
    pub boosters: Arc<dyn BoosterSource>,
}

impl Collaborators {
    pub fn new(
        catalog: Arc<dyn CardCatalog>,
        decks: Arc<dyn DeckStore>,
        boosters: Arc<dyn BoosterSource>,
    ) -> Self {
        Self { catalog, decks, boosters }
    }

    /// Empty in-memory collaborators.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCatalog::new()),
            Arc::new(MemoryDeckStore::new()),
            Arc::new(MemoryBoosters::new()),
        )
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    cards: DashMap<PrintingId, CardInfo>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: CardInfo) {
        self.cards.insert(info.id.clone(), info);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl FromIterator<CardInfo> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CardInfo>>(iter: I) -> Self {
        let catalog = Self::new();
        for info in iter {
            catalog.insert(info);
        }
        catalog
    }
}

#[async_trait]
impl CardCatalog for MemoryCatalog {
    async fn lookup(&self, printing: &PrintingId) -> Result<Option<CardInfo>, CollaboratorError> {
        Ok(self.cards.get(printing).map(|entry| entry.value().clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeckStore {
    decks: DashMap<DeckId, Deck>,
}

impl MemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, deck: Deck) {
        self.decks.insert(deck.id, deck);
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }

    pub fn decks_of(&self, owner: PlayerId) -> Vec<Deck> {
        self.decks
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl DeckStore for MemoryDeckStore {
    async fn get(&self, deck: DeckId) -> Result<Option<Deck>, CollaboratorError> {
        Ok(self.decks.get(&deck).map(|entry| entry.value().clone()))
    }

    async fn create(
        &self,
        owner: PlayerId,
        name: String,
        main: Vec<DeckEntry>,
        side: Vec<DeckEntry>,
    ) -> Result<Deck, CollaboratorError> {
        let deck = Deck { id: DeckId::new(), owner, name, main, side };
        self.insert(deck.clone());
        Ok(deck)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBoosters {
    sets: DashMap<String, Arc<SetInfo>>,
}

impl MemoryBoosters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set codes are matched case-insensitively.
    pub fn insert(&self, set: SetInfo) {
        self.sets.insert(set.code.to_lowercase(), Arc::new(set));
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[async_trait]
impl BoosterSource for MemoryBoosters {
    async fn set(&self, code: &str) -> Result<Option<Arc<SetInfo>>, CollaboratorError> {
        Ok(self.sets.get(&code.to_lowercase()).map(|entry| entry.value().clone()))
    }
}

/// Every card definition reachable from `roots` through related tokens.
/// Unknown printings are skipped.
pub async fn resolve_with_tokens<I>(
    catalog: &dyn CardCatalog,
    roots: I,
) -> Result<BTreeMap<PrintingId, CardInfo>, CollaboratorError>
where
    I: IntoIterator<Item = PrintingId>,
{
    let mut resolved = BTreeMap::new();
    let mut pending: Vec<PrintingId> = roots.into_iter().collect();
    while let Some(printing) = pending.pop() {
        if resolved.contains_key(&printing) {
            continue;
        }
        let Some(info) = catalog.lookup(&printing).await? else {
            continue;
        };
        pending.extend(info.related_tokens.iter().filter(|t| !resolved.contains_key(*t)).cloned());
        resolved.insert(printing, info);
    }
    Ok(resolved)
}
