//! JSON-file backed collaborators.
//!
//! A data directory holds `cards.json` (an array of card definitions),
//! `sets/<code>.json` (one booster configuration per file) and
//! `decks/<id>.deck.json` (one persisted deck per file). Missing files and
//! directories are treated as empty.

use crate::collaborators::{Collaborators, DeckStore, MemoryBoosters, MemoryCatalog};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabletop_draft::SetInfo;
use tabletop_types::{CardInfo, Deck, DeckEntry, DeckId, PlayerId};
use tokio::fs as tokio_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CollaboratorError> {
    let contents = tokio_fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Paths under `dir` with the given file-name suffix. Missing directory
/// yields nothing.
async fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, CollaboratorError> {
    if !tokio_fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    let mut entries = tokio_fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub async fn load_catalog(dir: &Path) -> Result<MemoryCatalog, CollaboratorError> {
    let path = dir.join("cards.json");
    if !tokio_fs::try_exists(&path).await? {
        warn!("No card catalog at {}", path.display());
        return Ok(MemoryCatalog::new());
    }
    let cards: Vec<CardInfo> = read_json(&path).await?;
    info!("📚 Loaded {} card definitions", cards.len());
    Ok(cards.into_iter().collect())
}

/// Loads every set file. A set that fails validation is skipped with an
/// error log rather than failing startup.
pub async fn load_boosters(dir: &Path) -> Result<MemoryBoosters, CollaboratorError> {
    let boosters = MemoryBoosters::new();
    for path in files_with_suffix(&dir.join("sets"), ".json").await? {
        let set: SetInfo = read_json(&path).await?;
        if let Err(e) = set.validate() {
            error!("Skipping set {} from {}: {}", set.code, path.display(), e);
            continue;
        }
        debug!("Loaded set {} ({})", set.code, set.name);
        boosters.insert(set);
    }
    info!("📦 Loaded {} booster configurations", boosters.len());
    Ok(boosters)
}

/// Decks kept as one JSON file each, cached in memory.
#[derive(Debug)]
pub struct JsonDeckStore {
    deck_dir: PathBuf,
    cache: DashMap<DeckId, Deck>,
}

impl JsonDeckStore {
    pub async fn open(deck_dir: PathBuf) -> Result<Self, CollaboratorError> {
        tokio_fs::create_dir_all(&deck_dir).await?;
        let cache = DashMap::new();
        for path in files_with_suffix(&deck_dir, ".deck.json").await? {
            match read_json::<Deck>(&path).await {
                Ok(deck) => {
                    cache.insert(deck.id, deck);
                }
                Err(e) => error!("Failed to load deck from {}: {}", path.display(), e),
            }
        }
        info!("🗃️ Loaded {} decks from {}", cache.len(), deck_dir.display());
        Ok(Self { deck_dir, cache })
    }

    fn deck_path(&self, deck: DeckId) -> PathBuf {
        self.deck_dir.join(format!("{deck}.deck.json"))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Writes through a temporary file and renames it into place.
    async fn save(&self, deck: &Deck) -> Result<(), CollaboratorError> {
        let path = self.deck_path(deck.id);
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(deck)?;

        let mut file = tokio_fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        tokio_fs::rename(&temp_path, &path).await?;
        debug!("Saved deck {} to {}", deck.id, path.display());
        Ok(())
    }
}

#[async_trait]
impl DeckStore for JsonDeckStore {
    async fn get(&self, deck: DeckId) -> Result<Option<Deck>, CollaboratorError> {
        Ok(self.cache.get(&deck).map(|entry| entry.value().clone()))
    }

    async fn create(
        &self,
        owner: PlayerId,
        name: String,
        main: Vec<DeckEntry>,
        side: Vec<DeckEntry>,
    ) -> Result<Deck, CollaboratorError> {
        let deck = Deck { id: DeckId::new(), owner, name, main, side };
        self.save(&deck).await?;
        self.cache.insert(deck.id, deck.clone());
        Ok(deck)
    }
}

/// Builds every collaborator from one data directory.
pub async fn load_data_dir(dir: &Path) -> Result<Collaborators, CollaboratorError> {
    let catalog = load_catalog(dir).await?;
    let boosters = load_boosters(dir).await?;
    let decks = JsonDeckStore::open(dir.join("decks")).await?;
    Ok(Collaborators::new(Arc::new(catalog), Arc::new(decks), Arc::new(boosters)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_types::PrintingId;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_data_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let collaborators = load_data_dir(&dir.path().join("nowhere")).await.unwrap();
        assert!(collaborators.catalog.lookup(&PrintingId::new("x")).await.unwrap().is_none());
        assert!(collaborators.boosters.set("m21").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_and_sets_load_from_files() {
        let dir = TempDir::new().unwrap();
        tokio_fs::write(
            dir.path().join("cards.json"),
            r#"[{"id":"p1","name":"Grizzly Bears","manaCost":"{1}{G}","typeLine":"Creature"}]"#,
        )
        .await
        .unwrap();
        tokio_fs::create_dir_all(dir.path().join("sets")).await.unwrap();
        tokio_fs::write(
            dir.path().join("sets").join("tst.json"),
            r#"{"code":"TST","boosters":[{"weight":1.0,"contents":{"common":2}}],
                "sheets":{"common":{"cards":{"p1":1.0,"p2":1.0,"p3":1.0}}}}"#,
        )
        .await
        .unwrap();

        let catalog = load_catalog(dir.path()).await.unwrap();
        assert_eq!(catalog.len(), 1);
        let boosters = load_boosters(dir.path()).await.unwrap();
        assert_eq!(boosters.len(), 1);
    }

    #[tokio::test]
    async fn test_decks_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let owner = PlayerId::new();
        let store = JsonDeckStore::open(dir.path().join("decks")).await.unwrap();
        let main = vec![DeckEntry { printing: PrintingId::new("p1"), count: 4 }];
        let deck = store.create(owner, "draft pool".to_string(), main, Vec::new()).await.unwrap();

        let reopened = JsonDeckStore::open(dir.path().join("decks")).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(deck.id).await.unwrap(), Some(deck));
    }
}
