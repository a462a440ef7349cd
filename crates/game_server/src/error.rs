//! Error types for the game server.

use tabletop_draft::DraftError;
use tabletop_types::{DeckId, PrintingId, ProtocolError};
use thiserror::Error;

/// Errors that can occur while serving connections and rooms.
///
/// Referential misses and illegal transitions are not errors: they come back
/// as empty outboxes or `false`. Anything that does reach this type leaves the
/// affected room as it was before the action.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket, handshake or send failures.
    #[error("Network error: {0}")]
    Network(String),
    /// Inbound payloads that could not be interpreted.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// A card catalog, deck store or booster source call failed.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
    /// Booster configuration rejected while building a draft.
    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Failures reported by external collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Unknown printing {0}")]
    UnknownPrinting(PrintingId),
    #[error("Unknown deck {0}")]
    UnknownDeck(DeckId),
    #[error("Unknown set {0}")]
    UnknownSet(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for CollaboratorError {
    fn from(error: std::io::Error) -> Self {
        CollaboratorError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(error: serde_json::Error) -> Self {
        CollaboratorError::Storage(error.to_string())
    }
}
