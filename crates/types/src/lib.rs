//! Core types shared by every Tabletop crate
//!
//! This crate holds the identifiers, the bit-packed card identifier scheme,
//! the diff-event catalogue, and the wire messages exchanged with clients.
//! Nothing here owns state beyond the card identifier allocator; rooms and
//! boards live in the crates that depend on this one.

pub mod card_id;
pub mod error;
pub mod event;
pub mod ids;
pub mod protocol;
pub mod rng;
pub mod view;
pub mod zone;

pub use card_id::{CardId, CardIdAllocator, SeatIndex, MAX_SEATS, MAX_SEQUENCE};
pub use error::ProtocolError;
pub use event::{
    AttributeChange, CardAttribute, CardAttributeKind, DiffEvent, Pivot, PlayerAttribute,
    PlayerAttributeKind,
};
pub use ids::{DeckId, PlayerId, PrintingId, RoomId};
pub use protocol::{
    CardInfo, ClientMessage, Deck, DeckEntry, DraftUpdate, LobbySettings, ServerMessage,
    SpecialAction,
};
pub use rng::GameRng;
pub use zone::Zone;
