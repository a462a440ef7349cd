//! Per-observer projections of room state, sent on (re)connect.

use crate::card_id::{CardId, SeatIndex};
use crate::event::Pivot;
use crate::ids::{DeckId, PlayerId, PrintingId, RoomId};
use crate::protocol::LobbySettings;
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A card as one observer sees it. `printing` is only present when the
/// observer is in the card's visibility set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: CardId,
    pub x: f64,
    pub y: f64,
    pub pivot: Pivot,
    pub counter: i32,
    pub transformed: bool,
    pub flipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printing: Option<PrintingId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat: SeatIndex,
    pub player: PlayerId,
    pub life: i32,
    pub poison: i32,
    pub active: bool,
    pub zones: BTreeMap<Zone, Vec<CardView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room: RoomId,
    pub seats: Vec<SeatView>,
    pub spectators: Vec<PlayerId>,
    pub turn: SeatIndex,
}

/// A single-use opaque handle onto a hidden-zone card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCardView {
    pub id: u32,
    pub zone: Zone,
    pub printing: PrintingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCardView {
    pub id: u32,
    pub printing: PrintingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackView {
    pub id: u32,
    pub cards: Vec<DraftCardView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub printing: PrintingId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrantView {
    pub player: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<DeckId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyView {
    pub room: RoomId,
    pub name: String,
    pub owner: PlayerId,
    pub settings: LobbySettings,
    pub entrants: Vec<EntrantView>,
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStage {
    Lobby,
    Active,
}

/// Entry in the public room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room: RoomId,
    pub name: String,
    pub settings: LobbySettings,
    pub stage: RoomStage,
    pub occupied: usize,
}
