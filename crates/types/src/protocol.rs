//! Wire messages between clients and the server.
//!
//! Both directions are JSON objects tagged by a `type` field. Inbound
//! messages that fail to parse are dropped by the connection layer.

use crate::card_id::{CardId, SeatIndex};
use crate::error::ProtocolError;
use crate::event::{AttributeChange, CardAttributeKind, DiffEvent, PlayerAttributeKind};
use crate::ids::{DeckId, PlayerId, PrintingId, RoomId};
use crate::view::{GameView, LobbyView, PackView, PoolEntry, RoomSummary, VirtualCardView};
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn end_index() -> i64 {
    -1
}

fn one() -> u32 {
    1
}

/// Printed card metadata from the card database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub id: PrintingId,
    pub name: String,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: String,
    /// Token definitions this card can create.
    #[serde(default)]
    pub related_tokens: Vec<PrintingId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub printing: PrintingId,
    pub count: u32,
}

/// A persisted deck as returned by the deck store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub owner: PlayerId,
    pub name: String,
    pub main: Vec<DeckEntry>,
    #[serde(default)]
    pub side: Vec<DeckEntry>,
}

/// Declared shape of a room at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LobbySettings {
    /// Head-to-head (or multiplayer) play with constructed decks.
    Game { seats: u8 },
    /// Booster draft; one pack round per set code, `bots` seats simulated.
    Draft { seats: u8, sets: Vec<String>, bots: u8 },
}

impl LobbySettings {
    pub fn seats(&self) -> u8 {
        match self {
            LobbySettings::Game { seats } | LobbySettings::Draft { seats, .. } => *seats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAction {
    Mulligan,
    Scoop,
    Shuffle,
    UntapAll,
    EndTurn,
}

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    DrawCard {
        #[serde(default = "one")]
        count: u32,
    },
    SpecialAction {
        action: SpecialAction,
    },
    ChangeCardAttribute {
        card: CardId,
        attribute: CardAttributeKind,
        new_value: Value,
    },
    ChangePlayerAttribute {
        attribute: PlayerAttributeKind,
        new_value: Value,
    },
    PlayCard {
        card: CardId,
        x: f64,
        y: f64,
        #[serde(default)]
        face_down: bool,
    },
    ChangePosition {
        card: CardId,
        x: f64,
        y: f64,
    },
    ChangeZone {
        card: CardId,
        zone: Zone,
        #[serde(default = "end_index")]
        index: i64,
        #[serde(default)]
        face_down: bool,
    },
    ChangeIndex {
        card: CardId,
        index: i64,
    },
    ChangeZones {
        cards: Vec<CardId>,
        zone: Zone,
        #[serde(default = "end_index")]
        index: i64,
        #[serde(default)]
        face_down: bool,
    },
    MoveCardVirtual {
        ids: Vec<u32>,
        zone: Zone,
        #[serde(default = "end_index")]
        index: i64,
    },
    RequestVirtualIds {
        #[serde(default)]
        zone: Option<Zone>,
    },
    RevealCard {
        card: CardId,
        #[serde(default)]
        reveal_to: Option<PlayerId>,
        reveal: bool,
    },
    Scry {
        count: u32,
    },
    CreateToken {
        id: PrintingId,
    },
    CreateCard {
        id: PrintingId,
    },
    CreateClone {
        id: PrintingId,
        #[serde(default)]
        attributes: Vec<AttributeChange>,
    },
    CloneCard {
        id: CardId,
        #[serde(default)]
        attributes: Vec<AttributeChange>,
    },
    Sideboard {
        main: Vec<CardId>,
        side: Vec<CardId>,
    },
    Pick {
        card: u32,
    },
    MoveDraftZone {
        card: PrintingId,
        sideboard: bool,
    },
    CreateLobby {
        name: String,
        settings: LobbySettings,
    },
    JoinLobby {
        room: RoomId,
    },
    ChooseDeck {
        deck: DeckId,
    },
    StartGame,
    LeaveRoom,
    Spectate {
        room: RoomId,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::DrawCard { .. } => "draw_card",
            ClientMessage::SpecialAction { .. } => "special_action",
            ClientMessage::ChangeCardAttribute { .. } => "change_card_attribute",
            ClientMessage::ChangePlayerAttribute { .. } => "change_player_attribute",
            ClientMessage::PlayCard { .. } => "play_card",
            ClientMessage::ChangePosition { .. } => "change_position",
            ClientMessage::ChangeZone { .. } => "change_zone",
            ClientMessage::ChangeIndex { .. } => "change_index",
            ClientMessage::ChangeZones { .. } => "change_zones",
            ClientMessage::MoveCardVirtual { .. } => "move_card_virtual",
            ClientMessage::RequestVirtualIds { .. } => "request_virtual_ids",
            ClientMessage::RevealCard { .. } => "reveal_card",
            ClientMessage::Scry { .. } => "scry",
            ClientMessage::CreateToken { .. } => "create_token",
            ClientMessage::CreateCard { .. } => "create_card",
            ClientMessage::CreateClone { .. } => "create_clone",
            ClientMessage::CloneCard { .. } => "clone_card",
            ClientMessage::Sideboard { .. } => "sideboard",
            ClientMessage::Pick { .. } => "pick",
            ClientMessage::MoveDraftZone { .. } => "move_draft_zone",
            ClientMessage::CreateLobby { .. } => "create_lobby",
            ClientMessage::JoinLobby { .. } => "join_lobby",
            ClientMessage::ChooseDeck { .. } => "choose_deck",
            ClientMessage::StartGame => "start_game",
            ClientMessage::LeaveRoom => "leave_room",
            ClientMessage::Spectate { .. } => "spectate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DraftUpdate {
    ReceivePack { pack: PackView },
    PackQueue { queues: Vec<usize> },
    EndDraft { deck: Option<DeckId> },
    MoveCard { card: PrintingId, sideboard: bool },
    /// Full draft state for one seat, sent on (re)connect.
    State {
        seat: SeatIndex,
        pack: Option<PackView>,
        main: Vec<PoolEntry>,
        side: Vec<PoolEntry>,
        queues: Vec<usize>,
    },
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Always the first frame on a connection.
    Identity { player: PlayerId },
    BoardUpdate { events: Vec<DiffEvent> },
    OracleCardInfo {
        reveals: BTreeMap<CardId, PrintingId>,
        card_info: BTreeMap<PrintingId, CardInfo>,
        hides: Vec<CardId>,
    },
    GameLog { owner: Option<PlayerId>, message: String },
    GameState { state: GameView },
    VirtualIds { cards: Vec<VirtualCardView> },
    DraftUpdate { update: DraftUpdate },
    LobbyState { lobby: LobbyView },
    RoomCreated { room: RoomSummary },
    RoomRemoved { room: RoomId },
    RedirectHome,
}
