//! Diff events and the attributes they carry.
//!
//! A diff event is the minimal description of one state change. Rooms
//! broadcast ordered lists of them instead of full state; every subscriber
//! receives the same events, while printed identities travel separately and
//! only to the observers a `reveal_card` event names.

use crate::card_id::{CardId, SeatIndex};
use crate::error::ProtocolError;
use crate::ids::{PlayerId, PrintingId};
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rotation state of a card on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pivot {
    #[default]
    Untapped,
    Tapped,
    UpsideDown,
    LeftTapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAttributeKind {
    Pivot,
    Counter,
    Transformed,
    Flipped,
}

/// A typed card attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAttribute {
    Pivot(Pivot),
    Counter(i32),
    Transformed(bool),
    Flipped(bool),
}

impl CardAttribute {
    pub fn kind(&self) -> CardAttributeKind {
        match self {
            CardAttribute::Pivot(_) => CardAttributeKind::Pivot,
            CardAttribute::Counter(_) => CardAttributeKind::Counter,
            CardAttribute::Transformed(_) => CardAttributeKind::Transformed,
            CardAttribute::Flipped(_) => CardAttributeKind::Flipped,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            CardAttribute::Pivot(pivot) => serde_json::to_value(pivot).unwrap_or(Value::Null),
            CardAttribute::Counter(n) => Value::from(*n),
            CardAttribute::Transformed(b) | CardAttribute::Flipped(b) => Value::Bool(*b),
        }
    }

    /// Parses the `{attribute, newValue}` pair of an inbound message.
    pub fn from_parts(kind: CardAttributeKind, value: &Value) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidAttributeValue {
            attribute: format!("{kind:?}"),
            value: value.to_string(),
        };
        match kind {
            CardAttributeKind::Pivot => serde_json::from_value(value.clone())
                .map(CardAttribute::Pivot)
                .map_err(|_| invalid()),
            CardAttributeKind::Counter => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(CardAttribute::Counter)
                .ok_or_else(invalid),
            CardAttributeKind::Transformed => {
                value.as_bool().map(CardAttribute::Transformed).ok_or_else(invalid)
            }
            CardAttributeKind::Flipped => value.as_bool().map(CardAttribute::Flipped).ok_or_else(invalid),
        }
    }
}

/// An untyped `{attribute, newValue}` pair as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeChange {
    pub attribute: CardAttributeKind,
    pub new_value: Value,
}

impl AttributeChange {
    pub fn parse(&self) -> Result<CardAttribute, ProtocolError> {
        CardAttribute::from_parts(self.attribute, &self.new_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAttributeKind {
    Life,
    Poison,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAttribute {
    Life(i32),
    Poison(i32),
    Active(bool),
}

impl PlayerAttribute {
    pub fn kind(&self) -> PlayerAttributeKind {
        match self {
            PlayerAttribute::Life(_) => PlayerAttributeKind::Life,
            PlayerAttribute::Poison(_) => PlayerAttributeKind::Poison,
            PlayerAttribute::Active(_) => PlayerAttributeKind::Active,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            PlayerAttribute::Life(n) | PlayerAttribute::Poison(n) => Value::from(*n),
            PlayerAttribute::Active(b) => Value::Bool(*b),
        }
    }

    /// Parses an inbound player attribute change. `active` is server-owned
    /// and cannot be set by clients.
    pub fn from_client(kind: PlayerAttributeKind, value: &Value) -> Result<Self, ProtocolError> {
        let number = value.as_i64().and_then(|n| i32::try_from(n).ok());
        match (kind, number) {
            (PlayerAttributeKind::Life, Some(n)) => Ok(PlayerAttribute::Life(n)),
            (PlayerAttributeKind::Poison, Some(n)) => Ok(PlayerAttribute::Poison(n)),
            _ => Err(ProtocolError::InvalidAttributeValue {
                attribute: format!("{kind:?}"),
                value: value.to_string(),
            }),
        }
    }
}

/// One observable state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DiffEvent {
    /// `card` left its zone and now lives as `new_card` at `index` of `zone`.
    ChangeZone {
        card: CardId,
        new_card: CardId,
        zone: Zone,
        index: usize,
    },
    ChangeIndex {
        card: CardId,
        index: usize,
    },
    ChangePosition {
        card: CardId,
        x: f64,
        y: f64,
    },
    /// Names the observers newly entitled to the card's printed identity.
    /// The identity itself never goes out with the event.
    RevealCard {
        card: CardId,
        players: Vec<PlayerId>,
        #[serde(skip)]
        printing: PrintingId,
    },
    HideCard {
        card: CardId,
        players: Vec<PlayerId>,
    },
    ChangeAttribute {
        card: CardId,
        attribute: CardAttributeKind,
        value: Value,
    },
    ChangePlayerAttribute {
        seat: SeatIndex,
        attribute: PlayerAttributeKind,
        value: Value,
    },
    ShuffleDeck {
        seat: SeatIndex,
        cards: Vec<CardId>,
    },
    ScoopDeck {
        seat: SeatIndex,
        library: Vec<CardId>,
        sideboard: Vec<CardId>,
    },
    CreateCard {
        card: CardId,
        seat: SeatIndex,
        zone: Zone,
        x: f64,
        y: f64,
    },
    DestroyCard {
        card: CardId,
    },
    SpectatorJoin {
        player: PlayerId,
    },
    SpectatorLeave {
        player: PlayerId,
    },
}

impl DiffEvent {
    pub fn change_attribute(card: CardId, attribute: CardAttribute) -> Self {
        DiffEvent::ChangeAttribute { card, attribute: attribute.kind(), value: attribute.value() }
    }

    pub fn change_player_attribute(seat: SeatIndex, attribute: PlayerAttribute) -> Self {
        DiffEvent::ChangePlayerAttribute { seat, attribute: attribute.kind(), value: attribute.value() }
    }

    /// Whether this reveal names `player`.
    pub fn reveals_to(&self, player: PlayerId) -> bool {
        matches!(self, DiffEvent::RevealCard { players, .. } if players.contains(&player))
    }

    pub fn hides_from(&self, player: PlayerId) -> bool {
        matches!(self, DiffEvent::HideCard { players, .. } if players.contains(&player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reveal_never_serializes_printing() {
        let event = DiffEvent::RevealCard {
            card: CardId(0x1234),
            players: vec![],
            printing: PrintingId::new("secret-printing"),
        };
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("secret-printing"));
        assert!(text.contains("\"type\":\"reveal_card\""));
    }

    #[test]
    fn test_change_zone_field_names() {
        let event = DiffEvent::ChangeZone {
            card: CardId(1),
            new_card: CardId(2),
            zone: Zone::Graveyard,
            index: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["newCard"], json!(2));
        assert_eq!(value["zone"], json!("graveyard"));
    }

    #[test]
    fn test_card_attribute_parsing() {
        assert_eq!(
            CardAttribute::from_parts(CardAttributeKind::Pivot, &json!("left_tapped")).unwrap(),
            CardAttribute::Pivot(Pivot::LeftTapped)
        );
        assert_eq!(
            CardAttribute::from_parts(CardAttributeKind::Counter, &json!(-3)).unwrap(),
            CardAttribute::Counter(-3)
        );
        assert!(CardAttribute::from_parts(CardAttributeKind::Flipped, &json!("yes")).is_err());
        assert!(CardAttribute::from_parts(CardAttributeKind::Counter, &json!(1u64 << 40)).is_err());
    }

    #[test]
    fn test_clients_cannot_set_active() {
        assert!(PlayerAttribute::from_client(PlayerAttributeKind::Active, &json!(true)).is_err());
        assert_eq!(
            PlayerAttribute::from_client(PlayerAttributeKind::Life, &json!(17)).unwrap(),
            PlayerAttribute::Life(17)
        );
    }
}
