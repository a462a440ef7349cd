//! Board zones.

use serde::{Deserialize, Serialize};

/// A named region holding an ordered list of cards for one seat.
///
/// The discriminant is the 4-bit zone field of a [`CardId`](crate::CardId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Zone {
    Library = 0,
    Hand = 1,
    Battlefield = 2,
    Graveyard = 3,
    Exile = 4,
    FaceDown = 5,
    Sideboard = 6,
}

impl Zone {
    pub const COUNT: usize = 7;

    pub const ALL: [Zone; Zone::COUNT] = [
        Zone::Library,
        Zone::Hand,
        Zone::Battlefield,
        Zone::Graveyard,
        Zone::Exile,
        Zone::FaceDown,
        Zone::Sideboard,
    ];

    /// Public zones reveal entering cards to every subscriber.
    pub fn is_public(self) -> bool {
        matches!(self, Zone::Battlefield | Zone::Graveyard | Zone::Exile)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Zone> {
        Zone::ALL.get(code as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_zones() {
        let public: Vec<Zone> = Zone::ALL.into_iter().filter(|z| z.is_public()).collect();
        assert_eq!(public, vec![Zone::Battlefield, Zone::Graveyard, Zone::Exile]);
    }

    #[test]
    fn test_codes_are_dense() {
        for (i, zone) in Zone::ALL.iter().enumerate() {
            assert_eq!(zone.code() as usize, i);
            assert_eq!(Zone::from_code(i as u8), Some(*zone));
        }
        assert_eq!(Zone::from_code(7), None);
        assert_eq!(Zone::from_code(15), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Zone::FaceDown).unwrap(), "\"face_down\"");
        let zone: Zone = serde_json::from_str("\"graveyard\"").unwrap();
        assert_eq!(zone, Zone::Graveyard);
    }
}
