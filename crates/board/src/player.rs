use crate::board::BoardManager;
use tabletop_types::view::SeatView;
use tabletop_types::{DiffEvent, PlayerAttribute, PlayerId, SeatIndex};

/// A seated participant and the board they own.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub seat: SeatIndex,
    pub life: i32,
    pub poison: i32,
    pub active: bool,
    pub board: BoardManager,
}

impl Player {
    pub fn new(id: PlayerId, seat: SeatIndex, life: i32, board: BoardManager) -> Self {
        Self { id, seat, life, poison: 0, active: false, board }
    }

    pub fn attribute(&self, attribute: PlayerAttribute) -> PlayerAttribute {
        match attribute {
            PlayerAttribute::Life(_) => PlayerAttribute::Life(self.life),
            PlayerAttribute::Poison(_) => PlayerAttribute::Poison(self.poison),
            PlayerAttribute::Active(_) => PlayerAttribute::Active(self.active),
        }
    }

    /// Stores `attribute`, emitting an event only when the value changed.
    pub fn set_attribute(&mut self, attribute: PlayerAttribute) -> Vec<DiffEvent> {
        if self.attribute(attribute) == attribute {
            return Vec::new();
        }
        match attribute {
            PlayerAttribute::Life(n) => self.life = n,
            PlayerAttribute::Poison(n) => self.poison = n,
            PlayerAttribute::Active(b) => self.active = b,
        }
        vec![DiffEvent::change_player_attribute(self.seat, attribute)]
    }

    pub fn view_for(&self, observer: PlayerId) -> SeatView {
        SeatView {
            seat: self.seat,
            player: self.id,
            life: self.life,
            poison: self.poison,
            active: self.active,
            zones: self.board.view_for(observer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabletop_types::{CardIdAllocator, GameRng};

    #[test]
    fn test_set_attribute_is_silent_when_unchanged() {
        let id = PlayerId::new();
        let board = BoardManager::new(2, id, Arc::new(CardIdAllocator::new()), GameRng::new(1));
        let mut player = Player::new(id, 2, 20, board);
        assert!(player.set_attribute(PlayerAttribute::Life(20)).is_empty());
        assert_eq!(
            player.set_attribute(PlayerAttribute::Life(17)),
            vec![DiffEvent::change_player_attribute(2, PlayerAttribute::Life(17))]
        );
        assert_eq!(player.view_for(id).life, 17);
    }
}
