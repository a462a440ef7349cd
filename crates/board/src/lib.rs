//! Board state for a running game.
//!
//! [`BoardManager`] owns one seat's zones, [`Player`] adds life totals and
//! turn state, and [`Game`] ties the seats of a room together and applies
//! client actions. Nothing in this crate performs I/O; every operation
//! returns the diff events it produced and the caller decides who sees what.

pub mod board;
pub mod card;
pub mod game;
pub mod observers;
pub mod player;

pub use board::{BoardManager, VirtualCard, ZoneTransition, CLONE_OFFSET};
pub use card::{BoardCard, Origin};
pub use game::{Dispatch, Game, GameSettings, SeatSetup};
pub use observers::Observers;
pub use player::Player;
