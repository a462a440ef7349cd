//! Booster drafting.
//!
//! [`SetInfo`] generates packs through a [`WeightedSampler`]; a [`Draft`]
//! deals them round by round and passes them between human and bot
//! [`DraftAgent`]s until every pack is empty. Picks land in a [`DraftPool`]
//! per seat.

pub mod bot;
pub mod draft;
pub mod error;
pub mod pack;
pub mod pool;
pub mod sampler;
pub mod set_info;

pub use bot::{Bot, CardRating, ColorSet, DraftAgent, HeuristicBot, Ratings};
pub use draft::{Draft, DraftNotice};
pub use error::DraftError;
pub use pack::{DraftCard, Pack};
pub use pool::DraftPool;
pub use sampler::WeightedSampler;
pub use set_info::{BoosterVariant, PackCard, SetInfo, Sheet};
