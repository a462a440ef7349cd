//! Bit-packed card identifiers.
//!
//! A [`CardId`] is laid out as `{sequence:24}{zone:4}{seat:4}`, most
//! significant bits first. The zone and seat fields let a room route an
//! inbound reference to the right board and zone list without a lookup
//! table. The sequence comes from a room-wide [`CardIdAllocator`] and is
//! never reused, so an identifier dies the moment its card changes zone.

use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

pub const SEQUENCE_BITS: u32 = 24;
pub const ZONE_BITS: u32 = 4;
pub const SEAT_BITS: u32 = 4;

/// Largest sequence number an identifier can carry.
pub const MAX_SEQUENCE: u32 = (1 << SEQUENCE_BITS) - 1;

/// Seats addressable by the 4-bit seat field.
pub const MAX_SEATS: usize = 1 << SEAT_BITS;

/// Index of a seat inside a room.
pub type SeatIndex = u8;

const ZONE_MASK: u32 = (1 << ZONE_BITS) - 1;
const SEAT_MASK: u32 = (1 << SEAT_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl CardId {
    /// Packs the three fields. Returns `None` when a field does not fit.
    pub fn pack(sequence: u32, zone: Zone, seat: SeatIndex) -> Option<CardId> {
        if sequence > MAX_SEQUENCE || seat as usize >= MAX_SEATS {
            return None;
        }
        Some(CardId(
            (sequence << (ZONE_BITS + SEAT_BITS)) | ((zone.code() as u32) << SEAT_BITS) | seat as u32,
        ))
    }

    /// Inverse of [`CardId::pack`] for the routing fields.
    ///
    /// Returns `None` for identifiers whose zone field names no zone; callers
    /// treat that the same as a card that no longer exists.
    pub fn decode(self) -> Option<(Zone, SeatIndex)> {
        Some((self.zone()?, self.seat()))
    }

    pub fn zone(self) -> Option<Zone> {
        Zone::from_code(((self.0 >> SEAT_BITS) & ZONE_MASK) as u8)
    }

    pub fn seat(self) -> SeatIndex {
        (self.0 & SEAT_MASK) as SeatIndex
    }

    pub fn sequence(self) -> u32 {
        self.0 >> (ZONE_BITS + SEAT_BITS)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room-wide source of card identifiers.
///
/// Shared by every board in a room behind an `Arc`; concurrent callers
/// always receive distinct sequence numbers.
#[derive(Debug)]
pub struct CardIdAllocator {
    next: AtomicU32,
}

impl Default for CardIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl CardIdAllocator {
    pub fn new() -> Self {
        // Sequence 0 is never issued, so a zeroed identifier is always dead.
        Self { next: AtomicU32::new(1) }
    }

    /// Issues a fresh identifier for a card entering `zone` on `seat`.
    ///
    /// Returns `None` once the 24-bit sequence space is exhausted or when the
    /// seat does not fit the seat field.
    pub fn encode(&self, zone: Zone, seat: SeatIndex) -> Option<CardId> {
        if seat as usize >= MAX_SEATS {
            return None;
        }
        let sequence = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n <= MAX_SEQUENCE).then_some(n + 1)
            })
            .ok()?;
        CardId::pack(sequence, zone, seat)
    }

    /// Identifiers that can still be issued.
    pub fn remaining(&self) -> u32 {
        (MAX_SEQUENCE + 1).saturating_sub(self.next.load(Ordering::SeqCst))
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::SeqCst).saturating_sub(1)
    }
}
