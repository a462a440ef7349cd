//! Weighted random choice for booster generation.

use crate::error::DraftError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// A weight table over items of type `T`.
///
/// Zero-weight entries are kept but never drawn.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    entries: Vec<(T, f64)>,
}

impl<T: Clone> WeightedSampler<T> {
    pub fn new(entries: Vec<(T, f64)>) -> Result<Self, DraftError> {
        if let Some((_, bad)) = entries.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(DraftError::InvalidWeights(format!("weight {bad} is not a finite non-negative number")));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draws one item, or `None` when every weight is zero.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<T> {
        let index = WeightedIndex::new(self.entries.iter().map(|(_, w)| *w)).ok()?;
        Some(self.entries[index.sample(rng)].0.clone())
    }

    /// Draws `count` items. Without replacement, an item is drawn at most
    /// once and fewer than `count` items come back when the table runs dry.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, count: usize, with_replacement: bool) -> Vec<T> {
        if with_replacement {
            let Ok(index) = WeightedIndex::new(self.entries.iter().map(|(_, w)| *w)) else {
                return Vec::new();
            };
            return (0..count).map(|_| self.entries[index.sample(rng)].0.clone()).collect();
        }

        let mut remaining: Vec<&(T, f64)> = self.entries.iter().filter(|(_, w)| *w > 0.0).collect();
        let mut picked = Vec::with_capacity(count.min(remaining.len()));
        while picked.len() < count {
            let Ok(index) = WeightedIndex::new(remaining.iter().map(|(_, w)| *w)) else {
                break;
            };
            let (item, _) = remaining.swap_remove(index.sample(rng));
            picked.push(item.clone());
        }
        picked
    }
}
