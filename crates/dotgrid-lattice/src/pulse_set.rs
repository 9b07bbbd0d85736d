//! Fixed-capacity set of pulsing point indices.

use core::fmt;

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::LatticeError;

const WORDS: usize = 3;

/// Highest number of points a [`PulseSet`] can address.
pub const CAPACITY: usize = WORDS * 64;

/// Largest number of indices drawn for one pulse batch.
pub const MAX_BATCH: usize = 3;

/// Set of flat point indices currently pulsing.
///
/// Backed by a bitset, so inserting a duplicate is a no-op and the set never allocates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PulseSet {
    bits: [u64; WORDS],
}

impl PulseSet {
    /// Construct an empty set.
    pub const fn new() -> Self {
        PulseSet { bits: [0; WORDS] }
    }

    /// Draw a random batch for a lattice of `point_count` points.
    ///
    /// Draws a count uniformly from `1..=MAX_BATCH`, then that many indices
    /// uniformly from `0..point_count`. Repeated draws collapse, so the batch
    /// may hold fewer indices than the drawn count.
    ///
    /// # Errors
    ///
    /// Returns `Err(LatticeError::EmptyGrid)` if `point_count` is zero and
    /// `Err(LatticeError::IndexOutOfBounds)` if it exceeds [`CAPACITY`].
    pub fn random<R: Rng + ?Sized>(rng: &mut R, point_count: usize) -> Result<Self, LatticeError> {
        if point_count == 0 {
            return Err(LatticeError::EmptyGrid("no points to pulse"));
        }
        if point_count > CAPACITY {
            return Err(LatticeError::IndexOutOfBounds("lattice larger than pulse set capacity"));
        }
        let mut set = PulseSet::new();
        let count = rng.random_range(1..=MAX_BATCH);
        for _ in 0..count {
            set.insert(rng.random_range(0..point_count), point_count)?;
        }
        Ok(set)
    }

    /// Insert `index`, checked against the current lattice size `bound`.
    ///
    /// Returns `Ok(true)` if the index was not already present.
    ///
    /// # Errors
    ///
    /// Returns `Err(LatticeError::IndexOutOfBounds)` if `index >= bound` or `index >= CAPACITY`.
    pub fn insert(&mut self, index: usize, bound: usize) -> Result<bool, LatticeError> {
        if index >= bound || index >= CAPACITY {
            return Err(LatticeError::IndexOutOfBounds("pulse index outside the lattice"));
        }
        let (word, mask) = (index / 64, 1u64 << (index % 64));
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        Ok(fresh)
    }

    /// Whether `index` is pulsing.
    pub fn contains(&self, index: usize) -> bool {
        index < CAPACITY && self.bits[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Remove every index.
    pub fn clear(&mut self) {
        self.bits = [0; WORDS];
    }

    /// Whether no index is pulsing.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Number of pulsing indices.
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether every index is below `bound`.
    pub fn fits_within(&self, bound: usize) -> bool {
        self.iter().all(|i| i < bound)
    }

    /// Iterate indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CAPACITY).filter(move |i| self.contains(*i))
    }
}

impl fmt::Display for PulseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, index) in self.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}")
    }
}
