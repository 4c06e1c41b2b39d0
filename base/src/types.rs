//! Small value types used throughout the engine: state indexes and
//! shard identifiers.
use std::fmt::{Debug, Display, Error, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

/// A state index selects one row of the state table.  Table
/// capacities never exceed 256 rows, so the raw value always fits in
/// a byte; arithmetic on indexes wraps modulo the capacity of the
/// shard performing it, which keeps every bit pattern legal.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StateIndex(u8);

impl StateIndex {
    pub const ZERO: StateIndex = StateIndex(0);

    pub const fn new(value: u8) -> StateIndex {
        StateIndex(value)
    }

    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Computes the index following the current index within a table
    /// of `capacity` rows.  Incrementing at the last row wraps to
    /// row 0.
    pub fn successor(&self, capacity: u16) -> StateIndex {
        let next = (u16::from(self.0) + 1) % capacity;
        StateIndex(next as u8)
    }

    /// Reduce an arbitrary index value into the range of a table of
    /// `capacity` rows.  Jump targets are reduced this way when they
    /// are taken.
    pub fn reduce(&self, capacity: u16) -> StateIndex {
        StateIndex((u16::from(self.0) % capacity) as u8)
    }
}

#[test]
fn test_successor_wraps() {
    assert_eq!(StateIndex::new(6).successor(8), StateIndex::new(7));
    assert_eq!(StateIndex::new(7).successor(8), StateIndex::ZERO);
    assert_eq!(StateIndex::new(255).successor(256), StateIndex::ZERO);
}

#[test]
fn test_reduce() {
    assert_eq!(StateIndex::new(0o17).reduce(8), StateIndex::new(7));
    assert_eq!(StateIndex::new(5).reduce(8), StateIndex::new(5));
}

impl From<u8> for StateIndex {
    fn from(value: u8) -> StateIndex {
        StateIndex(value)
    }
}

impl From<StateIndex> for u8 {
    fn from(index: StateIndex) -> u8 {
        index.0
    }
}

impl From<StateIndex> for u32 {
    fn from(index: StateIndex) -> u32 {
        u32::from(index.0)
    }
}

impl From<StateIndex> for usize {
    fn from(index: StateIndex) -> usize {
        usize::from(index.0)
    }
}

impl PartialEq<u8> for StateIndex {
    fn eq(&self, other: &u8) -> bool {
        self.0.eq(other)
    }
}

impl Display for StateIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

impl Debug for StateIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

impl Default for StateIndex {
    fn default() -> StateIndex {
        StateIndex::ZERO
    }
}

/// Identifies one of the two shards.  When fracture is off only shard
/// zero executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ShardId {
    Zero = 0,
    One = 1,
}

impl ShardId {
    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub const fn both() -> [ShardId; 2] {
        [ShardId::Zero, ShardId::One]
    }
}

impl From<ShardId> for usize {
    fn from(shard: ShardId) -> usize {
        shard.index()
    }
}

impl Display for ShardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            ShardId::Zero => f.write_str("shard 0"),
            ShardId::One => f.write_str("shard 1"),
        }
    }
}
