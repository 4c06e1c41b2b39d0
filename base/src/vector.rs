//! Input and output pin vectors.
//!
//! Both vectors are carried as raw 32-bit words; the configured
//! geometry decides how many of the low bits are meaningful, and the
//! engine masks its results accordingly.  Keeping the types distinct
//! stops an input word from being wired somewhere an output word was
//! wanted.
use std::fmt::{Debug, Display, Error, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

/// The external input bits sampled by the engine on each clock.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct InputVector(u32);

impl InputVector {
    pub const ZERO: InputVector = InputVector(0);

    pub const fn new(bits: u32) -> InputVector {
        InputVector(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Fetch one input bit.  Positions at or above 32 read as zero.
    pub fn bit(&self, position: u8) -> bool {
        if position >= 32 {
            false
        } else {
            self.0 >> position & 1 == 1
        }
    }
}

impl From<u32> for InputVector {
    fn from(bits: u32) -> InputVector {
        InputVector(bits)
    }
}

impl From<InputVector> for u32 {
    fn from(v: InputVector) -> u32 {
        v.0
    }
}

impl Display for InputVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        // Pin vectors read most naturally in hex.
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for InputVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:#010x}", self.0)
    }
}

/// The output bits the engine drives.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct OutputVector(u32);

impl OutputVector {
    pub const ZERO: OutputVector = OutputVector(0);

    pub const fn new(bits: u32) -> OutputVector {
        OutputVector(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub fn bit(&self, position: u8) -> bool {
        if position >= 32 {
            false
        } else {
            self.0 >> position & 1 == 1
        }
    }

    pub const fn masked(&self, mask: u32) -> OutputVector {
        OutputVector(self.0 & mask)
    }
}

impl From<u32> for OutputVector {
    fn from(bits: u32) -> OutputVector {
        OutputVector(bits)
    }
}

impl From<OutputVector> for u32 {
    fn from(v: OutputVector) -> u32 {
        v.0
    }
}

impl Display for OutputVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for OutputVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:#010x}", self.0)
    }
}
