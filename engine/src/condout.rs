//! The conditional output unit.
//!
//! Each conditional output k has two input pins wired to it at
//! construction time.  Those two pins address the 4-entry LUT held
//! in the current row's k-th conditional slot, and the looked-up bit
//! drives the output continuously, retargeted every cycle as the row
//! or the pins change.  Routing onto the 32-bit output bus is by
//! scatter: conditional bit k lands on the k-th set bit of the
//! shard's conditional mask, low bit upward.
use base::prelude::*;

/// Evaluate every conditional output of `row` against `inputs`,
/// packed low bit first.  Missing LUT slots read as zero.
pub(crate) fn conditional_bits(row: &Stew, inputs: InputVector, geometry: &Geometry) -> u8 {
    let mut bits = 0;
    for k in 0..geometry.cond_outputs() {
        let (pin_a, pin_b) = geometry.cond_wiring(k);
        let lut = row
            .cond_luts
            .get(usize::from(k))
            .copied()
            .unwrap_or_default();
        if lut.lookup(inputs.bit(pin_b), inputs.bit(pin_a)) {
            bits |= 1 << k;
        }
    }
    bits
}

/// Scatter `bits` onto the set positions of `mask`, bit k of `bits`
/// landing on the k-th set mask bit.  Set mask bits beyond the
/// number of conditional outputs take zeroes; an all-zero mask parks
/// every conditional bit.
pub(crate) fn scatter(bits: u8, mask: u32) -> u32 {
    let mut out = 0;
    let mut k = 0;
    for position in 0..32 {
        if mask >> position & 1 == 1 {
            if k < 8 && bits >> k & 1 == 1 {
                out |= 1 << position;
            }
            k += 1;
        }
    }
    out
}
