//! Packed and structured representations of state execution words.
//!
//! One STEW (state execution word) holds everything the engine needs
//! to execute one state: the output vector to drive while sitting in
//! the state, an auto-increment flag, two compare lanes that can jump
//! elsewhere, and the lookup tables feeding the conditional outputs.
//!
//! On the wire a STEW is a packed little-endian bit image split
//! across a pair of 32-bit loader windows.  For the reference
//! geometry (8 inputs, 8 outputs, 2 conditional outputs, 16 total
//! rows) the image looks like this, least significant field first:
//!
//! | Field            | Bits  | Width |
//! |------------------|-------|-------|
//! | static output    | 0-7   | 8     |
//! | auto-increment   | 8     | 1     |
//! | lane 0 select A  | 9-11  | 3     |
//! | lane 0 select B  | 12-14 | 3     |
//! | lane 0 LUT       | 15-18 | 4     |
//! | lane 0 target    | 19-22 | 4     |
//! | lane 0 jump out  | 23-30 | 8     |
//! | lane 1 select A  | 31-33 | 3     |
//! | lane 1 select B  | 34-36 | 3     |
//! | lane 1 LUT       | 37-40 | 4     |
//! | lane 1 target    | 41-44 | 4     |
//! | lane 1 jump out  | 45-52 | 8     |
//! | conditional LUT 0| 53-56 | 4     |
//! | conditional LUT 1| 57-60 | 4     |
//!
//! Field positions move with the geometry but the ordering is fixed;
//! `RowLayout` computes the positions once so that packing and
//! unpacking agree with whatever an offline compiler produced for the
//! same geometry.
//!
//! Every bit pattern is a legal row.  A row full of garbage executes
//! as garbage, it never faults.
use std::fmt::{self, Debug, Formatter};

#[cfg(test)]
use test_strategy::proptest;

#[cfg(test)]
use super::geometry::{MAX_COND_OUTPUTS, MAX_PINS, MAX_TOTAL_DEPTH};

use super::geometry::Geometry;
use super::rowbits::Field;
use super::types::StateIndex;
use super::vector::OutputVector;

/// A four-entry truth table over two selected bits.  Entry index is
/// `bit1:bit0`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Lut4(u8);

impl Lut4 {
    pub const fn new(entries: u8) -> Lut4 {
        Lut4(entries & 0x0f)
    }

    pub const fn entries(&self) -> u8 {
        self.0
    }

    pub fn lookup(&self, bit1: bool, bit0: bool) -> bool {
        let index = (u8::from(bit1) << 1) | u8::from(bit0);
        self.0 >> index & 1 == 1
    }
}

impl Debug for Lut4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:04b}", self.0)
    }
}

#[test]
fn test_lut_lookup() {
    // Match exactly when both selected bits are set.
    let both = Lut4::new(0b1000);
    assert!(both.lookup(true, true));
    assert!(!both.lookup(true, false));
    assert!(!both.lookup(false, true));
    assert!(!both.lookup(false, false));

    // XOR of the selected bits.
    let xor = Lut4::new(0b0110);
    assert!(xor.lookup(true, false));
    assert!(xor.lookup(false, true));
    assert!(!xor.lookup(true, true));
}

/// One compare lane: two input-mux selectors, a truth table over the
/// selected bits, and the jump the lane takes when the table matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompareLane {
    pub select_a: u8,
    pub select_b: u8,
    pub lut: Lut4,
    pub target: StateIndex,
    pub jump_out: OutputVector,
}

/// A state execution word broken down into its component fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stew {
    pub static_out: OutputVector,
    pub auto_increment: bool,
    pub lanes: [CompareLane; 2],
    pub cond_luts: Vec<Lut4>,
}

/// The packed bit image of one STEW, as staged through the loader
/// windows.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RowImage(u64);

impl RowImage {
    pub const ZERO: RowImage = RowImage(0);

    pub const fn new(bits: u64) -> RowImage {
        RowImage(bits)
    }

    pub const fn from_words(low: u32, high: u32) -> RowImage {
        RowImage((high as u64) << 32 | low as u64)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn low_word(&self) -> u32 {
        self.0 as u32
    }

    pub const fn high_word(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl From<u64> for RowImage {
    fn from(bits: u64) -> RowImage {
        RowImage(bits)
    }
}

impl From<RowImage> for u64 {
    fn from(image: RowImage) -> u64 {
        image.0
    }
}

impl Debug for RowImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:#018x}", self.0)
    }
}

/// Field positions of one compare lane within a row image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneLayout {
    pub select_a: Field,
    pub select_b: Field,
    pub lut: Field,
    pub target: Field,
    pub jump_out: Field,
}

impl LaneLayout {
    fn new(at: u32, geometry: &Geometry) -> LaneLayout {
        let sel_w = geometry.selector_width();
        let select_a = Field::new(at, sel_w);
        let select_b = Field::new(select_a.end(), sel_w);
        let lut = Field::new(select_b.end(), 4);
        let target = Field::new(lut.end(), geometry.index_width());
        let jump_out = Field::new(target.end(), u32::from(geometry.outputs()));
        LaneLayout {
            select_a,
            select_b,
            lut,
            target,
            jump_out,
        }
    }
}

/// Field positions of a complete row image for one geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowLayout {
    pub static_out: Field,
    pub auto_increment: Field,
    pub lanes: [LaneLayout; 2],
    pub cond_luts: Vec<Field>,
    pub width: u32,
}

impl RowLayout {
    pub fn new(geometry: &Geometry) -> RowLayout {
        let static_out = Field::new(0, u32::from(geometry.outputs()));
        let auto_increment = Field::new(static_out.end(), 1);
        let lane0 = LaneLayout::new(auto_increment.end(), geometry);
        let lane1 = LaneLayout::new(lane0.jump_out.end(), geometry);
        let mut at = lane1.jump_out.end();
        let cond_luts: Vec<Field> = (0..geometry.cond_outputs())
            .map(|_| {
                let f = Field::new(at, 4);
                at = f.end();
                f
            })
            .collect();
        RowLayout {
            static_out,
            auto_increment,
            lanes: [lane0, lane1],
            cond_luts,
            width: at,
        }
    }

    pub fn row_mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1_u64 << self.width) - 1
        }
    }

    /// Whether a row needs both loader windows or just the low one.
    pub fn split_words(&self) -> bool {
        self.width > 32
    }
}

impl Stew {
    /// Break a packed row image down into its fields.
    pub fn unpack(image: RowImage, layout: &RowLayout) -> Stew {
        let bits = image.bits();
        let lane = |l: &LaneLayout| CompareLane {
            select_a: l.select_a.extract(bits) as u8,
            select_b: l.select_b.extract(bits) as u8,
            lut: Lut4::new(l.lut.extract(bits) as u8),
            target: StateIndex::new(l.target.extract(bits) as u8),
            jump_out: OutputVector::new(l.jump_out.extract(bits)),
        };
        Stew {
            static_out: OutputVector::new(layout.static_out.extract(bits)),
            auto_increment: layout.auto_increment.extract(bits) == 1,
            lanes: [lane(&layout.lanes[0]), lane(&layout.lanes[1])],
            cond_luts: layout
                .cond_luts
                .iter()
                .map(|f| Lut4::new(f.extract(bits) as u8))
                .collect(),
        }
    }

    /// Pack the fields back into a row image.  Conditional LUT
    /// entries beyond the geometry's count are dropped; missing ones
    /// pack as zero.
    pub fn pack(&self, layout: &RowLayout) -> RowImage {
        let mut bits = 0_u64;
        bits = layout.static_out.insert(bits, self.static_out.bits());
        bits = layout
            .auto_increment
            .insert(bits, u32::from(self.auto_increment));
        for (lane, l) in self.lanes.iter().zip(layout.lanes.iter()) {
            bits = l.select_a.insert(bits, u32::from(lane.select_a));
            bits = l.select_b.insert(bits, u32::from(lane.select_b));
            bits = l.lut.insert(bits, u32::from(lane.lut.entries()));
            bits = l.target.insert(bits, u32::from(lane.target));
            bits = l.jump_out.insert(bits, lane.jump_out.bits());
        }
        for (lut, f) in self.cond_luts.iter().zip(layout.cond_luts.iter()) {
            bits = f.insert(bits, u32::from(lut.entries()));
        }
        RowImage::new(bits)
    }
}

/// Shapes drawn across the whole validated range of every count.
/// Construction itself culls the combinations whose rows outgrow the
/// loader windows; the wiring is derived, it plays no part in the
/// row layout.
#[cfg(test)]
fn arb_geometry() -> impl proptest::strategy::Strategy<Value = Geometry> {
    use proptest::strategy::Strategy;
    let counts = (
        1..=MAX_PINS,
        1..=MAX_PINS,
        0..=MAX_COND_OUTPUTS,
        1..=MAX_TOTAL_DEPTH / 2,
        1..=MAX_TOTAL_DEPTH / 2,
    );
    counts.prop_filter_map(
        "row image wider than the loader windows",
        |(inputs, outputs, conds, depth0, depth1)| {
            let wiring = (0..conds).map(|k| (k % inputs, (k + 1) % inputs)).collect();
            Geometry::new(inputs, outputs, conds, depth0, depth1, wiring).ok()
        },
    )
}

#[cfg(test)]
#[proptest]
fn packed_form_survives_unpacking(
    #[strategy(arb_geometry())] geometry: Geometry,
    bits: u64,
) {
    let layout = RowLayout::new(&geometry);
    let image = RowImage::new(bits & layout.row_mask());
    let unpacked = Stew::unpack(image, &layout);
    assert_eq!(unpacked.pack(&layout), image);
}

#[cfg(test)]
#[proptest]
fn structured_form_survives_packing(
    #[strategy(arb_geometry())] geometry: Geometry,
    static_out: u32,
    auto_increment: bool,
    selects: [u8; 4],
    luts: [u8; 2],
    targets: [u8; 2],
    jumps: [u32; 2],
    conds: [u8; 8],
) {
    let layout = RowLayout::new(&geometry);
    // The input is cut down to the widths this shape packs; packing
    // drops anything wider.
    let select_mask = ((1_u32 << geometry.selector_width()) - 1) as u8;
    let target_mask = ((1_u32 << geometry.index_width()) - 1) as u8;
    let lane = |k: usize| CompareLane {
        select_a: selects[2 * k] & select_mask,
        select_b: selects[2 * k + 1] & select_mask,
        lut: Lut4::new(luts[k]),
        target: StateIndex::new(targets[k] & target_mask),
        jump_out: OutputVector::new(jumps[k] & geometry.output_mask()),
    };
    let input = Stew {
        static_out: OutputVector::new(static_out & geometry.output_mask()),
        auto_increment,
        lanes: [lane(0), lane(1)],
        cond_luts: conds[..usize::from(geometry.cond_outputs())]
            .iter()
            .map(|&entries| Lut4::new(entries))
            .collect(),
    };
    let image = input.pack(&layout);
    assert_eq!(Stew::unpack(image, &layout), input);
}
