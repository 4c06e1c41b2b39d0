//! Various convenience utilities for extracting bit fields from
//! packed row images and for inserting them back.
use std::fmt::{self, Debug, Formatter};

/// One bit field within a packed 64-bit row image, described by its
/// position and width.  Field widths never exceed 32 bits, so field
/// values travel as `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    pub shift: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(shift: u32, width: u32) -> Field {
        Field { shift, width }
    }

    /// The field's mask, positioned at bit 0.
    pub const fn value_mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1_u32 << self.width) - 1
        }
    }

    /// The field's mask, positioned within the row image.
    pub const fn image_mask(&self) -> u64 {
        (self.value_mask() as u64) << self.shift
    }

    /// The first bit position beyond the field.
    pub const fn end(&self) -> u32 {
        self.shift + self.width
    }

    pub fn extract(&self, image: u64) -> u32 {
        ((image >> self.shift) as u32) & self.value_mask()
    }

    /// Insert `value` into the field, replacing whatever the image
    /// held there.  Value bits beyond the field width are dropped.
    pub fn insert(&self, image: u64, value: u32) -> u64 {
        let cleared = image & !self.image_mask();
        cleared | u64::from(value & self.value_mask()) << self.shift
    }
}

impl Debug for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[{}+{}]", self.shift, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_hex_eq {
        ($left:expr, $right:expr $(,)?) => {{
            match (&$left, &$right) {
                (left_val, right_val) => {
                    if !(*left_val == *right_val) {
                        panic!(
                            "Assertion failed: {:#018x} != {:#018x}",
                            left_val, right_val
                        );
                    }
                }
            }
        }};
    }

    #[test]
    fn test_extract() {
        let f = Field::new(8, 4);
        assert_eq!(f.extract(0x0000_0000_0000_0a00), 0xa);
        assert_eq!(f.extract(0xffff_ffff_ffff_f5ff), 0x5);
    }

    #[test]
    fn test_insert() {
        let f = Field::new(8, 4);
        assert_hex_eq!(f.insert(0, 0xa), 0x0000_0000_0000_0a00_u64);
        assert_hex_eq!(f.insert(u64::MAX, 0), 0xffff_ffff_ffff_f0ff_u64);
    }

    #[test]
    fn test_insert_drops_out_of_range_bits() {
        let f = Field::new(4, 2);
        assert_hex_eq!(f.insert(0, 0xff), 0x30_u64);
    }

    #[test]
    fn test_round_trip() {
        let f = Field::new(23, 8);
        let image = f.insert(0x1234_5678_9abc_def0, 0x5a);
        assert_eq!(f.extract(image), 0x5a);
    }

    #[test]
    fn test_wide_field() {
        let f = Field::new(16, 32);
        assert_eq!(f.value_mask(), u32::MAX);
        assert_eq!(f.extract(0x0000_dead_beef_0000), 0xdead_beef);
    }
}
