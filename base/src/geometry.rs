//! The build-time shape of an engine instance.
//!
//! A `Geometry` fixes everything about an engine that is not loaded
//! at runtime: how many input and output pins exist, how many
//! conditional outputs, the capacity of each table half, and the
//! fixed wiring that feeds the conditional-output lookup tables.  All
//! of the derived field widths (selector width, index width, total
//! row width) follow from these counts.
//!
//! Construction validates everything once; a `Geometry` that exists
//! is always internally consistent and the engine never re-checks it.
use std::error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::types::ShardId;

/// Most inputs or outputs an engine can have; pin vectors travel in
/// one 32-bit register.
pub const MAX_PINS: u8 = 32;

/// Most rows the two table halves can hold together; a state index
/// must fit in a byte.
pub const MAX_TOTAL_DEPTH: u16 = 256;

/// Most conditional outputs; their result bits travel in one byte.
pub const MAX_COND_OUTPUTS: u8 = 8;

/// A row image must fit the pair of 32-bit loader windows.
pub const MAX_ROW_WIDTH: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    InputCountOutOfRange(u8),
    OutputCountOutOfRange(u8),
    TooManyConditionalOutputs(u8),
    DepthOutOfRange(ShardId, u16),
    WiringCountMismatch { expected: u8, got: usize },
    WiringSelectsMissingInput { cond: u8, input: u8 },
    RowTooWide(u32),
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            GeometryError::InputCountOutOfRange(n) => {
                write!(f, "input count {n} is not between 1 and {MAX_PINS}")
            }
            GeometryError::OutputCountOutOfRange(n) => {
                write!(f, "output count {n} is not between 1 and {MAX_PINS}")
            }
            GeometryError::TooManyConditionalOutputs(n) => {
                write!(
                    f,
                    "conditional output count {n} exceeds the limit of {MAX_COND_OUTPUTS}"
                )
            }
            GeometryError::DepthOutOfRange(shard, depth) => {
                write!(f, "{shard} depth {depth} is not between 1 and 128")
            }
            GeometryError::WiringCountMismatch { expected, got } => {
                write!(
                    f,
                    "conditional output wiring lists {got} pairs but the geometry has {expected} conditional outputs"
                )
            }
            GeometryError::WiringSelectsMissingInput { cond, input } => {
                write!(
                    f,
                    "conditional output {cond} is wired to input {input}, which does not exist"
                )
            }
            GeometryError::RowTooWide(width) => {
                write!(
                    f,
                    "row image is {width} bits wide but the loader windows carry at most {MAX_ROW_WIDTH}"
                )
            }
        }
    }
}

impl error::Error for GeometryError {}

/// Number of bits needed to count `n` distinct things, with a floor
/// of one bit so that degenerate geometries still have a field.
fn width_for_count(n: u16) -> u32 {
    if n <= 2 {
        1
    } else {
        u32::from(n).next_power_of_two().trailing_zeros()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geometry {
    // Fields are deliberately not public; they are validated on
    // construction.
    inputs: u8,
    outputs: u8,
    cond_outputs: u8,
    depth0: u16,
    depth1: u16,
    cond_wiring: Vec<(u8, u8)>,
}

impl Geometry {
    pub fn new(
        inputs: u8,
        outputs: u8,
        cond_outputs: u8,
        depth0: u16,
        depth1: u16,
        cond_wiring: Vec<(u8, u8)>,
    ) -> Result<Geometry, GeometryError> {
        if inputs == 0 || inputs > MAX_PINS {
            return Err(GeometryError::InputCountOutOfRange(inputs));
        }
        if outputs == 0 || outputs > MAX_PINS {
            return Err(GeometryError::OutputCountOutOfRange(outputs));
        }
        if cond_outputs > MAX_COND_OUTPUTS {
            return Err(GeometryError::TooManyConditionalOutputs(cond_outputs));
        }
        for (shard, depth) in [(ShardId::Zero, depth0), (ShardId::One, depth1)] {
            if depth == 0 || depth > MAX_TOTAL_DEPTH / 2 {
                return Err(GeometryError::DepthOutOfRange(shard, depth));
            }
        }
        if cond_wiring.len() != usize::from(cond_outputs) {
            return Err(GeometryError::WiringCountMismatch {
                expected: cond_outputs,
                got: cond_wiring.len(),
            });
        }
        for (cond, (a, b)) in cond_wiring.iter().enumerate() {
            for input in [a, b] {
                if *input >= inputs {
                    return Err(GeometryError::WiringSelectsMissingInput {
                        cond: cond as u8,
                        input: *input,
                    });
                }
            }
        }
        let g = Geometry {
            inputs,
            outputs,
            cond_outputs,
            depth0,
            depth1,
            cond_wiring,
        };
        let width = g.row_width();
        if width > MAX_ROW_WIDTH {
            return Err(GeometryError::RowTooWide(width));
        }
        Ok(g)
    }

    pub fn inputs(&self) -> u8 {
        self.inputs
    }

    pub fn outputs(&self) -> u8 {
        self.outputs
    }

    pub fn cond_outputs(&self) -> u8 {
        self.cond_outputs
    }

    pub fn depth(&self, shard: ShardId) -> u16 {
        match shard {
            ShardId::Zero => self.depth0,
            ShardId::One => self.depth1,
        }
    }

    pub fn total_depth(&self) -> u16 {
        self.depth0 + self.depth1
    }

    /// The two input bit positions feeding conditional output `cond`.
    pub fn cond_wiring(&self, cond: u8) -> (u8, u8) {
        self.cond_wiring[usize::from(cond)]
    }

    /// Width of one input-mux selector field.
    pub fn selector_width(&self) -> u32 {
        width_for_count(u16::from(self.inputs))
    }

    /// Width of a state index field, sized for the concatenated
    /// table.
    pub fn index_width(&self) -> u32 {
        width_for_count(self.total_depth())
    }

    /// Total width of one packed row image.
    pub fn row_width(&self) -> u32 {
        let out_w = u32::from(self.outputs);
        let lane_w = 2 * self.selector_width() + 4 + self.index_width() + out_w;
        out_w + 1 + 2 * lane_w + 4 * u32::from(self.cond_outputs)
    }

    pub fn input_mask(&self) -> u32 {
        mask_for_pins(self.inputs)
    }

    pub fn output_mask(&self) -> u32 {
        mask_for_pins(self.outputs)
    }
}

fn mask_for_pins(count: u8) -> u32 {
    if count >= 32 {
        u32::MAX
    } else {
        (1_u32 << count) - 1
    }
}

/// The reference build: 8 inputs, 8 outputs, two conditional outputs
/// wired to input pairs (0,1) and (2,3), and two 8-row table halves.
impl Default for Geometry {
    fn default() -> Geometry {
        Geometry::new(8, 8, 2, 8, 8, vec![(0, 1), (2, 3)])
            .expect("the reference geometry is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_widths() {
        let g = Geometry::default();
        assert_eq!(g.selector_width(), 3);
        assert_eq!(g.index_width(), 4);
        assert_eq!(g.row_width(), 61);
        assert_eq!(g.total_depth(), 16);
        assert_eq!(g.input_mask(), 0xff);
        assert_eq!(g.output_mask(), 0xff);
    }

    #[test]
    fn test_width_for_count() {
        assert_eq!(width_for_count(1), 1);
        assert_eq!(width_for_count(2), 1);
        assert_eq!(width_for_count(3), 2);
        assert_eq!(width_for_count(8), 3);
        assert_eq!(width_for_count(9), 4);
        assert_eq!(width_for_count(256), 8);
    }

    #[test]
    fn test_rejects_zero_inputs() {
        assert_eq!(
            Geometry::new(0, 8, 0, 8, 8, vec![]),
            Err(GeometryError::InputCountOutOfRange(0))
        );
    }

    #[test]
    fn test_rejects_oversized_depth() {
        assert_eq!(
            Geometry::new(8, 8, 0, 8, 129, vec![]),
            Err(GeometryError::DepthOutOfRange(ShardId::One, 129))
        );
    }

    #[test]
    fn test_rejects_wiring_mismatch() {
        assert_eq!(
            Geometry::new(8, 8, 2, 8, 8, vec![(0, 1)]),
            Err(GeometryError::WiringCountMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            Geometry::new(4, 8, 1, 8, 8, vec![(0, 4)]),
            Err(GeometryError::WiringSelectsMissingInput { cond: 0, input: 4 })
        );
    }

    #[test]
    fn test_rejects_row_wider_than_the_loader_windows() {
        // 32 outputs alone make a lane wider than a loader window.
        let result = Geometry::new(32, 32, 0, 8, 8, vec![]);
        match result {
            Err(GeometryError::RowTooWide(width)) => {
                assert!(width > MAX_ROW_WIDTH);
            }
            other => panic!("expected RowTooWide, got {other:?}"),
        }
    }

    #[test]
    fn test_narrow_geometry_fits_one_window() {
        // 2 inputs, 2 outputs, no conditional outputs: rows fit the
        // low window alone.
        let g = Geometry::new(2, 2, 0, 2, 2, vec![]).expect("valid test geometry");
        assert_eq!(g.row_width(), 23);
    }
}
