//! The `base` crate defines the PRISM-related things which are useful
//! in both the execution engine and other associated tools.  The idea
//! is that if you want to write an offline row compiler, it would
//! depend on the base crate but would not need to depend on the
//! engine library itself.

mod geometry;
mod rowbits;
mod stew;
mod types;
mod vector;

pub mod prelude;

pub use crate::geometry::{Geometry, GeometryError};
pub use crate::rowbits::Field;
pub use crate::stew::{CompareLane, Lut4, RowImage, RowLayout, Stew};
pub use crate::types::{ShardId, StateIndex};
pub use crate::vector::{InputVector, OutputVector};
