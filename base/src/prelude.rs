//! The prelude exports the structs which are useful in representing
//! things to do with the PRISM engine.  Providing this prelude is the
//! main purpose of the base crate.
pub use super::geometry::{Geometry, GeometryError};
pub use super::rowbits::Field;
pub use super::stew::{CompareLane, Lut4, RowImage, RowLayout, Stew};
pub use super::types::{ShardId, StateIndex};
pub use super::vector::{InputVector, OutputVector};
