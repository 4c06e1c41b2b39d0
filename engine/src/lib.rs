//! This crate emulates the PRISM engine: a runtime-reconfigurable
//! finite-state-machine execution unit programmed through a 32-bit
//! register interface.
#![crate_name = "engine"]

mod clock;
mod condout;
mod context;
mod debug;
mod decision;
mod prism;
mod table;

pub mod regs;

pub use clock::{BasicClock, Clock};
pub use context::Context;
pub use debug::HaltReason;
pub use decision::TransitionKind;
pub use prism::{LoaderStatus, Prism, PrismStatus, ShardStatus};
pub use regs::BusFault;
