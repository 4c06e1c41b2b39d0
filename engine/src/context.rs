//! This module manages the context in which the engine performs a
//! single step.
//!
//! A call into the engine's `tick` represents one edge of the
//! engine's clock.  The engine itself is stateless about time; the
//! caller owns the cycle counter and hands it in so that trace output
//! and telemetry can name the cycle they belong to.

#[derive(Debug, Clone, Copy)]
pub struct Context {
    /// Number of clock edges that happened before this one.
    pub cycle: u64,
}

impl Context {
    #[must_use]
    pub fn new(cycle: u64) -> Context {
        Context { cycle }
    }
}
