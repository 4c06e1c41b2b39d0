//! Simulation of the engine's clock.

/// Clock is a simulated cycle counter.  The engine itself never
/// advances time; whatever drives it (the command-line runner, a
/// test, a host-bus model) consumes cycles here and builds a
/// [`crate::Context`] from the current count for each tick.
pub trait Clock {
    /// Retrieves the current cycle number.
    fn now(&self) -> u64;

    /// The caller calls `advance` to account for `cycles` elapsed
    /// clock edges.
    fn advance(&mut self, cycles: u64);
}

/// BasicClock provides a simulated clock.
///
/// # Examples
/// ```
/// use engine::BasicClock;
/// use engine::Clock;
/// let mut clk = BasicClock::new();
/// clk.advance(12);
/// assert_eq!(clk.now(), 12);
/// ```
#[derive(Debug)]
pub struct BasicClock {
    /// Clock edges consumed so far.
    elapsed: u64,
}

impl BasicClock {
    pub fn new() -> BasicClock {
        BasicClock { elapsed: 0 }
    }
}

impl Default for BasicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BasicClock {
    fn now(&self) -> u64 {
        self.elapsed
    }

    fn advance(&mut self, cycles: u64) {
        self.elapsed += cycles;
    }
}
