//! Per-shard debug state: halt bookkeeping, breakpoints, and the
//! delay pipes behind the debug write registers.
//!
//! Every debug write that changes machine state (forced index,
//! output override, single-step) crosses into the engine through a
//! three-stage pipe, so its effect lands exactly three cycles after
//! the write.  Halting is immediate by comparison: a halt request
//! pre-empts the next transition, while a breakpoint halts just
//! after the matching transition commits.
use serde::Serialize;

use base::prelude::*;

/// A fixed three-stage delay line.  A scheduled value emerges from
/// [`Pipe::tick`] on the third tick after scheduling; scheduling
/// again before then overwrites the value still in the first stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pipe<T: Copy> {
    slots: [Option<T>; 3],
}

impl<T: Copy> Default for Pipe<T> {
    fn default() -> Pipe<T> {
        Pipe { slots: [None; 3] }
    }
}

impl<T: Copy> Pipe<T> {
    pub(crate) fn schedule(&mut self, value: T) {
        self.slots[0] = Some(value);
    }

    pub(crate) fn tick(&mut self) -> Option<T> {
        let out = self.slots[2];
        self.slots[2] = self.slots[1];
        self.slots[1] = self.slots[0];
        self.slots[0] = None;
        out
    }

    pub(crate) fn flush(&mut self) {
        self.slots = [None; 3];
    }

    pub(crate) fn pending(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }
}

/// Why a shard is halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    /// The host held the halt-request line.
    Request,
    /// A single-step completed.
    Step,
    /// The numbered breakpoint matched a committed transition.
    Breakpoint(usize),
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub(crate) struct Breakpoint {
    pub(crate) value: u8,
    pub(crate) enabled: bool,
    /// Set when the breakpoint halts the shard; blocks resumption
    /// until the shard moves off the matching index or the
    /// breakpoint is disabled.
    pub(crate) latched: bool,
}

#[derive(Debug, Default)]
pub(crate) struct DebugSession {
    pub(crate) halted: bool,
    pub(crate) reason: Option<HaltReason>,
    pub(crate) halt_request: bool,
    /// Last written level of the step toggle, for edge detection.
    pub(crate) step_level: bool,
    pub(crate) breakpoints: [Breakpoint; 2],
    pub(crate) force_pipe: Pipe<StateIndex>,
    pub(crate) out_pipe: Pipe<OutputVector>,
    pub(crate) step_pipe: Pipe<()>,
    /// Output frozen at the moment of halting; the shard drives it
    /// for as long as it stays halted.
    pub(crate) snapshot: OutputVector,
    /// A landed output override displaces the snapshot until resume.
    pub(crate) override_out: Option<OutputVector>,
}

impl DebugSession {
    pub(crate) fn halt(&mut self, reason: HaltReason, snapshot: OutputVector) {
        self.halted = true;
        self.reason = Some(reason);
        self.snapshot = snapshot;
    }

    pub(crate) fn resume(&mut self) {
        self.halted = false;
        self.reason = None;
        self.override_out = None;
    }

    /// A latched breakpoint stops falling until its condition goes
    /// stale: the shard left the matching index, or the host
    /// disabled the breakpoint.
    pub(crate) fn sweep_latches(&mut self, current: StateIndex) {
        for bp in &mut self.breakpoints {
            if bp.latched && (!bp.enabled || current != StateIndex::new(bp.value)) {
                bp.latched = false;
            }
        }
    }

    pub(crate) fn any_latched(&self) -> bool {
        self.breakpoints.iter().any(|bp| bp.latched)
    }

    /// First enabled breakpoint matching `index`, if any.
    pub(crate) fn matching_breakpoint(&self, index: StateIndex) -> Option<usize> {
        self.breakpoints
            .iter()
            .position(|bp| bp.enabled && index == StateIndex::new(bp.value))
    }

    pub(crate) fn flush_pipes(&mut self) {
        self.force_pipe.flush();
        self.out_pipe.flush();
        self.step_pipe.flush();
    }
}
