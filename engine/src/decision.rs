//! The decision unit: picks each shard's next row.
//!
//! Candidate sources are ranked, and the highest-ranked active one
//! wins outright:
//!
//! 1. compare lane 0 (its LUT, fed by its two selected inputs, reads 1)
//! 2. compare lane 1 (only when dual-compare is enabled)
//! 3. auto-increment
//! 4. loop return (auto-increment clear, an anchor is held)
//! 5. hold
//!
//! The loop anchor is captured the first time auto-increment fires
//! out of a row and is not overwritten by later increments, so a
//! straight-line run remembers where it entered.  Any lane match, or
//! a forced index from the debug controller, discards the anchor.
use serde::Serialize;

use base::prelude::*;

/// How a shard arrived at its next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    Hold,
    Lane0,
    Lane1,
    Increment,
    LoopReturn,
    /// Assigned by the debug controller when a halt request pre-empts
    /// the transition; the decision unit itself never selects it.
    Halt,
}

impl TransitionKind {
    /// Wire encoding used by the trace registers.
    pub(crate) fn code(self) -> u32 {
        match self {
            TransitionKind::Hold => 0,
            TransitionKind::Lane0 => 1,
            TransitionKind::Lane1 => 2,
            TransitionKind::Increment => 3,
            TransitionKind::LoopReturn => 4,
            TransitionKind::Halt => 5,
        }
    }
}

impl Default for TransitionKind {
    fn default() -> TransitionKind {
        TransitionKind::Hold
    }
}

/// What one compare lane saw during a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct LaneTrace {
    /// The two selected input bits, b packed above a.
    pub(crate) selected: u8,
    pub(crate) matched: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct DecisionTrace {
    pub(crate) lanes: [LaneTrace; 2],
    pub(crate) kind: TransitionKind,
}

/// The outcome of one decision, before anything is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) next: StateIndex,
    pub(crate) kind: TransitionKind,
    /// The winning candidate's output contribution; the row's static
    /// output for everything but a lane match.
    pub(crate) vector: OutputVector,
    pub(crate) anchor_after: Option<StateIndex>,
    pub(crate) trace: DecisionTrace,
}

fn probe_lane(lane: &CompareLane, inputs: InputVector) -> LaneTrace {
    let a = inputs.bit(lane.select_a);
    let b = inputs.bit(lane.select_b);
    LaneTrace {
        selected: u8::from(b) << 1 | u8::from(a),
        matched: lane.lut.lookup(b, a),
    }
}

/// Decide the next row for a shard sitting on `row` at `index`.
/// Pure: commitment is the caller's business, which lets the debug
/// controller preview a transition without taking it.
pub(crate) fn decide(
    row: &Stew,
    inputs: InputVector,
    dual_compare: bool,
    index: StateIndex,
    anchor: Option<StateIndex>,
    capacity: u16,
) -> Transition {
    let traces = [probe_lane(&row.lanes[0], inputs), probe_lane(&row.lanes[1], inputs)];
    let mut transition = if traces[0].matched {
        Transition {
            next: row.lanes[0].target.reduce(capacity),
            kind: TransitionKind::Lane0,
            vector: row.lanes[0].jump_out,
            anchor_after: None,
            trace: DecisionTrace::default(),
        }
    } else if dual_compare && traces[1].matched {
        Transition {
            next: row.lanes[1].target.reduce(capacity),
            kind: TransitionKind::Lane1,
            vector: row.lanes[1].jump_out,
            anchor_after: None,
            trace: DecisionTrace::default(),
        }
    } else if row.auto_increment {
        Transition {
            next: index.successor(capacity),
            kind: TransitionKind::Increment,
            vector: row.static_out,
            // First increment out of a run records where the run
            // entered; later ones leave it alone.
            anchor_after: anchor.or(Some(index)),
            trace: DecisionTrace::default(),
        }
    } else if let Some(back) = anchor {
        Transition {
            next: back.reduce(capacity),
            kind: TransitionKind::LoopReturn,
            vector: row.static_out,
            anchor_after: anchor,
            trace: DecisionTrace::default(),
        }
    } else {
        Transition {
            next: index,
            kind: TransitionKind::Hold,
            vector: row.static_out,
            anchor_after: None,
            trace: DecisionTrace::default(),
        }
    };
    transition.trace = DecisionTrace {
        lanes: traces,
        kind: transition.kind,
    };
    transition
}

/// Per-shard execution state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ShardState {
    pub(crate) index: StateIndex,
    pub(crate) anchor: Option<StateIndex>,
}

impl ShardState {
    pub(crate) fn commit(&mut self, transition: &Transition) {
        self.index = transition.next;
        self.anchor = transition.anchor_after;
    }

    /// Debug-forced landing.  The anchor does not survive an index
    /// the shard never walked to.
    pub(crate) fn force(&mut self, index: StateIndex) {
        self.index = index;
        self.anchor = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = ShardState::default();
    }
}
