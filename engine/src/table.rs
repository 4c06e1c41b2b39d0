//! One half of the state table, with its load controller.
//!
//! The table's write path behaves as a fixed-capacity shift chain,
//! not as addressable memory.  A host stages a row image through one
//! or two 32-bit window writes; the triggering write starts a ripple
//! that spends one cycle per slot, deepest slot first.  Each slot
//! captures the value its shallower neighbour held when the ripple
//! reached it, and slot 0 finally captures the staging register, so
//! one completed load pushes every existing row down one slot and
//! discards the last.  Loading a whole table therefore means writing
//! the deepest row first.
//!
//! Reads are ordinary: the executing shard fetches any row by index
//! in the same cycle, and the host windows read back the tail slot
//! only.
use tracing::{event, Level};

use base::prelude::*;

/// The load controller.  A trigger is honoured only in `Idle`; while
/// a ripple is in flight further triggers are lost, though staging
/// writes still land and can change what slot 0 captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Idle,
    Shift { index: usize },
    Wait,
}

#[derive(Debug)]
pub(crate) struct StateTable {
    half: ShardId,
    rows: Vec<RowImage>,
    staged_low: u32,
    staged_high: u32,
    phase: LoadPhase,
    row_mask: u64,
    split_words: bool,
}

impl StateTable {
    pub(crate) fn new(half: ShardId, depth: u16, layout: &RowLayout) -> StateTable {
        StateTable {
            half,
            rows: vec![RowImage::ZERO; usize::from(depth)],
            staged_low: 0,
            staged_high: 0,
            phase: LoadPhase::Idle,
            row_mask: layout.row_mask(),
            split_words: layout.split_words(),
        }
    }

    pub(crate) fn depth(&self) -> u16 {
        self.rows.len() as u16
    }

    /// Fetch the row at `index`.  Callers keep indexes within the
    /// table's capacity.
    pub(crate) fn row(&self, index: StateIndex) -> RowImage {
        self.rows[usize::from(index)]
    }

    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[RowImage] {
        &self.rows
    }

    /// The tail slot, the only row the host windows can read back.
    pub(crate) fn tail_row(&self) -> RowImage {
        self.rows[self.rows.len() - 1]
    }

    pub(crate) fn busy(&self) -> bool {
        self.phase != LoadPhase::Idle
    }

    /// Stage the low window.  For geometries whose rows fit a single
    /// window this is the triggering write.
    pub(crate) fn write_low(&mut self, word: u32) {
        self.staged_low = word;
        if !self.split_words {
            self.trigger();
        }
    }

    /// Stage the high window and trigger the load.
    pub(crate) fn write_high(&mut self, word: u32) {
        self.staged_high = word;
        self.trigger();
    }

    fn staged_row(&self) -> RowImage {
        RowImage::new(
            RowImage::from_words(self.staged_low, self.staged_high).bits() & self.row_mask,
        )
    }

    fn trigger(&mut self) {
        match self.phase {
            LoadPhase::Idle => {
                let start = self.rows.len() - 1;
                event!(
                    Level::DEBUG,
                    "{} accepted row load {:?}, rippling from slot {}",
                    self.half,
                    self.staged_row(),
                    start
                );
                self.phase = LoadPhase::Shift { index: start };
            }
            _ => {
                // A ripple is already in flight; this trigger is
                // lost.  The staging registers were updated all the
                // same.
                event!(
                    Level::DEBUG,
                    "{} lost a load trigger while {:?}",
                    self.half,
                    self.phase
                );
            }
        }
    }

    /// Abandon any ripple in flight.  Slots that already latched
    /// keep their new values; the interrupted row is left partially
    /// applied.
    pub(crate) fn abort(&mut self) {
        if self.phase != LoadPhase::Idle {
            event!(Level::DEBUG, "{} aborting row load", self.half);
            self.phase = LoadPhase::Idle;
        }
    }

    /// Advance the load controller by one cycle.
    pub(crate) fn tick(&mut self) {
        match self.phase {
            LoadPhase::Idle => (),
            LoadPhase::Shift { index } => {
                // One slot latches per cycle.  The shallower
                // neighbour has not latched yet, so it still holds
                // the value this slot must capture.
                if index == 0 {
                    self.rows[0] = self.staged_row();
                    self.phase = LoadPhase::Wait;
                } else {
                    self.rows[index] = self.rows[index - 1];
                    self.phase = LoadPhase::Shift { index: index - 1 };
                }
                event!(Level::TRACE, "{} latched slot {}", self.half, index);
            }
            LoadPhase::Wait => {
                self.phase = LoadPhase::Idle;
            }
        }
    }

    /// Cycles a full load occupies: one per slot plus the wait cycle
    /// before the controller accepts the next trigger.
    pub(crate) fn load_cycles(&self) -> u64 {
        self.rows.len() as u64 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_table(depth: u16) -> StateTable {
        let geometry = Geometry::default();
        StateTable::new(ShardId::Zero, depth, &RowLayout::new(&geometry))
    }

    fn row(n: u64) -> RowImage {
        RowImage::new(n)
    }

    fn load_one(table: &mut StateTable, image: RowImage) {
        table.write_low(image.low_word());
        table.write_high(image.high_word());
        for _ in 0..table.load_cycles() {
            table.tick();
        }
        assert!(!table.busy());
    }

    #[test]
    fn test_full_load_lands_in_forward_order() {
        let mut table = split_table(4);
        let intended = [row(0xa), row(0xb), row(0xc), row(0xd)];
        // Deepest row first.
        for image in intended.iter().rev() {
            load_one(&mut table, *image);
        }
        assert_eq!(table.rows(), &intended);
        assert_eq!(table.tail_row(), row(0xd));
    }

    #[test]
    fn test_identical_load_sequences_are_idempotent() {
        let mut a = split_table(4);
        let mut b = split_table(4);
        let sequence = [row(4), row(3), row(2), row(1)];
        for image in &sequence {
            load_one(&mut a, *image);
        }
        for _ in 0..2 {
            for image in &sequence {
                load_one(&mut b, *image);
            }
        }
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn test_rewrite_exposes_old_rows_at_the_tail() {
        let mut table = split_table(4);
        let intended = [row(0x10), row(0x20), row(0x30), row(0x40)];
        for image in intended.iter().rev() {
            load_one(&mut table, *image);
        }
        // Rewriting the same table pushes the old contents out
        // through the tail: after the k-th write the tail exposes
        // old row (depth - 1 - k).
        for (k, image) in intended.iter().rev().enumerate() {
            load_one(&mut table, *image);
            let expect = if k == 3 {
                intended[3]
            } else {
                intended[4 - 2 - k]
            };
            assert_eq!(table.tail_row(), expect, "after rewrite {k}");
        }
        assert_eq!(table.rows(), &intended);
    }

    #[test]
    fn test_one_write_costs_depth_cycles() {
        let mut table = split_table(4);
        let image = row(0x99);
        table.write_low(image.low_word());
        assert!(!table.busy());
        table.write_high(image.high_word());
        assert!(table.busy());
        // Four shift cycles and a wait cycle.
        for _ in 0..4 {
            table.tick();
            assert!(table.busy());
        }
        table.tick();
        assert!(!table.busy());
        assert_eq!(table.row(StateIndex::ZERO), image);
    }

    #[test]
    fn test_trigger_during_ripple_is_lost() {
        let mut table = split_table(4);
        table.write_low(0x1111);
        table.write_high(0);
        table.tick();
        table.tick();
        // Second pair lands in staging but its trigger is lost; the
        // ripple in flight captures the new staging value at slot 0.
        table.write_low(0x2222);
        table.write_high(0);
        table.tick();
        table.tick();
        table.tick();
        assert!(!table.busy(), "a lost trigger must not restart the ripple");
        assert_eq!(table.row(StateIndex::ZERO), row(0x2222));
    }

    #[test]
    fn test_abort_leaves_partial_shift() {
        let mut table = split_table(4);
        let intended = [row(1), row(2), row(3), row(4)];
        for image in intended.iter().rev() {
            load_one(&mut table, *image);
        }
        table.write_low(0xff);
        table.write_high(0);
        table.tick(); // slot 3 latches row 2's old value
        table.abort();
        assert!(!table.busy());
        assert_eq!(table.rows(), &[row(1), row(2), row(3), row(3)]);
    }

    #[test]
    fn test_single_window_geometry_triggers_on_low_write() {
        let geometry = Geometry::new(2, 2, 0, 2, 2, vec![]).expect("valid test geometry");
        let mut table = StateTable::new(ShardId::Zero, 2, &RowLayout::new(&geometry));
        table.write_low(0x3);
        assert!(table.busy());
        table.tick();
        table.tick();
        table.tick();
        assert!(!table.busy());
        assert_eq!(table.row(StateIndex::ZERO), row(0x3));
    }
}
