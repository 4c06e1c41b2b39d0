//! The engine proper: two shards, their tables, and the glue.
//!
//! A [`Prism`] owns the whole machine.  Each call to [`Prism::tick`]
//! is one clock edge: the input vector is latched, any row load in
//! flight advances one slot, each active shard takes (at most) one
//! transition, and the composite output bus for that cycle comes
//! back.  Everything else (mode bits, masks, table loads, the debug
//! controller) reaches the machine through the register interface in
//! [`crate::regs`].
//!
//! Unfractured, shard 0 runs alone over both table halves
//! concatenated, and shard 1 is parked.  Fractured, each shard runs
//! its own half, contributes through its own masks, and the bus
//! carries the OR of the two contributions.
use tracing::{event, span, Level};

use base::prelude::*;

use crate::clock::Clock;
use crate::condout::{conditional_bits, scatter};
use crate::context::Context;
use crate::debug::{DebugSession, HaltReason};
use crate::decision::{decide, DecisionTrace, ShardState, TransitionKind};
use crate::regs::{self, BusFault};
use crate::table::StateTable;

mod status;

pub use status::{LoaderStatus, PrismStatus, ShardStatus};

#[derive(Debug)]
pub struct Prism {
    pub(crate) geometry: Geometry,
    pub(crate) layout: RowLayout,
    pub(crate) tables: [StateTable; 2],
    pub(crate) shards: [ShardState; 2],
    pub(crate) debug: [DebugSession; 2],
    pub(crate) enable: bool,
    pub(crate) fracture: bool,
    pub(crate) dual_compare: bool,
    /// Latched when any shard goes from running to halted; cleared
    /// by the CTRL strobe.
    pub(crate) irq: bool,
    pub(crate) out_mask: [u32; 2],
    pub(crate) cond_mask: [u32; 2],
    pub(crate) trace: [DecisionTrace; 2],
    pub(crate) last_inputs: InputVector,
    pub(crate) last_outputs: OutputVector,
    pub(crate) last_shard_out: [OutputVector; 2],
}

impl Prism {
    /// A machine with the given shape.  It powers on disabled, with
    /// empty tables, parked masks, and both shards at row zero; the
    /// host is expected to load tables and set masks before setting
    /// the enable bit.
    pub fn new(geometry: Geometry) -> Prism {
        let layout = RowLayout::new(&geometry);
        let tables = [
            StateTable::new(ShardId::Zero, geometry.depth(ShardId::Zero), &layout),
            StateTable::new(ShardId::One, geometry.depth(ShardId::One), &layout),
        ];
        Prism {
            geometry,
            layout,
            tables,
            shards: Default::default(),
            debug: Default::default(),
            enable: false,
            fracture: false,
            dual_compare: false,
            irq: false,
            out_mask: [0; 2],
            cond_mask: [0; 2],
            trace: Default::default(),
            last_inputs: InputVector::ZERO,
            last_outputs: OutputVector::ZERO,
            last_shard_out: [OutputVector::ZERO; 2],
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn row_layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn irq_pending(&self) -> bool {
        self.irq
    }

    /// Advance the machine by one clock edge and return the output
    /// bus for the cycle.
    pub fn tick(&mut self, ctx: &Context, inputs: InputVector) -> OutputVector {
        let tick_span = span!(Level::TRACE, "tick", t = ?ctx.cycle);
        let _enter = tick_span.enter();

        self.last_inputs = inputs;
        // Row loads ripple whether or not the engine is enabled.
        for table in &mut self.tables {
            table.tick();
        }
        if !self.enable {
            for session in &mut self.debug {
                session.flush_pipes();
            }
            self.last_shard_out = [OutputVector::ZERO; 2];
            self.last_outputs = OutputVector::ZERO;
            return OutputVector::ZERO;
        }

        let from_zero = self.step_shard(ShardId::Zero, inputs);
        let from_one = if self.fracture {
            self.step_shard(ShardId::One, inputs)
        } else {
            OutputVector::ZERO
        };
        let composite = OutputVector::new(from_zero.bits() | from_one.bits());
        self.last_outputs = composite;
        composite
    }

    /// One shard's share of a cycle: service the debug controller,
    /// then take a transition if nothing is holding the shard.
    fn step_shard(&mut self, shard: ShardId, inputs: InputVector) -> OutputVector {
        let i = shard.index();
        let capacity = self.shard_capacity(shard);

        let forced = self.debug[i].force_pipe.tick();
        let overriding = self.debug[i].out_pipe.tick();
        let step_fired = self.debug[i].step_pipe.tick().is_some();

        self.debug[i].sweep_latches(self.shards[i].index);

        if let Some(vector) = overriding {
            if self.debug[i].halted {
                self.debug[i].override_out = Some(vector);
            } else {
                event!(
                    Level::DEBUG,
                    "{} output override landed while running; discarded",
                    shard
                );
            }
        }

        if self.debug[i].halted && step_fired {
            // Exactly one transition, then halted again with the
            // fresh output as the snapshot.
            let live = self.run_transition(shard, inputs, forced, capacity);
            let landed = self.shards[i].index;
            self.debug[i].snapshot = live;
            self.debug[i].reason = Some(HaltReason::Step);
            if let Some(number) = self.debug[i].matching_breakpoint(landed) {
                self.debug[i].breakpoints[number].latched = true;
                self.debug[i].reason = Some(HaltReason::Breakpoint(number));
            }
            event!(Level::DEBUG, "{} stepped to {}", shard, landed);
            return self.halted_drive(shard);
        }

        if self.debug[i].halted && !self.debug[i].halt_request && !self.debug[i].any_latched() {
            event!(Level::DEBUG, "{} resuming at {}", shard, self.shards[i].index);
            self.debug[i].resume();
            // Falls through: the first running cycle is this one.
        }

        if self.debug[i].halted {
            // Parked.  A landed forced index retargets the shard
            // without a transition.
            if let Some(index) = forced {
                self.shards[i].force(index.reduce(capacity));
                event!(
                    Level::DEBUG,
                    "{} forced to {} while halted",
                    shard,
                    self.shards[i].index
                );
            }
            return self.halted_drive(shard);
        }

        if self.debug[i].halt_request {
            // Pre-transition halt: the shard freezes before deciding
            // and keeps driving what it drove last cycle.
            let snapshot = self.last_shard_out[i];
            self.debug[i].halt(HaltReason::Request, snapshot);
            self.trace[i] = DecisionTrace {
                lanes: Default::default(),
                kind: TransitionKind::Halt,
            };
            self.irq = true;
            event!(
                Level::DEBUG,
                "{} halted on request at {}",
                shard,
                self.shards[i].index
            );
            return self.halted_drive(shard);
        }

        let live = self.run_transition(shard, inputs, forced, capacity);
        let landed = self.shards[i].index;
        if let Some(number) = self.debug[i].matching_breakpoint(landed) {
            // Post-transition halt: the transition committed and its
            // output drove the bus for this cycle.
            self.debug[i].breakpoints[number].latched = true;
            self.debug[i].halt(HaltReason::Breakpoint(number), live);
            self.irq = true;
            event!(Level::DEBUG, "{} hit breakpoint {} at {}", shard, number, landed);
        }
        live
    }

    /// Decide and commit one transition, returning the shard's
    /// masked contribution to the output bus for this cycle.
    fn run_transition(
        &mut self,
        shard: ShardId,
        inputs: InputVector,
        forced: Option<StateIndex>,
        capacity: u16,
    ) -> OutputVector {
        let i = shard.index();
        let stew = self.fetch_stew(shard);
        let mut transition = decide(
            &stew,
            inputs,
            self.dual_compare,
            self.shards[i].index,
            self.shards[i].anchor,
            capacity,
        );
        if let Some(index) = forced {
            // A forced index landing on a running shard hijacks the
            // commit.  The decided candidate still shows in the
            // trace registers.
            transition.next = index.reduce(capacity);
            transition.anchor_after = None;
        }
        self.shards[i].commit(&transition);
        self.trace[i] = transition.trace;
        let conditionals = conditional_bits(&stew, inputs, &self.geometry);
        let live = self.compose_contribution(shard, transition.vector, conditionals);
        self.last_shard_out[i] = live;
        live
    }

    /// Route one shard's winning vector and conditional bits onto
    /// the 32-bit bus.  Fractured shards go through their own masks;
    /// an unfractured shard 0 owns the whole output width.
    fn compose_contribution(
        &self,
        shard: ShardId,
        vector: OutputVector,
        conditionals: u8,
    ) -> OutputVector {
        let i = shard.index();
        let routed = scatter(conditionals, self.cond_mask[i]);
        let base = if self.fracture {
            vector.bits() & self.out_mask[i]
        } else {
            vector.bits() & self.geometry.output_mask()
        };
        OutputVector::new(base | routed)
    }

    /// What a halted shard drives: a landed override if one is in
    /// force, the halt snapshot otherwise.
    fn halted_drive(&self, shard: ShardId) -> OutputVector {
        let i = shard.index();
        match self.debug[i].override_out {
            Some(vector) => {
                let mask = if self.fracture {
                    self.out_mask[i] | self.cond_mask[i]
                } else {
                    self.geometry.output_mask()
                };
                OutputVector::new(vector.bits() & mask)
            }
            None => self.debug[i].snapshot,
        }
    }

    /// The row the shard currently sits on, unpacked.
    pub(crate) fn fetch_stew(&self, shard: ShardId) -> Stew {
        let index = self.shards[shard.index()].index;
        Stew::unpack(self.fetch_row(shard, index), &self.layout)
    }

    fn fetch_row(&self, shard: ShardId, index: StateIndex) -> RowImage {
        if self.fracture {
            return self.tables[shard.index()].row(index);
        }
        // Unfractured addressing concatenates the halves: table 0
        // first, table 1 above it.
        let position = usize::from(index);
        let lower = usize::from(self.tables[0].depth());
        if position < lower {
            self.tables[0].row(index)
        } else {
            self.tables[1].row(StateIndex::new((position - lower) as u8))
        }
    }

    pub(crate) fn shard_capacity(&self, shard: ShardId) -> u16 {
        if self.fracture {
            self.tables[shard.index()].depth()
        } else {
            self.geometry.total_depth()
        }
    }

    /// The index the shard would move to if a transition were taken
    /// against the last latched inputs.  Pure; feeds the DBG_STAT
    /// preview field.
    pub(crate) fn preview_next(&self, shard: ShardId) -> StateIndex {
        let i = shard.index();
        decide(
            &self.fetch_stew(shard),
            self.last_inputs,
            self.dual_compare,
            self.shards[i].index,
            self.shards[i].anchor,
            self.shard_capacity(shard),
        )
        .next
    }

    pub(crate) fn set_enable(&mut self, enable: bool) {
        if self.enable && !enable {
            // Falling edge: anything in flight is abandoned.  Loads
            // started afterwards, while disabled, run normally.
            event!(Level::DEBUG, "engine disabled; flushing loads and debug pipes");
            for table in &mut self.tables {
                table.abort();
            }
            for session in &mut self.debug {
                session.flush_pipes();
            }
        }
        self.enable = enable;
    }

    pub(crate) fn set_fracture(&mut self, fracture: bool) {
        if self.fracture == fracture {
            return;
        }
        self.fracture = fracture;
        event!(
            Level::DEBUG,
            "fracture {}",
            if fracture { "enabled" } else { "disabled" }
        );
        // Indices and anchors survive the toggle reduced into the
        // new capacity.
        for shard in ShardId::both() {
            let capacity = self.shard_capacity(shard);
            let state = &mut self.shards[shard.index()];
            state.index = state.index.reduce(capacity);
            state.anchor = state.anchor.map(|anchor| anchor.reduce(capacity));
        }
    }

    /// The CTRL soft-reset strobe: execution state, debug sessions,
    /// telemetry, and any load in flight are cleared.  Loaded rows,
    /// masks, and the mode bits survive.
    pub(crate) fn soft_reset(&mut self) {
        event!(Level::DEBUG, "soft reset");
        for state in &mut self.shards {
            state.reset();
        }
        self.debug = Default::default();
        for table in &mut self.tables {
            table.abort();
        }
        self.irq = false;
        self.trace = Default::default();
        self.last_shard_out = [OutputVector::ZERO; 2];
        self.last_outputs = OutputVector::ZERO;
    }

    /// Load `rows` into one table half through the register
    /// interface, first row of the slice shallowest.  Each row is
    /// staged and then paced with enough idle cycles for the ripple
    /// to finish, advancing `clock` as it goes.  Rows beyond the
    /// table's depth fall out the far end.
    ///
    /// Meant for a disabled engine; on an enabled one the pacing
    /// ticks run transitions against an all-zero input vector.
    pub fn load_rows(
        &mut self,
        clock: &mut impl Clock,
        half: ShardId,
        rows: &[RowImage],
    ) -> Result<(), BusFault> {
        let (low, high) = match half {
            ShardId::Zero => (regs::TAB0_LOW, regs::TAB0_HIGH),
            ShardId::One => (regs::TAB1_LOW, regs::TAB1_HIGH),
        };
        let pacing = self.tables[half.index()].load_cycles();
        // The chain wants the deepest row first.
        for image in rows.iter().rev() {
            self.write_register(low, image.low_word())?;
            if self.layout.split_words() {
                self.write_register(high, image.high_word())?;
            }
            for _ in 0..pacing {
                let ctx = Context::new(clock.now());
                self.tick(&ctx, InputVector::ZERO);
                clock.advance(1);
            }
        }
        Ok(())
    }

    /// A serializable snapshot of everything the host can observe.
    pub fn status(&self) -> PrismStatus {
        PrismStatus {
            enabled: self.enable,
            fracture: self.fracture,
            dual_compare: self.dual_compare,
            irq: self.irq,
            inputs: self.last_inputs,
            outputs: self.last_outputs,
            shards: ShardId::both().map(|shard| {
                let i = shard.index();
                ShardStatus {
                    shard,
                    index: self.shards[i].index,
                    halted: self.debug[i].halted,
                    reason: self.debug[i].reason,
                    loop_anchor: self.shards[i].anchor,
                    latched_breakpoints: [
                        self.debug[i].breakpoints[0].latched,
                        self.debug[i].breakpoints[1].latched,
                    ],
                }
            }),
            loaders: ShardId::both()
                .map(|shard| LoaderStatus { busy: self.tables[shard.index()].busy() }),
        }
    }
}
