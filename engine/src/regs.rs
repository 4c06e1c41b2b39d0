//! The host-visible register interface.
//!
//! All host interaction goes through 32-bit registers at word-aligned
//! offsets.  Reads never change machine state.
//!
//! | Offset | Name       | Access | Contents                                             |
//! |--------|------------|--------|------------------------------------------------------|
//! | `0x00` | CTRL       | RW     | 0 enable, 1 fracture, 2 dual-compare, 3 clear-irq strobe, 31 soft-reset strobe |
//! | `0x04` | STAT       | RO     | 0 irq, 1-2 shard halted, 4-5 loader busy             |
//! | `0x10` | TAB0_LOW   | RW     | table 0 low staging window; reads the tail slot      |
//! | `0x14` | TAB0_HIGH  | RW     | table 0 high staging window (the triggering write)   |
//! | `0x18` | TAB1_LOW   | RW     | table 1 low staging window                           |
//! | `0x1c` | TAB1_HIGH  | RW     | table 1 high staging window                          |
//! | `0x20` | OUT_MASK0  | RW     | shard 0 static/jump output mask                      |
//! | `0x24` | COND_MASK0 | RW     | shard 0 conditional output mask                      |
//! | `0x28` | OUT_MASK1  | RW     | shard 1 static/jump output mask                      |
//! | `0x2c` | COND_MASK1 | RW     | shard 1 conditional output mask                      |
//! | `0x30` | DBG_CTRL0  | RW     | 7-0 bp0 value, 15-8 bp1 value, 16 bp0 enable, 17 bp1 enable, 18 halt request, 19 step toggle |
//! | `0x34` | DBG_FORCE0 | WO     | forced index, lands three cycles later               |
//! | `0x38` | DBG_OUT0   | WO     | output override, lands three cycles later            |
//! | `0x3c` | DBG_STAT0  | RO     | 7-0 current index, 15-8 next preview, 16 halted, 17-18 bp latched, 19 step pending |
//! | `0x40` | DBG_CTRL1  | RW     | as DBG_CTRL0, for shard 1                            |
//! | `0x44` | DBG_FORCE1 | WO     |                                                      |
//! | `0x48` | DBG_OUT1   | WO     |                                                      |
//! | `0x4c` | DBG_STAT1  | RO     |                                                      |
//! | `0x50` | RAW_OUT    | RO     | composite output bus as of the last cycle            |
//! | `0x54` | RAW_IN     | RO     | input vector latched on the last cycle               |
//! | `0x58` | TRACE0     | RO     | 1-0 lane 0 inputs, 2 lane 0 match, 4-3 lane 1 inputs, 5 lane 1 match, 8-6 transition kind |
//! | `0x5c` | TRACE1     | RO     | as TRACE0, for shard 1                               |
//!
//! Unlisted offsets are unmapped.  Reserved bits in RW registers are
//! masked on write and read back as zero.
use std::error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use base::prelude::*;

use crate::prism::Prism;

pub const CTRL: u32 = 0x00;
pub const STAT: u32 = 0x04;
pub const TAB0_LOW: u32 = 0x10;
pub const TAB0_HIGH: u32 = 0x14;
pub const TAB1_LOW: u32 = 0x18;
pub const TAB1_HIGH: u32 = 0x1c;
pub const OUT_MASK0: u32 = 0x20;
pub const COND_MASK0: u32 = 0x24;
pub const OUT_MASK1: u32 = 0x28;
pub const COND_MASK1: u32 = 0x2c;
pub const DBG_CTRL0: u32 = 0x30;
pub const DBG_FORCE0: u32 = 0x34;
pub const DBG_OUT0: u32 = 0x38;
pub const DBG_STAT0: u32 = 0x3c;
pub const DBG_CTRL1: u32 = 0x40;
pub const DBG_FORCE1: u32 = 0x44;
pub const DBG_OUT1: u32 = 0x48;
pub const DBG_STAT1: u32 = 0x4c;
pub const RAW_OUT: u32 = 0x50;
pub const RAW_IN: u32 = 0x54;
pub const TRACE0: u32 = 0x58;
pub const TRACE1: u32 = 0x5c;

pub const CTRL_ENABLE: u32 = 1;
pub const CTRL_FRACTURE: u32 = 1 << 1;
pub const CTRL_DUAL_COMPARE: u32 = 1 << 2;
pub const CTRL_CLEAR_IRQ: u32 = 1 << 3;
pub const CTRL_RESET: u32 = 1 << 31;

pub const STAT_IRQ: u32 = 1;

pub const DBG_CTRL_BP0_ENABLE: u32 = 1 << 16;
pub const DBG_CTRL_BP1_ENABLE: u32 = 1 << 17;
pub const DBG_CTRL_HALT_REQUEST: u32 = 1 << 18;
pub const DBG_CTRL_STEP: u32 = 1 << 19;

/// A rejected bus access.  The machine itself is unaffected; the
/// fault is the caller's to deal with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    NotMapped(u32),
    ReadOnly(u32),
    WriteOnly(u32),
}

impl Display for BusFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BusFault::NotMapped(offset) => {
                write!(f, "no register is mapped at offset {offset:#04x}")
            }
            BusFault::ReadOnly(offset) => {
                write!(f, "the register at offset {offset:#04x} is read-only")
            }
            BusFault::WriteOnly(offset) => {
                write!(f, "the register at offset {offset:#04x} is write-only")
            }
        }
    }
}

impl error::Error for BusFault {}

impl Prism {
    /// Read the register at `offset`.  Reads are free of side
    /// effects, so a poll loop can watch STAT without perturbing the
    /// machine.
    pub fn read_register(&self, offset: u32) -> Result<u32, BusFault> {
        match offset {
            CTRL => Ok(u32::from(self.enable)
                | u32::from(self.fracture) << 1
                | u32::from(self.dual_compare) << 2),
            STAT => Ok(u32::from(self.irq)
                | u32::from(self.debug[0].halted) << 1
                | u32::from(self.debug[1].halted) << 2
                | u32::from(self.tables[0].busy()) << 4
                | u32::from(self.tables[1].busy()) << 5),
            TAB0_LOW => Ok(self.tables[0].tail_row().low_word()),
            TAB0_HIGH => Ok(self.tables[0].tail_row().high_word()),
            TAB1_LOW => Ok(self.tables[1].tail_row().low_word()),
            TAB1_HIGH => Ok(self.tables[1].tail_row().high_word()),
            OUT_MASK0 => Ok(self.out_mask[0]),
            COND_MASK0 => Ok(self.cond_mask[0]),
            OUT_MASK1 => Ok(self.out_mask[1]),
            COND_MASK1 => Ok(self.cond_mask[1]),
            DBG_CTRL0 => Ok(self.read_debug_ctrl(ShardId::Zero)),
            DBG_CTRL1 => Ok(self.read_debug_ctrl(ShardId::One)),
            DBG_STAT0 => Ok(self.read_debug_stat(ShardId::Zero)),
            DBG_STAT1 => Ok(self.read_debug_stat(ShardId::One)),
            DBG_FORCE0 | DBG_OUT0 | DBG_FORCE1 | DBG_OUT1 => Err(BusFault::WriteOnly(offset)),
            RAW_OUT => Ok(self.last_outputs.bits()),
            RAW_IN => Ok(self.last_inputs.bits()),
            TRACE0 => Ok(self.read_trace(ShardId::Zero)),
            TRACE1 => Ok(self.read_trace(ShardId::One)),
            _ => Err(BusFault::NotMapped(offset)),
        }
    }

    /// Write the register at `offset`.  Writes take effect between
    /// cycles; anything routed through a debug pipe lands three
    /// cycles after the tick that follows.
    pub fn write_register(&mut self, offset: u32, value: u32) -> Result<(), BusFault> {
        match offset {
            CTRL => {
                self.write_ctrl(value);
                Ok(())
            }
            TAB0_LOW => {
                self.tables[0].write_low(value);
                Ok(())
            }
            TAB0_HIGH => {
                self.tables[0].write_high(value);
                Ok(())
            }
            TAB1_LOW => {
                self.tables[1].write_low(value);
                Ok(())
            }
            TAB1_HIGH => {
                self.tables[1].write_high(value);
                Ok(())
            }
            OUT_MASK0 => {
                self.out_mask[0] = value & self.geometry.output_mask();
                self.warn_on_mask_overlap();
                Ok(())
            }
            COND_MASK0 => {
                self.cond_mask[0] = value & self.geometry.output_mask();
                self.warn_on_mask_overlap();
                Ok(())
            }
            OUT_MASK1 => {
                self.out_mask[1] = value & self.geometry.output_mask();
                self.warn_on_mask_overlap();
                Ok(())
            }
            COND_MASK1 => {
                self.cond_mask[1] = value & self.geometry.output_mask();
                self.warn_on_mask_overlap();
                Ok(())
            }
            DBG_CTRL0 => {
                self.write_debug_ctrl(ShardId::Zero, value);
                Ok(())
            }
            DBG_CTRL1 => {
                self.write_debug_ctrl(ShardId::One, value);
                Ok(())
            }
            DBG_FORCE0 => {
                self.schedule_forced_index(ShardId::Zero, value);
                Ok(())
            }
            DBG_FORCE1 => {
                self.schedule_forced_index(ShardId::One, value);
                Ok(())
            }
            DBG_OUT0 => {
                self.debug[0].out_pipe.schedule(OutputVector::new(value));
                Ok(())
            }
            DBG_OUT1 => {
                self.debug[1].out_pipe.schedule(OutputVector::new(value));
                Ok(())
            }
            STAT | DBG_STAT0 | DBG_STAT1 | RAW_OUT | RAW_IN | TRACE0 | TRACE1 => {
                Err(BusFault::ReadOnly(offset))
            }
            _ => Err(BusFault::NotMapped(offset)),
        }
    }

    fn write_ctrl(&mut self, value: u32) {
        if value & CTRL_CLEAR_IRQ != 0 {
            self.irq = false;
        }
        self.dual_compare = value & CTRL_DUAL_COMPARE != 0;
        self.set_fracture(value & CTRL_FRACTURE != 0);
        self.set_enable(value & CTRL_ENABLE != 0);
        // The reset strobe acts last, on top of whatever the other
        // bits just configured.
        if value & CTRL_RESET != 0 {
            self.soft_reset();
        }
    }

    fn warn_on_mask_overlap(&self) {
        let overlap =
            (self.out_mask[0] | self.cond_mask[0]) & (self.out_mask[1] | self.cond_mask[1]);
        if overlap != 0 {
            event!(
                Level::WARN,
                "shard output masks overlap on {:#010x}; overlapping bits drive the OR of both contributions",
                overlap
            );
        }
    }

    fn read_debug_ctrl(&self, shard: ShardId) -> u32 {
        let session = &self.debug[shard.index()];
        u32::from(session.breakpoints[0].value)
            | u32::from(session.breakpoints[1].value) << 8
            | u32::from(session.breakpoints[0].enabled) << 16
            | u32::from(session.breakpoints[1].enabled) << 17
            | u32::from(session.halt_request) << 18
            | u32::from(session.step_level) << 19
    }

    fn write_debug_ctrl(&mut self, shard: ShardId, value: u32) {
        let session = &mut self.debug[shard.index()];
        session.breakpoints[0].value = (value & 0xff) as u8;
        session.breakpoints[1].value = (value >> 8 & 0xff) as u8;
        session.breakpoints[0].enabled = value & DBG_CTRL_BP0_ENABLE != 0;
        session.breakpoints[1].enabled = value & DBG_CTRL_BP1_ENABLE != 0;
        session.halt_request = value & DBG_CTRL_HALT_REQUEST != 0;
        let step = value & DBG_CTRL_STEP != 0;
        if step && !session.step_level {
            event!(Level::DEBUG, "scheduling single-step for {}", shard);
            session.step_pipe.schedule(());
        }
        session.step_level = step;
    }

    fn schedule_forced_index(&mut self, shard: ShardId, value: u32) {
        let index = StateIndex::new((value & 0xff) as u8);
        event!(Level::DEBUG, "scheduling forced index {} for {}", index, shard);
        self.debug[shard.index()].force_pipe.schedule(index);
    }

    fn read_debug_stat(&self, shard: ShardId) -> u32 {
        let session = &self.debug[shard.index()];
        u32::from(self.shards[shard.index()].index)
            | u32::from(self.preview_next(shard)) << 8
            | u32::from(session.halted) << 16
            | u32::from(session.breakpoints[0].latched) << 17
            | u32::from(session.breakpoints[1].latched) << 18
            | u32::from(session.step_pipe.pending()) << 19
    }

    fn read_trace(&self, shard: ShardId) -> u32 {
        let trace = &self.trace[shard.index()];
        u32::from(trace.lanes[0].selected & 0b11)
            | u32::from(trace.lanes[0].matched) << 2
            | u32::from(trace.lanes[1].selected & 0b11) << 3
            | u32::from(trace.lanes[1].matched) << 5
            | trace.kind.code() << 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_offsets_fault() {
        let mut prism = Prism::new(Geometry::default());
        assert_eq!(prism.read_register(0x08), Err(BusFault::NotMapped(0x08)));
        assert_eq!(
            prism.write_register(0x60, 0),
            Err(BusFault::NotMapped(0x60))
        );
        assert_eq!(prism.read_register(STAT), Ok(0));
    }

    #[test]
    fn test_access_direction_faults() {
        let mut prism = Prism::new(Geometry::default());
        assert_eq!(
            prism.read_register(DBG_FORCE0),
            Err(BusFault::WriteOnly(DBG_FORCE0))
        );
        assert_eq!(
            prism.write_register(STAT, 1),
            Err(BusFault::ReadOnly(STAT))
        );
        assert_eq!(
            prism.write_register(TRACE1, 1),
            Err(BusFault::ReadOnly(TRACE1))
        );
    }

    #[test]
    fn test_ctrl_strobes_read_back_as_zero() {
        let mut prism = Prism::new(Geometry::default());
        prism
            .write_register(CTRL, CTRL_ENABLE | CTRL_CLEAR_IRQ)
            .expect("CTRL is mapped");
        assert_eq!(prism.read_register(CTRL), Ok(CTRL_ENABLE));
    }

    #[test]
    fn test_mask_writes_drop_reserved_bits() {
        // The reference geometry drives eight output pins.
        let mut prism = Prism::new(Geometry::default());
        prism
            .write_register(OUT_MASK0, 0xffff_ff0f)
            .expect("OUT_MASK0 is mapped");
        assert_eq!(prism.read_register(OUT_MASK0), Ok(0x0f));
    }

    #[test]
    fn test_fault_messages_name_the_offset() {
        assert_eq!(
            BusFault::NotMapped(0x08).to_string(),
            "no register is mapped at offset 0x08"
        );
        assert_eq!(
            BusFault::WriteOnly(DBG_OUT0).to_string(),
            "the register at offset 0x38 is write-only"
        );
    }
}
