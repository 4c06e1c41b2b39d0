//! Serializable snapshots of host-observable machine state.
use serde::Serialize;

use base::prelude::*;

use crate::debug::HaltReason;

#[derive(Debug, Clone, Serialize)]
pub struct PrismStatus {
    pub enabled: bool,
    pub fracture: bool,
    pub dual_compare: bool,
    pub irq: bool,
    pub inputs: InputVector,
    pub outputs: OutputVector,
    pub shards: [ShardStatus; 2],
    pub loaders: [LoaderStatus; 2],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShardStatus {
    pub shard: ShardId,
    pub index: StateIndex,
    pub halted: bool,
    pub reason: Option<HaltReason>,
    pub loop_anchor: Option<StateIndex>,
    pub latched_breakpoints: [bool; 2],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoaderStatus {
    pub busy: bool,
}
