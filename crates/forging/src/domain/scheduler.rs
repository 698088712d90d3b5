//! Slot arithmetic and the per-tick forge/skip decision
//!
//! The decision itself is a pure function over a [`SlotContext`]; the
//! service assembles the context from its collaborators and acts on
//! the returned [`SlotDecision`]. Keeping the logic synchronous makes
//! every branch testable without real time.

use crate::config::SlotConfig;

/// Maps wall-clock time onto discrete forging slots.
#[derive(Clone, Copy, Debug)]
pub struct SlotClock {
    genesis_timestamp: u64,
    block_time_secs: u64,
}

impl SlotClock {
    /// Build a clock from the slot configuration.
    pub fn new(config: &SlotConfig) -> Self {
        Self {
            genesis_timestamp: config.genesis_timestamp,
            // A zero block time would divide by zero on every tick
            block_time_secs: config.block_time_secs.max(1),
        }
    }

    /// Slot number containing `timestamp`. Times before genesis map to
    /// slot 0.
    pub fn slot_for(&self, timestamp: u64) -> u64 {
        timestamp.saturating_sub(self.genesis_timestamp) / self.block_time_secs
    }

    /// Unix timestamp at which `slot` begins.
    pub fn slot_start(&self, slot: u64) -> u64 {
        self.genesis_timestamp + slot * self.block_time_secs
    }

    /// Seconds elapsed inside the slot containing `timestamp`.
    pub fn seconds_into_slot(&self, timestamp: u64) -> u64 {
        timestamp.saturating_sub(self.genesis_timestamp) % self.block_time_secs
    }
}

/// Everything the tick decision depends on.
#[derive(Clone, Copy, Debug)]
pub struct SlotContext {
    /// Slot containing the current wall-clock time
    pub current_slot: u64,
    /// Slot of the chain tip
    pub last_block_slot: u64,
    /// Whether the entitled forger's keypair is loaded locally
    pub keypair_loaded: bool,
    /// Seconds elapsed inside the current slot
    pub seconds_into_slot: u64,
    /// Configured wait threshold for a lagging chain tip
    pub wait_threshold_secs: u64,
}

/// Why a tick produced no block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// A block for the current slot already exists
    SlotAlreadyFilled,
    /// The entitled forger has no keypair loaded on this node
    NoKeypairLoaded,
    /// The tip lags more than one slot; give the network time to
    /// deliver the pending block before forging a competing one
    AwaitingLaggingChain,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::SlotAlreadyFilled => "slot already filled",
            Self::NoKeypairLoaded => "no keypair loaded for entitled forger",
            Self::AwaitingLaggingChain => "awaiting lagging chain tip",
        };
        f.write_str(reason)
    }
}

/// Outcome of one tick evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotDecision {
    /// Do nothing this tick
    Skip(SkipReason),
    /// Assemble, sign and submit a block for the current slot
    Forge,
}

/// Evaluate one tick: skip if the slot is already filled, if the
/// entitled forger is not loaded locally, or if a lagging tip should
/// be given more time; otherwise forge.
pub fn evaluate(ctx: &SlotContext) -> SlotDecision {
    if ctx.current_slot == ctx.last_block_slot {
        return SlotDecision::Skip(SkipReason::SlotAlreadyFilled);
    }

    if !ctx.keypair_loaded {
        return SlotDecision::Skip(SkipReason::NoKeypairLoaded);
    }

    let tip_lags = ctx.last_block_slot + 1 < ctx.current_slot;
    if tip_lags && ctx.seconds_into_slot < ctx.wait_threshold_secs {
        return SlotDecision::Skip(SkipReason::AwaitingLaggingChain);
    }

    SlotDecision::Forge
}
