//! # Meridian - Forging Engine
//!
//! **Bounded Context:** Block Production (delegated proof of stake)
//!
//! ## Purpose
//!
//! Once per time slot, decide whether this node is entitled to produce
//! the next block, assemble the block's transaction set, and prove the
//! generator has not produced two conflicting blocks at the same
//! height, across crashes and restarts. The engine combines:
//!
//! - hash-onion commit-reveal bookkeeping with checkpoint compression
//! - crash-safe, ordering-sensitive persistence of forging state
//! - fee-priority transaction selection against discardable state
//! - slot-based scheduling with a lagging-tip wait policy
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports                                              │
//! │  - Inbound: ForgingApi (status updates, ticks)      │
//! │  - Outbound: ChainReader, ConsensusReader, Pool,    │
//! │    ForgerOracle, BlockProcessor, KeyValueStore      │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Service                                            │
//! │  - ForgingService: load, status toggles, tick loop  │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (pure logic) + Store (buffered overlay)     │
//! │  - hash_onion, fork_safety, selector, scheduler     │
//! │  - GeneratorStore: stage → finalize → atomic commit │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Critical Invariants
//!
//! 1. **Monotonic reveals**: per address, reveal indices strictly grow
//!    with forged height
//! 2. **Fork safety**: never sign at a height at or below the recorded
//!    forged height for that address
//! 3. **Pruning**: finalized usage records are dropped, except each
//!    address's highest record (the resumption point)
//! 4. **Payload budget**: a selected transaction set never exceeds the
//!    chain's maximum payload size
//! 5. **Write ordering**: bookkeeping is flushed in one atomic batch
//!    strictly after the block is signed, never before
//!
//! ## Module Structure
//!
//! - [`domain`]: reveal derivation, fork-safety rules, transaction
//!   selection, slot decisions
//! - [`store`]: the buffered generator store and record codecs
//! - [`ports`]: hexagonal interfaces (inbound/outbound)
//! - [`service`]: orchestration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;
pub mod store;

mod error;
mod metrics;

pub use config::{ForgingConfig, GeneratorConfig, HashOnionConfig, SlotConfig};
pub use error::{ForgingError, Result};
pub use metrics::ForgingMetrics;

// Re-export commonly used types
pub use domain::{
    ForgingStatus, ForkSafetyRecord, KeypairStore, SeedReveal, SlotClock, SlotDecision,
    UsedHashOnion,
};

pub use ports::{
    BatchOperation, BlockProcessor, ChainReader, ChainTip, ConsensusReader, EventPublisher,
    ForgerOracle, ForgingApi, ForgingStatusUpdate, InMemoryKVStore, KeyValueStore, StateSnapshot,
    TransactionPoolReader,
};

pub use events::BlockForgedEvent;

pub use service::ForgingService;

/// Block header version produced by this engine
pub const BLOCK_VERSION: u16 = 2;
