//! Hexagonal architecture interfaces
//!
//! - `inbound`: what callers (admin endpoint, node runtime) drive
//! - `outbound`: what the engine requires from its collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::{ForgingApi, ForgingStatusUpdate};
pub use outbound::{
    BatchOperation, BlockProcessor, ChainReader, ChainTip, ConsensusReader, EventPublisher,
    ForgerOracle, InMemoryKVStore, KeyValueStore, StateSnapshot, StorageError,
    TransactionApplyError, TransactionPoolReader,
};
