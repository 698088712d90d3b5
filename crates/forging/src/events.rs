//! Event types published by the forging engine

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Emitted after a forged block has been handed to the processor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockForgedEvent {
    /// Generator address that forged the block
    pub address: Address,
    /// Height of the forged block
    pub height: u64,
    /// Slot the block was forged in
    pub slot: u64,
    /// Hash-onion index disclosed in the block
    pub reveal_index: u32,
    /// Number of included transactions
    pub transaction_count: usize,
    /// Final reward after protocol penalties
    pub reward: u64,
}
