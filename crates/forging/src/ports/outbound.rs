//! Outbound ports (driven side)
//!
//! Interfaces the forging engine requires from the host node: storage,
//! chain and consensus queries, the transaction pool, block processing
//! and event publication. Production adapters live in the node
//! runtime; in-memory test adapters live here next to the traits.

use crate::error::{ForgingError, Result};
use async_trait::async_trait;
use shared_crypto::OnionValue;
use shared_types::{Address, Block, BlockHeader, Hash, PooledTransaction};
use thiserror::Error;

/// Key-value storage failures surfaced by adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying storage engine I/O failure
    #[error("I/O error: {message}")]
    Io {
        /// Adapter-supplied description
        message: String,
    },

    /// An atomic batch could not be applied
    #[error("Batch write failed: {message}")]
    BatchFailed {
        /// Adapter-supplied description
        message: String,
    },
}

impl From<StorageError> for ForgingError {
    fn from(error: StorageError) -> Self {
        ForgingError::Storage(error.to_string())
    }
}

/// Abstract interface to the node's key-value storage engine.
///
/// ## Atomicity guarantee
///
/// Either ALL operations in a batch are applied, or none are. The
/// forging engine's crash safety depends on it: reveal consumption and
/// the fork-safety record must land together.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StorageError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> std::result::Result<(), StorageError>;

    /// Execute an atomic batch write.
    fn atomic_batch_write(
        &mut self,
        operations: Vec<BatchOperation>,
    ) -> std::result::Result<(), StorageError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put {
        /// Storage key
        key: Vec<u8>,
        /// Stored value
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// Storage key
        key: Vec<u8>,
    },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// In-memory key-value store for unit and integration tests.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: std::collections::HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::result::Result<(), StorageError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn atomic_batch_write(
        &mut self,
        operations: Vec<BatchOperation>,
    ) -> std::result::Result<(), StorageError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// The chain tip as seen by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainTip {
    /// Identifier of the tip block
    pub id: Hash,
    /// Height of the tip block
    pub height: u64,
    /// Timestamp of the tip block
    pub timestamp: u64,
}

/// Why a transaction failed to apply against the state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionApplyError {
    reason: String,
}

impl TransactionApplyError {
    /// Wrap an application failure reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for TransactionApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for TransactionApplyError {}

/// A disposable copy of chain state for speculative transaction
/// application. Discarded after selection; never committed.
#[async_trait]
pub trait StateSnapshot: Send {
    /// Apply one transaction, mutating only this snapshot.
    async fn apply(
        &mut self,
        tx: &PooledTransaction,
    ) -> std::result::Result<(), TransactionApplyError>;
}

/// Port: ledger/chain queries.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain tip.
    async fn chain_tip(&self) -> Result<ChainTip>;

    /// Maximum total transaction payload per block, in bytes.
    fn max_payload_bytes(&self) -> u64;

    /// Network identifier mixed into signing payloads.
    fn network_id(&self) -> Hash;

    /// Base block reward at `height`, before protocol penalties.
    async fn base_reward(&self, height: u64) -> Result<u64>;

    /// A fresh disposable state snapshot at the current tip.
    async fn state_snapshot(&self) -> Result<Box<dyn StateSnapshot>>;
}

/// Port: consensus and finality queries.
#[async_trait]
pub trait ConsensusReader: Send + Sync {
    /// Highest finalized height.
    async fn finalized_height(&self) -> Result<u64>;

    /// Highest prevoted height observed by the local BFT machinery.
    async fn max_height_prevoted(&self) -> Result<u64>;

    /// Whether the node is synced with the network.
    async fn is_synced(&self) -> bool;

    /// Whether `reveal` is a valid successor of the address's last
    /// disclosed onion value.
    async fn is_seed_reveal_valid(&self, address: &Address, reveal: &OnionValue) -> Result<bool>;

    /// Whether the unsigned header complies with the BFT protocol
    /// rules (violations cost the generator part of the reward).
    async fn is_bft_compliant(&self, header: &BlockHeader) -> Result<bool>;
}

/// Port: delegate-selection oracle deciding who may forge a slot.
#[async_trait]
pub trait ForgerOracle: Send + Sync {
    /// The address entitled to forge in `slot`.
    async fn expected_forger(&self, slot: u64) -> Result<Address>;
}

/// Port: the transaction pool's processable view.
#[async_trait]
pub trait TransactionPoolReader: Send + Sync {
    /// Processable transactions grouped per sender, each group ordered
    /// by ascending nonce.
    async fn processable_by_sender(&self) -> Result<Vec<(Address, Vec<PooledTransaction>)>>;
}

/// Port: hand a signed block to the processing pipeline.
#[async_trait]
pub trait BlockProcessor: Send + Sync {
    /// Validate, apply and broadcast a freshly forged block.
    async fn process(&self, block: Block) -> Result<()>;
}

/// Port: publish engine events to the host's event bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a block-forged notification.
    async fn publish_block_forged(&self, event: crate::events::BlockForgedEvent) -> Result<()>;
}
