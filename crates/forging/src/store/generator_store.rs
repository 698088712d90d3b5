//! Buffered overlay over the node's key-value storage
//!
//! Writes are staged in memory and only reach storage when the caller
//! finalizes them into an atomic batch. A forge attempt stages its
//! reveal consumption and fork-safety update while the block is still
//! being built; if construction fails, the staged entries are
//! discarded and storage is untouched. If the process dies before the
//! batch commits, the node resumes as if the attempt never happened;
//! that is safe, it simply re-derives the same reveal.

use crate::domain::entities::{ForkSafetyRecord, RegisteredOnionSeed, UsedHashOnion};
use crate::error::Result;
use crate::ports::outbound::{BatchOperation, KeyValueStore, StorageError};
use crate::store::codec;
use std::collections::HashMap;

/// Storage key of the consumed-reveal record list.
pub const KEY_USED_HASH_ONION: &[u8] = b"forger:usedHashOnion";

/// Storage key of the registered onion seed list.
pub const KEY_REGISTERED_HASH_ONION: &[u8] = b"forger:registeredHashOnion";

/// Storage key of the fork-safety record list.
pub const KEY_PREVIOUSLY_FORGED: &[u8] = b"forger:previouslyForged";

/// Buffered key-value overlay with atomic batch commit.
#[derive(Debug)]
pub struct GeneratorStore<KV: KeyValueStore> {
    kv: KV,
    staged: HashMap<Vec<u8>, Vec<u8>>,
    cache: HashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<KV: KeyValueStore> GeneratorStore<KV> {
    /// Wrap a storage adapter.
    pub fn new(kv: KV) -> Self {
        Self {
            kv,
            staged: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Read a value: staged writes win, then the read cache, then the
    /// underlying store (caching the result).
    pub fn get(&mut self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StorageError> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.clone());
        }
        let value = self.kv.get(key)?;
        self.cache.insert(key.to_vec(), value.clone());
        Ok(value)
    }

    /// Stage a write. Storage is not touched until [`Self::finalize`]
    /// and [`Self::commit`].
    pub fn stage(&mut self, key: &[u8], value: Vec<u8>) {
        self.staged.insert(key.to_vec(), value);
    }

    /// Move every staged entry into `batch` and absorb it into the
    /// read cache. The caller decides when (and whether) to commit.
    pub fn finalize(&mut self, batch: &mut Vec<BatchOperation>) {
        for (key, value) in self.staged.drain() {
            self.cache.insert(key.clone(), Some(value.clone()));
            batch.push(BatchOperation::put(key, value));
        }
    }

    /// Apply a finalized batch atomically to the underlying store.
    pub fn commit(&mut self, batch: Vec<BatchOperation>) -> std::result::Result<(), StorageError> {
        self.kv.atomic_batch_write(batch)
    }

    /// Throw away staged writes from an abandoned attempt.
    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Number of staged, uncommitted entries.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    // Typed record accessors. A missing key decodes as an empty list:
    // all three records are created lazily on first use.

    /// Consumed hash-onion reveals.
    pub fn used_hash_onions(&mut self) -> Result<Vec<UsedHashOnion>> {
        self.records(KEY_USED_HASH_ONION)
    }

    /// Stage the consumed-reveal list.
    pub fn stage_used_hash_onions(&mut self, records: &[UsedHashOnion]) -> Result<()> {
        self.stage(KEY_USED_HASH_ONION, codec::encode_records(records)?);
        Ok(())
    }

    /// Registered onion seed anchors.
    pub fn registered_onion_seeds(&mut self) -> Result<Vec<RegisteredOnionSeed>> {
        self.records(KEY_REGISTERED_HASH_ONION)
    }

    /// Stage the registered onion seed list.
    pub fn stage_registered_onion_seeds(&mut self, records: &[RegisteredOnionSeed]) -> Result<()> {
        self.stage(KEY_REGISTERED_HASH_ONION, codec::encode_records(records)?);
        Ok(())
    }

    /// Fork-safety records.
    pub fn fork_safety_records(&mut self) -> Result<Vec<ForkSafetyRecord>> {
        self.records(KEY_PREVIOUSLY_FORGED)
    }

    /// Stage the fork-safety record list.
    pub fn stage_fork_safety_records(&mut self, records: &[ForkSafetyRecord]) -> Result<()> {
        self.stage(KEY_PREVIOUSLY_FORGED, codec::encode_records(records)?);
        Ok(())
    }

    fn records<T: serde::de::DeserializeOwned>(&mut self, key: &[u8]) -> Result<Vec<T>> {
        match self.get(key)? {
            Some(bytes) => codec::decode_records(&bytes),
            None => Ok(Vec::new()),
        }
    }
}
