//! # Core Domain Entities
//!
//! The canonical shapes of blocks and pooled transactions as they move
//! between subsystems. The forging engine assembles [`Block`]s from
//! [`PooledTransaction`]s; the chain and consensus subsystems consume
//! them.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A 32-byte BLAKE3 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte account address, derived from the public key hash.
pub type Address = [u8; 20];

/// A 16-byte hash-onion reveal value carried in a block's assets.
pub type SeedReveal = [u8; 16];

/// The header of a forged block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version for this block.
    pub version: u16,
    /// Block height in the chain.
    pub height: u64,
    /// Unix timestamp of the slot this block was forged in.
    pub timestamp: u64,
    /// Identifier of the parent block.
    pub previous_block_id: Hash,
    /// Root hash over the included transaction identifiers.
    pub transaction_root: Hash,
    /// Public key of the generator that forged this block.
    pub generator_public_key: PublicKey,
    /// Block reward in base units, after any protocol penalties.
    pub reward: u64,
    /// Consensus-relevant assets committed by the generator.
    pub assets: BlockAssets,
    /// Generator's signature over the unsigned header.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// Consensus assets a generator commits inside the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockAssets {
    /// The hash-onion value disclosed for this block.
    pub seed_reveal: SeedReveal,
    /// Highest prevoted height observed by the generator at forge time.
    pub max_height_prevoted: u64,
    /// Height this generator last forged at before this block.
    pub max_height_previously_forged: u64,
}

/// A complete forged block handed to the block processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The signed block header.
    pub header: BlockHeader,
    /// Transactions included in this block, in selection order.
    pub transactions: Vec<PooledTransaction>,
}

impl Block {
    /// Total serialized payload size of the included transactions.
    pub fn payload_size(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.size as u64).sum()
    }
}

/// A processable transaction as served by the transaction pool.
///
/// The pool guarantees that per-sender queues are ordered by ascending
/// `nonce`; the payload stays opaque to the forging engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PooledTransaction {
    /// Transaction identifier (hash of the serialized payload).
    pub id: Hash,
    /// Sender address.
    pub sender: Address,
    /// Sender's sequence number.
    pub nonce: u64,
    /// Fee offered, in base units.
    pub fee: u64,
    /// Serialized size in bytes, counted against the block payload budget.
    pub size: u32,
    /// Opaque serialized transaction.
    pub payload: Vec<u8>,
}
