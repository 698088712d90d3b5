//! Domain entities of the forging engine

use serde::{Deserialize, Serialize};
use shared_crypto::{Ed25519KeyPair, OnionValue};
use shared_types::{Address, PublicKey};

/// One consumed hash-onion reveal: which index was disclosed by which
/// address at which height. Accumulates per address; pruned against the
/// finalized height, always keeping the highest record as the
/// resumption point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedHashOnion {
    /// Generator address that consumed the reveal
    pub address: Address,
    /// Position of the disclosed value within the onion
    pub index: u32,
    /// Height of the block the reveal was disclosed in
    pub height: u64,
}

/// The seed-side checkpoint an address last registered its onion under.
/// A mismatch against the configured onion means the operator rotated
/// to a new onion and old usage records must be discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredOnionSeed {
    /// Generator address
    pub address: Address,
    /// Seed-side checkpoint of the registered onion
    pub seed_hash: OnionValue,
}

/// The highest state an address has ever signed a block at: the single
/// source of truth for fork safety across restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkSafetyRecord {
    /// Generator address
    pub address: Address,
    /// Highest height this address has forged at
    pub height: u64,
    /// Max prevoted height committed in that block
    pub max_height_prevoted: u64,
    /// Previously-forged height committed in that block
    pub max_height_previously_forged: u64,
}

/// The reveal selected for the next block: its onion position and the
/// disclosed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedReveal {
    /// Position within the onion's reveal budget
    pub index: u32,
    /// The onion value to embed in the block assets
    pub value: OnionValue,
}

/// Snapshot row returned to administrative callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ForgingStatus {
    /// Generator address
    pub address: Address,
    /// Whether a signing keypair is currently loaded for the address
    pub forging: bool,
}

/// A decrypted signing identity, held in memory only while forging is
/// enabled for the address.
pub struct GeneratorKeypair {
    /// Generator account address
    pub address: Address,
    /// Ed25519 public key
    pub public_key: PublicKey,
    keypair: Ed25519KeyPair,
}

impl GeneratorKeypair {
    /// Wrap a decrypted keypair for `address`.
    pub fn new(address: Address, keypair: Ed25519KeyPair) -> Self {
        let public_key = *keypair.public_key().as_bytes();
        Self {
            address,
            public_key,
            keypair,
        }
    }

    /// Sign a message with the generator's key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.keypair.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for GeneratorKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret material stays out of logs
        f.debug_struct("GeneratorKeypair")
            .field("address", &hex::encode(self.address))
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}
