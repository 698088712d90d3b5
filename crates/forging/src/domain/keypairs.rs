//! In-memory store of loaded generator keypairs
//!
//! Populated on forging-status enable, emptied on disable. Owned
//! exclusively by the forging service; nothing else mutates it.

use super::entities::{ForgingStatus, GeneratorKeypair};
use shared_types::Address;
use std::collections::HashMap;

/// Address-keyed map of decrypted signing identities.
#[derive(Debug, Default)]
pub struct KeypairStore {
    keypairs: HashMap<Address, GeneratorKeypair>,
}

impl KeypairStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the keypair for its address.
    pub fn add(&mut self, keypair: GeneratorKeypair) {
        self.keypairs.insert(keypair.address, keypair);
    }

    /// Remove the keypair for `address`. Dropping it zeroizes the
    /// secret seed.
    pub fn remove(&mut self, address: &Address) {
        self.keypairs.remove(address);
    }

    /// Look up the keypair for `address`.
    pub fn get(&self, address: &Address) -> Option<&GeneratorKeypair> {
        self.keypairs.get(address)
    }

    /// Whether a keypair is loaded for `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.keypairs.contains_key(address)
    }

    /// Number of loaded keypairs.
    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    /// Whether no keypair is loaded.
    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }

    /// Status of every configured address against the loaded map.
    pub fn snapshot(&self, configured: &[Address]) -> Vec<ForgingStatus> {
        configured
            .iter()
            .map(|address| ForgingStatus {
                address: *address,
                forging: self.contains(address),
            })
            .collect()
    }
}
