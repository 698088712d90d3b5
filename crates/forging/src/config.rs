//! Configuration types for the forging engine

use serde::Deserialize;
use shared_crypto::passphrase::EncryptedMessage;
use shared_crypto::OnionValue;
use shared_types::Address;

/// Default slot duration in seconds
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 10;

/// Default seconds to wait inside a slot for a lagging chain tip before
/// forging over it
pub const DEFAULT_WAIT_THRESHOLD_SECS: u64 = 2;

/// Runtime configuration for the forging engine
#[derive(Clone, Debug, Deserialize)]
pub struct ForgingConfig {
    /// Generators this node may forge for
    pub generators: Vec<GeneratorConfig>,

    /// Seconds to wait inside the current slot for a pending block to
    /// arrive before forging over a lagging chain tip
    pub wait_threshold_secs: u64,

    /// Legacy behavior on onion exhaustion mid-operation: fall back to
    /// a random seed reveal with the index reset to 0. Off by default,
    /// the engine refuses to forge for an exhausted onion instead.
    pub allow_exhausted_fallback: bool,

    /// Slot timing
    pub slots: SlotConfig,
}

impl Default for ForgingConfig {
    fn default() -> Self {
        Self {
            generators: Vec::new(),
            wait_threshold_secs: DEFAULT_WAIT_THRESHOLD_SECS,
            allow_exhausted_fallback: false,
            slots: SlotConfig::default(),
        }
    }
}

/// Slot timing configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SlotConfig {
    /// Unix timestamp of the first slot's start
    pub genesis_timestamp: u64,

    /// Slot duration in seconds
    pub block_time_secs: u64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: 0,
            block_time_secs: DEFAULT_BLOCK_TIME_SECS,
        }
    }
}

/// Per-generator configuration supplied by the operator
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratorConfig {
    /// Generator account address
    pub address: Address,

    /// Ed25519 signing seed, encrypted under the operator password
    pub encrypted_seed: EncryptedMessage,

    /// The generator's hash onion
    pub hash_onion: HashOnionConfig,
}

/// A precomputed hash onion: the total reveal budget, the checkpoint
/// spacing, and the checkpoint anchors (first reveal first, seed last).
#[derive(Clone, Debug, Deserialize)]
pub struct HashOnionConfig {
    /// Total number of reveals this onion supports
    pub count: u32,

    /// Number of reveals between adjacent checkpoints
    pub distance: u32,

    /// Checkpoint anchors, `count / distance + 1` of them
    pub hashes: Vec<OnionValue>,
}

impl HashOnionConfig {
    /// Check structural consistency of the onion parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.distance == 0 {
            return Err("distance must be non-zero".into());
        }
        if self.count < self.distance {
            return Err(format!(
                "count {} is smaller than distance {}",
                self.count, self.distance
            ));
        }
        if self.count % self.distance != 0 {
            return Err(format!(
                "count {} is not a multiple of distance {}",
                self.count, self.distance
            ));
        }
        let expected = (self.count / self.distance + 1) as usize;
        if self.hashes.len() != expected {
            return Err(format!(
                "expected {} checkpoints, found {}",
                expected,
                self.hashes.len()
            ));
        }
        Ok(())
    }

    /// The checkpoint the operator registered the onion under: the
    /// seed-side anchor, used to detect onion replacement. `None` only
    /// for configurations that fail [`Self::validate`].
    pub fn seed_checkpoint(&self) -> Option<&OnionValue> {
        self.hashes.last()
    }
}
