//! Shared mock adapters and fixtures for integration flows
//!
//! Every outbound port of the forging engine gets a controllable
//! in-memory implementation, plus a storage wrapper that survives
//! service restarts so crash/restart flows can reuse the same data.

use async_trait::async_trait;
use meridian_forging::ports::outbound::{
    BatchOperation, BlockProcessor, ChainReader, ChainTip, ConsensusReader, EventPublisher,
    ForgerOracle, InMemoryKVStore, KeyValueStore, StateSnapshot, StorageError,
    TransactionApplyError, TransactionPoolReader,
};
use meridian_forging::{
    BlockForgedEvent, ForgingConfig, ForgingService, GeneratorConfig, HashOnionConfig, Result,
    SlotConfig,
};
use shared_crypto::{Ed25519KeyPair, OnionValue};
use shared_types::{Address, Block, BlockHeader, Hash, PooledTransaction};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Genesis timestamp used by every flow.
pub const GENESIS: u64 = 10_000;

/// Slot duration used by every flow.
pub const BLOCK_TIME: u64 = 10;

/// Route engine logs through a subscriber honoring `RUST_LOG`, once
/// per test process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Storage that survives a simulated node restart: cloning shares the
/// same underlying map.
#[derive(Clone, Default)]
pub struct SharedKv(Arc<Mutex<InMemoryKVStore>>);

impl SharedKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw read, bypassing any service overlay.
    pub fn raw_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.lock().unwrap().get(key).unwrap()
    }
}

impl KeyValueStore for SharedKv {
    fn get(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StorageError> {
        self.0.lock().unwrap().get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::result::Result<(), StorageError> {
        self.0.lock().unwrap().put(key, value)
    }

    fn atomic_batch_write(
        &mut self,
        operations: Vec<BatchOperation>,
    ) -> std::result::Result<(), StorageError> {
        self.0.lock().unwrap().atomic_batch_write(operations)
    }
}

/// Snapshot that accepts everything except configured transaction ids.
pub struct MockState {
    rejected: Vec<Hash>,
}

#[async_trait]
impl StateSnapshot for MockState {
    async fn apply(
        &mut self,
        tx: &PooledTransaction,
    ) -> std::result::Result<(), TransactionApplyError> {
        if self.rejected.contains(&tx.id) {
            return Err(TransactionApplyError::new("rejected by fixture"));
        }
        Ok(())
    }
}

/// Controllable chain reader.
pub struct MockChain {
    pub tip: Mutex<ChainTip>,
    pub max_payload_bytes: u64,
    pub base_reward: u64,
    pub rejected_tx_ids: Mutex<Vec<Hash>>,
}

impl MockChain {
    pub fn new(tip: ChainTip) -> Self {
        Self {
            tip: Mutex::new(tip),
            max_payload_bytes: 15 * 1024,
            base_reward: 500_000_000,
            rejected_tx_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn set_tip(&self, tip: ChainTip) {
        *self.tip.lock().unwrap() = tip;
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn chain_tip(&self) -> Result<ChainTip> {
        Ok(*self.tip.lock().unwrap())
    }

    fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    fn network_id(&self) -> Hash {
        [0x4Du8; 32]
    }

    async fn base_reward(&self, _height: u64) -> Result<u64> {
        Ok(self.base_reward)
    }

    async fn state_snapshot(&self) -> Result<Box<dyn StateSnapshot>> {
        Ok(Box::new(MockState {
            rejected: self.rejected_tx_ids.lock().unwrap().clone(),
        }))
    }
}

/// Controllable consensus/finality reader.
pub struct MockConsensus {
    pub synced: AtomicBool,
    pub finalized_height: AtomicU64,
    pub max_height_prevoted: AtomicU64,
    pub seed_reveal_valid: AtomicBool,
    pub bft_compliant: AtomicBool,
}

impl Default for MockConsensus {
    fn default() -> Self {
        Self {
            synced: AtomicBool::new(true),
            finalized_height: AtomicU64::new(0),
            max_height_prevoted: AtomicU64::new(0),
            seed_reveal_valid: AtomicBool::new(true),
            bft_compliant: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl ConsensusReader for MockConsensus {
    async fn finalized_height(&self) -> Result<u64> {
        Ok(self.finalized_height.load(Ordering::Relaxed))
    }

    async fn max_height_prevoted(&self) -> Result<u64> {
        Ok(self.max_height_prevoted.load(Ordering::Relaxed))
    }

    async fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    async fn is_seed_reveal_valid(&self, _address: &Address, _reveal: &OnionValue) -> Result<bool> {
        Ok(self.seed_reveal_valid.load(Ordering::Relaxed))
    }

    async fn is_bft_compliant(&self, _header: &BlockHeader) -> Result<bool> {
        Ok(self.bft_compliant.load(Ordering::Relaxed))
    }
}

/// Pool fixture serving preset sender groups.
#[derive(Default)]
pub struct MockPool {
    pub groups: Mutex<Vec<(Address, Vec<PooledTransaction>)>>,
}

#[async_trait]
impl TransactionPoolReader for MockPool {
    async fn processable_by_sender(&self) -> Result<Vec<(Address, Vec<PooledTransaction>)>> {
        Ok(self.groups.lock().unwrap().clone())
    }
}

/// Oracle fixture naming one entitled forger for every slot.
pub struct MockOracle {
    pub forger: Mutex<Address>,
}

#[async_trait]
impl ForgerOracle for MockOracle {
    async fn expected_forger(&self, _slot: u64) -> Result<Address> {
        Ok(*self.forger.lock().unwrap())
    }
}

/// Processor fixture recording every submitted block.
#[derive(Default)]
pub struct MockProcessor {
    pub processed: Mutex<Vec<Block>>,
}

#[async_trait]
impl BlockProcessor for MockProcessor {
    async fn process(&self, block: Block) -> Result<()> {
        self.processed.lock().unwrap().push(block);
        Ok(())
    }
}

/// Event sink recording published events.
#[derive(Default)]
pub struct MockEvents {
    pub events: Mutex<Vec<BlockForgedEvent>>,
}

#[async_trait]
impl EventPublisher for MockEvents {
    async fn publish_block_forged(&self, event: BlockForgedEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// One generator identity with its onion, credential and address.
pub struct Generator {
    pub address: Address,
    pub password: String,
    pub onion: HashOnionConfig,
    pub seed: OnionValue,
    pub public_key: [u8; 32],
}

impl Generator {
    /// Build a generator from a deterministic key seed and a freshly
    /// minted onion.
    pub fn create(key_seed: u8, onion_count: u32, onion_distance: u32) -> (Self, GeneratorConfig) {
        let keypair = Ed25519KeyPair::from_seed([key_seed; 32]);
        let public_key = *keypair.public_key().as_bytes();
        let address = shared_crypto::address_from_public_key(&public_key);
        let password = format!("operator-password-{key_seed}");

        let onion_seed: OnionValue = [key_seed; 16];
        let hashes = shared_crypto::hash_onion(&onion_seed, onion_count, onion_distance).unwrap();
        let onion = HashOnionConfig {
            count: onion_count,
            distance: onion_distance,
            hashes,
        };

        let encrypted_seed =
            shared_crypto::encrypt_with_password(&password, &keypair.to_seed()).unwrap();

        let config = GeneratorConfig {
            address,
            encrypted_seed,
            hash_onion: onion.clone(),
        };

        (
            Self {
                address,
                password,
                onion,
                seed: onion_seed,
                public_key,
            },
            config,
        )
    }
}

/// A fully wired service plus handles to its mock collaborators.
pub struct Harness {
    pub service: ForgingService<SharedKv>,
    pub kv: SharedKv,
    pub chain: Arc<MockChain>,
    pub consensus: Arc<MockConsensus>,
    pub pool: Arc<MockPool>,
    pub oracle: Arc<MockOracle>,
    pub processor: Arc<MockProcessor>,
    pub events: Arc<MockEvents>,
}

impl Harness {
    /// Wire a service over the given generators, with the chain tip
    /// at height 1 in slot 4, so a tick at slot 5 is expected to
    /// forge height 2.
    pub fn new(generator_configs: Vec<GeneratorConfig>, forger: Address, kv: SharedKv) -> Self {
        init_tracing();

        let tip = ChainTip {
            id: [0xAB; 32],
            height: 1,
            timestamp: slot_time(4),
        };

        let chain = Arc::new(MockChain::new(tip));
        let consensus = Arc::new(MockConsensus::default());
        let pool = Arc::new(MockPool::default());
        let oracle = Arc::new(MockOracle {
            forger: Mutex::new(forger),
        });
        let processor = Arc::new(MockProcessor::default());
        let events = Arc::new(MockEvents::default());

        let config = ForgingConfig {
            generators: generator_configs,
            wait_threshold_secs: 2,
            allow_exhausted_fallback: false,
            slots: SlotConfig {
                genesis_timestamp: GENESIS,
                block_time_secs: BLOCK_TIME,
            },
        };

        let service = ForgingService::new(
            config,
            kv.clone(),
            chain.clone(),
            consensus.clone(),
            pool.clone(),
            oracle.clone(),
            processor.clone(),
            events.clone(),
        );

        Self {
            service,
            kv,
            chain,
            consensus,
            pool,
            oracle,
            processor,
            events,
        }
    }
}

/// Start of `slot` in wall-clock seconds.
pub fn slot_time(slot: u64) -> u64 {
    GENESIS + slot * BLOCK_TIME
}

/// A pool transaction fixture.
pub fn pooled_tx(sender: Address, nonce: u64, fee: u64, size: u32) -> PooledTransaction {
    let mut id = [0u8; 32];
    id[..20].copy_from_slice(&sender);
    id[20] = nonce as u8;
    PooledTransaction {
        id,
        sender,
        nonce,
        fee,
        size,
        payload: vec![0u8; size as usize],
    }
}
