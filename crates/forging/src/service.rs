//! The forging service
//!
//! Orchestrates the engine: loads and reconciles generator state at
//! startup, services forging-status changes from the admin endpoint,
//! and runs the per-slot tick that assembles, signs and submits
//! blocks.
//!
//! Ordering requirement honored throughout: bookkeeping writes (reveal
//! consumption, fork-safety record) stay staged in memory during block
//! construction and are flushed in one atomic batch only after the
//! block is fully signed. Crashing before the flush is safe, the node
//! re-derives the same reveal on restart. Flushing before signing
//! would waste a reveal and a height slot on a crash, so it is never
//! done.

use crate::{
    config::{ForgingConfig, GeneratorConfig},
    domain::{
        entities::{ForgingStatus, GeneratorKeypair, RegisteredOnionSeed, UsedHashOnion},
        fork_safety, hash_onion,
        scheduler::{evaluate, SlotClock, SlotContext, SlotDecision},
        selector::select_transactions,
        KeypairStore,
    },
    error::{ForgingError, Result},
    events::BlockForgedEvent,
    metrics::ForgingMetrics,
    ports::{
        inbound::{ForgingApi, ForgingStatusUpdate},
        outbound::{
            BlockProcessor, ChainReader, ChainTip, ConsensusReader, EventPublisher, ForgerOracle,
            KeyValueStore, TransactionPoolReader,
        },
    },
    store::{codec, GeneratorStore},
    BLOCK_VERSION,
};
use async_trait::async_trait;
use shared_crypto::hashing;
use shared_types::{Address, Block, BlockAssets, BlockHeader, Hash, PooledTransaction};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The forging engine's service implementation.
///
/// Owned by the node's scheduler task; all mutable state (the keypair
/// map and the generator store's write buffer) is accessed exclusively
/// through `&mut self`, so one tick always runs to completion before
/// the next begins.
pub struct ForgingService<KV: KeyValueStore> {
    config: ForgingConfig,
    clock: SlotClock,
    store: GeneratorStore<KV>,
    keypairs: KeypairStore,
    metrics: ForgingMetrics,
    chain: Arc<dyn ChainReader>,
    consensus: Arc<dyn ConsensusReader>,
    pool: Arc<dyn TransactionPoolReader>,
    oracle: Arc<dyn ForgerOracle>,
    processor: Arc<dyn BlockProcessor>,
    events: Arc<dyn EventPublisher>,
}

impl<KV: KeyValueStore> ForgingService<KV> {
    /// Create a service over a storage adapter and the collaborator
    /// ports.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ForgingConfig,
        kv: KV,
        chain: Arc<dyn ChainReader>,
        consensus: Arc<dyn ConsensusReader>,
        pool: Arc<dyn TransactionPoolReader>,
        oracle: Arc<dyn ForgerOracle>,
        processor: Arc<dyn BlockProcessor>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let clock = SlotClock::new(&config.slots);
        info!(
            generators = config.generators.len(),
            wait_threshold_secs = config.wait_threshold_secs,
            "initializing forging service"
        );

        Self {
            config,
            clock,
            store: GeneratorStore::new(kv),
            keypairs: KeypairStore::new(),
            metrics: ForgingMetrics::new(),
            chain,
            consensus,
            pool,
            oracle,
            processor,
            events,
        }
    }

    /// Engine counters.
    pub fn metrics(&self) -> &ForgingMetrics {
        &self.metrics
    }

    /// Reconcile configured hash onions against persisted state.
    ///
    /// For every configured generator: validate the onion, detect an
    /// operator-side onion replacement (registered seed anchor differs
    /// from the configured one, in which case usage records are
    /// discarded and the new anchor recorded), and refuse to start if the recorded usage
    /// already spent the onion.
    pub fn load_generators(&mut self) -> Result<()> {
        let generators = self.config.generators.clone();
        let mut used = self.store.used_hash_onions()?;
        let mut registered = self.store.registered_onion_seeds()?;
        let mut changed = false;

        for generator in &generators {
            let address_hex = hex::encode(generator.address);

            generator.hash_onion.validate().map_err(|reason| {
                ForgingError::InvalidOnionConfig {
                    address: address_hex.clone(),
                    reason,
                }
            })?;
            let seed_hash = *generator.hash_onion.seed_checkpoint().ok_or_else(|| {
                ForgingError::InvalidOnionConfig {
                    address: address_hex.clone(),
                    reason: "onion has no checkpoints".into(),
                }
            })?;

            match registered
                .iter_mut()
                .find(|seed| seed.address == generator.address)
            {
                Some(existing) if existing.seed_hash != seed_hash => {
                    warn!(
                        address = %address_hex,
                        "configured hash onion differs from the registered one; \
                         discarding old usage records"
                    );
                    used.retain(|record| record.address != generator.address);
                    existing.seed_hash = seed_hash;
                    changed = true;
                }
                Some(_) => {}
                None => {
                    debug!(address = %address_hex, "registering hash onion seed");
                    registered.push(RegisteredOnionSeed {
                        address: generator.address,
                        seed_hash,
                    });
                    changed = true;
                }
            }

            if let Some(record) = hash_onion::highest_used(&used, &generator.address) {
                if record.index >= generator.hash_onion.count {
                    return Err(ForgingError::OnionExhausted {
                        address: address_hex,
                        used: record.index,
                        total: generator.hash_onion.count,
                    });
                }
            }
        }

        if changed {
            self.store.stage_used_hash_onions(&used)?;
            self.store.stage_registered_onion_seeds(&registered)?;
            let mut batch = Vec::new();
            self.store.finalize(&mut batch);
            self.store.commit(batch)?;
        }

        info!(generators = generators.len(), "generator state loaded");
        Ok(())
    }

    fn generator_config(&self, address: &Address) -> Result<&GeneratorConfig> {
        self.config
            .generators
            .iter()
            .find(|generator| generator.address == *address)
            .ok_or_else(|| ForgingError::UnknownGenerator {
                address: hex::encode(address),
            })
    }

    fn configured_addresses(&self) -> Vec<Address> {
        self.config
            .generators
            .iter()
            .map(|generator| generator.address)
            .collect()
    }

    /// Assemble, sign and submit a block for `slot` as `address`.
    ///
    /// Returns `Ok(None)` for the silent outcomes: the fork-safety
    /// gate refusing the height, or an exhausted onion with the legacy
    /// fallback disabled.
    async fn forge(&mut self, tip: ChainTip, slot: u64, address: Address) -> Result<Option<Block>> {
        let height = tip.height + 1;
        let address_hex = hex::encode(address);

        let fork_records = self.store.fork_safety_records()?;
        let existing = fork_safety::find(&fork_records, &address).copied();
        if !fork_safety::may_forge(existing.as_ref(), height) {
            // Another run of this identity already signed at or above
            // this height; producing again would fork ourselves.
            debug!(
                address = %address_hex,
                height,
                recorded = existing.map(|r| r.height).unwrap_or(0),
                "fork-safety record at or above target height; skipping slot"
            );
            self.metrics.record_slot_skipped();
            return Ok(None);
        }

        let onion = self.generator_config(&address)?.hash_onion.clone();
        let mut used = self.store.used_hash_onions()?;
        let reveal = match hash_onion::next_reveal(
            &used,
            &address,
            height,
            &onion,
            self.config.allow_exhausted_fallback,
        ) {
            Ok(reveal) => reveal,
            Err(error @ ForgingError::OnionExhausted { .. }) => {
                warn!(address = %address_hex, %error, "refusing to forge");
                self.metrics.record_slot_skipped();
                return Ok(None);
            }
            Err(error) => return Err(error),
        };
        if reveal.index + 1 > onion.count.saturating_sub(onion.distance) {
            self.metrics.record_near_exhaustion();
        }

        let mut snapshot = self.chain.state_snapshot().await?;
        let groups = self.pool.processable_by_sender().await?;
        let selection_started = Instant::now();
        let transactions =
            select_transactions(groups, snapshot.as_mut(), self.chain.max_payload_bytes()).await;
        self.metrics
            .record_selection_time(selection_started.elapsed().as_micros() as u64);
        drop(snapshot);

        let max_height_prevoted = self.consensus.max_height_prevoted().await?;
        let previously_forged = existing.map(|record| record.height).unwrap_or(0);
        let generator_public_key = self
            .keypairs
            .get(&address)
            .map(|keypair| keypair.public_key)
            .ok_or_else(|| ForgingError::UnknownGenerator {
                address: address_hex.clone(),
            })?;

        let mut header = BlockHeader {
            version: BLOCK_VERSION,
            height,
            timestamp: self.clock.slot_start(slot),
            previous_block_id: tip.id,
            transaction_root: transaction_root(&transactions),
            generator_public_key,
            reward: 0,
            assets: BlockAssets {
                seed_reveal: reveal.value,
                max_height_prevoted,
                max_height_previously_forged: previously_forged,
            },
            signature: [0u8; 64],
        };

        let base_reward = self.chain.base_reward(height).await?;
        let seed_valid = self
            .consensus
            .is_seed_reveal_valid(&address, &reveal.value)
            .await?;
        header.reward = if !seed_valid {
            warn!(address = %address_hex, height, "seed reveal not verifiable; forfeiting reward");
            0
        } else if !self.consensus.is_bft_compliant(&header).await? {
            warn!(address = %address_hex, height, "header not BFT compliant; halving reward");
            base_reward / 2
        } else {
            base_reward
        };

        let signature = {
            let keypair = self
                .keypairs
                .get(&address)
                .ok_or_else(|| ForgingError::UnknownGenerator {
                    address: address_hex.clone(),
                })?;
            let message = codec::signing_bytes(&self.chain.network_id(), &header)?;
            keypair.sign(&message)
        };
        header.signature = signature;

        // Signature exists; only now may bookkeeping reach storage.
        let finalized_height = self.consensus.finalized_height().await?;
        used.push(UsedHashOnion {
            address,
            index: reveal.index,
            height,
        });
        let used = hash_onion::prune_used(used, finalized_height);
        self.store.stage_used_hash_onions(&used)?;

        if let Some(record) = fork_safety::advanced_record(
            existing.as_ref(),
            address,
            height,
            max_height_prevoted,
            previously_forged,
        ) {
            let mut fork_records = fork_records;
            fork_safety::upsert(&mut fork_records, record);
            self.store.stage_fork_safety_records(&fork_records)?;
        }

        let mut batch = Vec::new();
        self.store.finalize(&mut batch);
        self.store.commit(batch)?;

        let block = Block {
            header,
            transactions,
        };
        self.processor.process(block.clone()).await?;

        self.metrics
            .record_block_forged(block.transactions.len() as u64);
        info!(
            address = %address_hex,
            height,
            slot,
            reveal_index = reveal.index,
            transactions = block.transactions.len(),
            reward = block.header.reward,
            "forged block"
        );

        let event = BlockForgedEvent {
            address,
            height,
            slot,
            reveal_index: reveal.index,
            transaction_count: block.transactions.len(),
            reward: block.header.reward,
        };
        if let Err(error) = self.events.publish_block_forged(event).await {
            // The block is already processed; a lost notification is
            // not worth failing the tick over.
            warn!(%error, "failed to publish block-forged event");
        }

        Ok(Some(block))
    }
}

#[async_trait]
impl<KV: KeyValueStore> ForgingApi for ForgingService<KV> {
    async fn update_forging_status(
        &mut self,
        update: ForgingStatusUpdate,
    ) -> Result<ForgingStatus> {
        let address_hex = hex::encode(update.address);

        let generator = self
            .config
            .generators
            .iter()
            .find(|generator| generator.address == update.address)
            .ok_or_else(|| ForgingError::UnknownGenerator {
                address: address_hex.clone(),
            })?;

        let keypair = shared_crypto::decrypt_keypair(&update.password, &generator.encrypted_seed)
            .map_err(|_| ForgingError::InvalidCredentials {
            address: address_hex.clone(),
        })?;

        let derived = hashing::address_from_public_key(keypair.public_key().as_bytes());
        if derived != update.address {
            return Err(ForgingError::InvalidCredentials {
                address: address_hex,
            });
        }

        if !update.enable {
            self.keypairs.remove(&update.address);
            info!(address = %address_hex, "forging disabled");
            return Ok(ForgingStatus {
                address: update.address,
                forging: false,
            });
        }

        if !self.consensus.is_synced().await {
            // Enabling on an unsynced node risks signing on a stale
            // fork.
            return Err(ForgingError::NotSynced {
                address: address_hex,
            });
        }

        let mut records = self.store.fork_safety_records()?;
        let existing = fork_safety::find(&records, &update.address);

        if !update.overwrite
            && !fork_safety::matches_stored(
                existing,
                update.height,
                update.max_height_prevoted,
                update.max_height_previously_forged,
            )
        {
            return Err(ForgingError::ContradictingForgerInfo {
                address: address_hex,
                height: update.height,
                max_height_prevoted: update.max_height_prevoted,
                max_height_previously_forged: update.max_height_previously_forged,
            });
        }

        fork_safety::upsert(
            &mut records,
            crate::domain::entities::ForkSafetyRecord {
                address: update.address,
                height: update.height,
                max_height_prevoted: update.max_height_prevoted,
                max_height_previously_forged: update.max_height_previously_forged,
            },
        );
        self.store.stage_fork_safety_records(&records)?;
        let mut batch = Vec::new();
        self.store.finalize(&mut batch);
        self.store.commit(batch)?;

        self.keypairs
            .add(GeneratorKeypair::new(update.address, keypair));
        info!(address = %address_hex, "forging enabled");

        Ok(ForgingStatus {
            address: update.address,
            forging: true,
        })
    }

    fn forging_status(&self) -> Vec<ForgingStatus> {
        self.keypairs.snapshot(&self.configured_addresses())
    }

    #[tracing::instrument(skip(self))]
    async fn on_tick(&mut self, now: u64) -> Result<Option<Block>> {
        // A failed earlier attempt must not leak staged writes into
        // this one.
        self.store.discard_staged();

        let tip = self.chain.chain_tip().await?;
        let current_slot = self.clock.slot_for(now);
        let forger = self.oracle.expected_forger(current_slot).await?;

        let ctx = SlotContext {
            current_slot,
            last_block_slot: self.clock.slot_for(tip.timestamp),
            keypair_loaded: self.keypairs.contains(&forger),
            seconds_into_slot: self.clock.seconds_into_slot(now),
            wait_threshold_secs: self.config.wait_threshold_secs,
        };

        match evaluate(&ctx) {
            SlotDecision::Skip(reason) => {
                debug!(slot = current_slot, %reason, "skipping slot");
                self.metrics.record_slot_skipped();
                Ok(None)
            }
            SlotDecision::Forge => self.forge(tip, current_slot, forger).await,
        }
    }
}

/// Root hash over the included transaction ids, in selection order.
fn transaction_root(transactions: &[PooledTransaction]) -> Hash {
    let ids: Vec<&[u8]> = transactions.iter().map(|tx| tx.id.as_slice()).collect();
    hashing::blake3_hash_many(&ids)
}
