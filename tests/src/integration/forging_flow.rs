//! End-to-end forging flows
//!
//! Drives the full engine (status toggles, slot ticks, block
//! assembly, signing and persistence) over in-memory adapters,
//! including the crash/restart flows the persisted records exist for.

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use meridian_forging::domain::{ForkSafetyRecord, UsedHashOnion};
    use meridian_forging::ports::outbound::ChainTip;
    use meridian_forging::store::{codec, KEY_PREVIOUSLY_FORGED, KEY_USED_HASH_ONION};
    use meridian_forging::{ForgingApi, ForgingError, ForgingStatusUpdate};
    use shared_crypto::{onion_hash, Ed25519PublicKey, Ed25519Signature};
    use shared_types::Block;

    fn enable(update_address: [u8; 20], password: &str) -> ForgingStatusUpdate {
        ForgingStatusUpdate {
            address: update_address,
            password: password.to_string(),
            enable: true,
            height: 0,
            max_height_prevoted: 0,
            max_height_previously_forged: 0,
            overwrite: false,
        }
    }

    async fn forge_at_slot(harness: &mut Harness, slot: u64) -> Option<Block> {
        harness.service.on_tick(slot_time(slot)).await.unwrap()
    }

    #[tokio::test]
    async fn test_enable_with_zero_triple_and_forge_first_block() {
        let (generator, config) = Generator::create(1, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();

        // No stored record: the all-zero triple must be accepted.
        let status = harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        assert!(status.forging);

        let block = forge_at_slot(&mut harness, 5).await.expect("block forged");

        assert_eq!(block.header.height, 2);
        assert_eq!(block.header.timestamp, slot_time(5));
        assert_eq!(block.header.generator_public_key, generator.public_key);
        // First reveal is the first checkpoint verbatim.
        assert_eq!(block.header.assets.seed_reveal, generator.onion.hashes[0]);

        // The signature must verify over the unsigned header bytes.
        let mut unsigned = block.header.clone();
        unsigned.signature = [0u8; 64];
        let message = codec::signing_bytes(&[0x4D; 32], &unsigned).unwrap();
        let public_key = Ed25519PublicKey::from_bytes(generator.public_key).unwrap();
        let signature = Ed25519Signature::from_bytes(block.header.signature);
        assert!(public_key.verify(&message, &signature).is_ok());

        // The block reached the processor and the event sink.
        assert_eq!(harness.processor.processed.lock().unwrap().len(), 1);
        let events = harness.events.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].height, 2);
        assert_eq!(events[0].reveal_index, 0);
    }

    #[tokio::test]
    async fn test_bookkeeping_is_persisted_atomically_after_forge() {
        let (generator, config) = Generator::create(2, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        forge_at_slot(&mut harness, 5).await.expect("block forged");

        let used: Vec<UsedHashOnion> =
            codec::decode_records(&kv.raw_get(KEY_USED_HASH_ONION).unwrap()).unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].address, generator.address);
        assert_eq!(used[0].index, 0);
        assert_eq!(used[0].height, 2);

        let forged: Vec<ForkSafetyRecord> =
            codec::decode_records(&kv.raw_get(KEY_PREVIOUSLY_FORGED).unwrap()).unwrap();
        assert_eq!(forged.len(), 1);
        assert_eq!(forged[0].height, 2);
    }

    #[tokio::test]
    async fn test_consecutive_forges_consume_monotonic_chained_reveals() {
        let (generator, config) = Generator::create(3, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        let mut reveals = Vec::new();
        for slot in 5..15u64 {
            let block = forge_at_slot(&mut harness, slot).await.expect("forged");
            reveals.push(block.header.assets.seed_reveal);
            // Advance the tip as the processor would.
            harness.chain.set_tip(ChainTip {
                id: [slot as u8; 32],
                height: block.header.height,
                timestamp: block.header.timestamp,
            });
        }

        // Ten blocks, reveal indices 0..=9: each reveal hashes back to
        // its predecessor.
        for pair in reveals.windows(2) {
            assert_eq!(onion_hash(&pair[1]), pair[0]);
        }
    }

    #[tokio::test]
    async fn test_restart_resumes_reveal_sequence() {
        let (generator, config) = Generator::create(4, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config.clone()], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        let first = forge_at_slot(&mut harness, 5).await.expect("forged");
        drop(harness);

        // Same storage, fresh process.
        let mut restarted = Harness::new(vec![config], generator.address, kv);
        restarted.service.load_generators().unwrap();

        // The stored record is (2, 0, 0) now; the operator must supply
        // exactly that.
        let mut update = enable(generator.address, &generator.password);
        update.height = 2;
        restarted
            .service
            .update_forging_status(update)
            .await
            .unwrap();

        restarted.chain.set_tip(ChainTip {
            id: [1u8; 32],
            height: 2,
            timestamp: slot_time(5),
        });
        let second = forge_at_slot(&mut restarted, 6).await.expect("forged");

        assert_eq!(second.header.height, 3);
        // Reveal consumption continues exactly where the first run
        // stopped.
        assert_eq!(
            onion_hash(&second.header.assets.seed_reveal),
            first.header.assets.seed_reveal
        );
    }

    #[tokio::test]
    async fn test_contradicting_triple_is_rejected_and_keypairs_unchanged() {
        let (generator, config) = Generator::create(5, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config.clone()], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        forge_at_slot(&mut harness, 5).await.expect("forged");
        drop(harness);

        let mut restarted = Harness::new(vec![config], generator.address, kv);
        restarted.service.load_generators().unwrap();

        // The stored record says height 2; a zero triple is stale.
        let error = restarted
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ForgingError::ContradictingForgerInfo { .. }
        ));

        // The rejection left the keypair map untouched.
        let statuses = restarted.service.forging_status();
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].forging);
    }

    #[tokio::test]
    async fn test_overwrite_accepts_contradicting_triple() {
        let (generator, config) = Generator::create(6, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config.clone()], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        forge_at_slot(&mut harness, 5).await.expect("forged");
        drop(harness);

        let mut restarted = Harness::new(vec![config], generator.address, kv);
        restarted.service.load_generators().unwrap();

        let mut update = enable(generator.address, &generator.password);
        update.height = 10;
        update.overwrite = true;
        let status = restarted.service.update_forging_status(update).await.unwrap();
        assert!(status.forging);
    }

    #[tokio::test]
    async fn test_fork_safety_refuses_already_forged_height() {
        let (generator, config) = Generator::create(7, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config.clone()], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        forge_at_slot(&mut harness, 5).await.expect("forged");
        drop(harness);

        // Restart against a stale tip: the next candidate height (2)
        // was already forged by this identity.
        let mut restarted = Harness::new(vec![config], generator.address, kv);
        restarted.service.load_generators().unwrap();
        let mut update = enable(generator.address, &generator.password);
        update.height = 2;
        restarted
            .service
            .update_forging_status(update)
            .await
            .unwrap();

        let outcome = forge_at_slot(&mut restarted, 6).await;

        // Silent skip, not an error, and nothing was processed.
        assert!(outcome.is_none());
        assert!(restarted.processor.processed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_onion_rotation_discards_usage_records() {
        let (generator, config) = Generator::create(8, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();
        forge_at_slot(&mut harness, 5).await.expect("forged");
        drop(harness);

        // The operator mints a fresh onion for the same address.
        let rotated_hashes = shared_crypto::hash_onion(&[0xEE; 16], 100, 10).unwrap();
        let (_, mut rotated_config) = Generator::create(8, 100, 10);
        rotated_config.hash_onion.hashes = rotated_hashes.clone();

        let mut restarted = Harness::new(vec![rotated_config], generator.address, kv.clone());
        restarted.service.load_generators().unwrap();

        // Old usage is gone.
        let used: Vec<UsedHashOnion> =
            codec::decode_records(&kv.raw_get(KEY_USED_HASH_ONION).unwrap()).unwrap();
        assert!(used.is_empty());

        // And the next forge starts the new onion from index 0.
        let mut update = enable(generator.address, &generator.password);
        update.height = 2;
        restarted
            .service
            .update_forging_status(update)
            .await
            .unwrap();
        restarted.chain.set_tip(ChainTip {
            id: [1u8; 32],
            height: 2,
            timestamp: slot_time(5),
        });
        let block = forge_at_slot(&mut restarted, 6).await.expect("forged");
        assert_eq!(block.header.assets.seed_reveal, rotated_hashes[0]);
    }

    #[tokio::test]
    async fn test_spent_onion_fails_at_load() {
        let (generator, config) = Generator::create(9, 20, 10);
        let mut kv = SharedKv::new();

        // A previous run consumed the onion's full budget.
        use meridian_forging::ports::outbound::KeyValueStore;
        let spent = vec![UsedHashOnion {
            address: generator.address,
            index: 20,
            height: 7,
        }];
        kv.put(KEY_USED_HASH_ONION, &codec::encode_records(&spent).unwrap())
            .unwrap();
        // Register the configured onion so rotation detection does not
        // clear the record.
        let registered = vec![meridian_forging::domain::RegisteredOnionSeed {
            address: generator.address,
            seed_hash: *generator.onion.hashes.last().unwrap(),
        }];
        kv.put(
            meridian_forging::store::KEY_REGISTERED_HASH_ONION,
            &codec::encode_records(&registered).unwrap(),
        )
        .unwrap();

        let mut harness = Harness::new(vec![config], generator.address, kv);
        let error = harness.service.load_generators().unwrap_err();
        assert!(matches!(error, ForgingError::OnionExhausted { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_onion_skips_slot_at_forge_time() {
        let (generator, config) = Generator::create(10, 20, 10);
        let mut kv = SharedKv::new();

        use meridian_forging::ports::outbound::KeyValueStore;
        let spent = vec![UsedHashOnion {
            address: generator.address,
            index: 20,
            height: 1,
        }];
        kv.put(KEY_USED_HASH_ONION, &codec::encode_records(&spent).unwrap())
            .unwrap();

        let mut harness = Harness::new(vec![config], generator.address, kv);
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        // next index would be 21 > 20: skip, do not error.
        let outcome = forge_at_slot(&mut harness, 5).await;
        assert!(outcome.is_none());
        assert!(harness.processor.processed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsynced_node_rejects_enable() {
        let (generator, config) = Generator::create(11, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness
            .consensus
            .synced
            .store(false, std::sync::atomic::Ordering::Relaxed);

        let error = harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap_err();
        assert!(matches!(error, ForgingError::NotSynced { .. }));
        assert!(!harness.service.forging_status()[0].forging);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_address_are_rejected() {
        let (generator, config) = Generator::create(12, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());

        let error = harness
            .service
            .update_forging_status(enable(generator.address, "not the password"))
            .await
            .unwrap_err();
        assert!(matches!(error, ForgingError::InvalidCredentials { .. }));

        let error = harness
            .service
            .update_forging_status(enable([0xFF; 20], &generator.password))
            .await
            .unwrap_err();
        assert!(matches!(error, ForgingError::UnknownGenerator { .. }));
    }

    #[tokio::test]
    async fn test_disable_unloads_keypair_and_ticks_skip() {
        let (generator, config) = Generator::create(13, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        let mut update = enable(generator.address, &generator.password);
        update.enable = false;
        let status = harness.service.update_forging_status(update).await.unwrap();
        assert!(!status.forging);

        let outcome = forge_at_slot(&mut harness, 5).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_lagging_tip_waits_out_the_threshold() {
        let (generator, config) = Generator::create(14, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        // Tip is two slots behind: within the wait threshold the slot
        // is skipped to let the pending block arrive.
        harness.chain.set_tip(ChainTip {
            id: [0xAB; 32],
            height: 1,
            timestamp: slot_time(3),
        });
        assert!(harness.service.on_tick(slot_time(5)).await.unwrap().is_none());
        assert!(harness.service.on_tick(slot_time(5) + 1).await.unwrap().is_none());

        // Once the threshold elapses the slot is forged after all.
        let block = harness
            .service
            .on_tick(slot_time(5) + 2)
            .await
            .unwrap()
            .expect("forged after threshold");
        assert_eq!(block.header.timestamp, slot_time(5));
    }

    #[tokio::test]
    async fn test_slot_already_filled_is_skipped() {
        let (generator, config) = Generator::create(15, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        // The tip already sits in the current slot.
        harness.chain.set_tip(ChainTip {
            id: [0xAB; 32],
            height: 2,
            timestamp: slot_time(5),
        });
        assert!(harness.service.on_tick(slot_time(5) + 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_selection_respects_payload_budget_and_drops_bad_senders() {
        let (generator, config) = Generator::create(16, 100, 10);
        let mut harness = Harness::new(vec![config], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        let good_sender = [0x01; 20];
        let bad_sender = [0x02; 20];
        let bad_tx = pooled_tx(bad_sender, 0, 900, 100);
        harness.chain.rejected_tx_ids.lock().unwrap().push(bad_tx.id);
        *harness.pool.groups.lock().unwrap() = vec![
            (
                good_sender,
                vec![
                    pooled_tx(good_sender, 0, 500, 8_000),
                    pooled_tx(good_sender, 1, 400, 8_000),
                ],
            ),
            // Highest fee, but rejected by state application: its
            // whole queue must be dropped.
            (bad_sender, vec![bad_tx, pooled_tx(bad_sender, 1, 800, 100)]),
        ];

        let block = forge_at_slot(&mut harness, 5).await.expect("forged");

        // Budget is 15 KiB: the second 8 KiB transaction overflows it
        // and stops selection.
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].sender, good_sender);
        assert!(block.payload_size() <= harness.chain.max_payload_bytes);
    }

    #[tokio::test]
    async fn test_reward_penalties() {
        let (generator, config) = Generator::create(17, 100, 10);
        let mut harness = Harness::new(vec![config.clone()], generator.address, SharedKv::new());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        // Non-compliant header: reward is halved.
        harness
            .consensus
            .bft_compliant
            .store(false, std::sync::atomic::Ordering::Relaxed);
        let block = forge_at_slot(&mut harness, 5).await.expect("forged");
        assert_eq!(block.header.reward, harness.chain.base_reward / 2);

        // Invalid seed reveal: reward is forfeited entirely.
        harness
            .consensus
            .seed_reveal_valid
            .store(false, std::sync::atomic::Ordering::Relaxed);
        harness.chain.set_tip(ChainTip {
            id: [1u8; 32],
            height: 2,
            timestamp: slot_time(5),
        });
        let block = forge_at_slot(&mut harness, 6).await.expect("forged");
        assert_eq!(block.header.reward, 0);
    }

    #[tokio::test]
    async fn test_pruning_keeps_only_resumption_point() {
        let (generator, config) = Generator::create(18, 100, 10);
        let kv = SharedKv::new();
        let mut harness = Harness::new(vec![config], generator.address, kv.clone());
        harness.service.load_generators().unwrap();
        harness
            .service
            .update_forging_status(enable(generator.address, &generator.password))
            .await
            .unwrap();

        // Forge heights 2, 3, 4.
        for slot in 5..8u64 {
            let block = forge_at_slot(&mut harness, slot).await.expect("forged");
            harness.chain.set_tip(ChainTip {
                id: [slot as u8; 32],
                height: block.header.height,
                timestamp: block.header.timestamp,
            });
        }

        // Everything up to height 4 finalizes; the next forge prunes.
        harness
            .consensus
            .finalized_height
            .store(4, std::sync::atomic::Ordering::Relaxed);
        forge_at_slot(&mut harness, 8).await.expect("forged");

        let used: Vec<UsedHashOnion> =
            codec::decode_records(&kv.raw_get(KEY_USED_HASH_ONION).unwrap()).unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].height, 5);
        assert_eq!(used[0].index, 3);
    }
}
