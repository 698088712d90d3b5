//! Hash-onion reveal bookkeeping
//!
//! Decides which onion value a generator discloses next, tracks
//! consumption across heights, and prunes finalized usage records.
//! The onion math itself (checkpoint generation and window derivation)
//! lives in `shared-crypto`; this module owns the indexing rules:
//!
//! - reveal indices are consumed strictly monotonically per address
//! - index 0 is always `checkpoints[0]` verbatim
//! - index `i > 0` is found in the window of checkpoint
//!   `ceil(i / distance)` at offset `i % distance`
//! - a record at or beyond `count` means the onion is spent

use crate::config::HashOnionConfig;
use crate::error::{ForgingError, Result};
use crate::domain::entities::{SeedReveal, UsedHashOnion};
use shared_crypto::OnionValue;
use shared_types::Address;
use tracing::warn;

/// The highest-height usage record of `address` strictly below
/// `target_height`.
pub fn last_used_below<'a>(
    used: &'a [UsedHashOnion],
    address: &Address,
    target_height: u64,
) -> Option<&'a UsedHashOnion> {
    used.iter()
        .filter(|record| record.address == *address && record.height < target_height)
        .max_by_key(|record| record.height)
}

/// The highest-height usage record of `address` overall.
pub fn highest_used<'a>(used: &'a [UsedHashOnion], address: &Address) -> Option<&'a UsedHashOnion> {
    used.iter()
        .filter(|record| record.address == *address)
        .max_by_key(|record| record.height)
}

/// Select the reveal for `address` at `target_height`.
///
/// Returns [`ForgingError::OnionExhausted`] once the onion's budget is
/// spent, unless `allow_exhausted_fallback` is set. The fallback
/// is the legacy behavior: it restarts the chain from a random value at index 0
/// and thereby forfeits the onion's double-forge evidence for this
/// address going forward.
pub fn next_reveal(
    used: &[UsedHashOnion],
    address: &Address,
    target_height: u64,
    onion: &HashOnionConfig,
    allow_exhausted_fallback: bool,
) -> Result<SeedReveal> {
    let next_index = match last_used_below(used, address, target_height) {
        None => {
            let value = first_checkpoint(address, onion)?;
            return Ok(SeedReveal { index: 0, value });
        }
        Some(record) => record.index + 1,
    };

    if next_index > onion.count {
        if !allow_exhausted_fallback {
            return Err(ForgingError::OnionExhausted {
                address: hex::encode(address),
                used: next_index - 1,
                total: onion.count,
            });
        }
        warn!(
            address = %hex::encode(address),
            total = onion.count,
            "hash onion exhausted; falling back to a random seed reveal, \
             breaking the deterministic chain for this address"
        );
        let mut value: OnionValue = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut value);
        return Ok(SeedReveal { index: 0, value });
    }

    if next_index + 1 > onion.count.saturating_sub(onion.distance) {
        warn!(
            address = %hex::encode(address),
            next_index,
            total = onion.count,
            "hash onion approaching exhaustion; register a new onion soon"
        );
    }

    let position = next_index.div_ceil(onion.distance) as usize;
    let anchor = onion.hashes.get(position).ok_or_else(|| {
        ForgingError::InvalidOnionConfig {
            address: hex::encode(address),
            reason: format!("missing checkpoint at position {position}"),
        }
    })?;

    let window = shared_crypto::checkpoint_window(anchor, onion.distance);
    let value = window[(next_index % onion.distance) as usize];

    Ok(SeedReveal {
        index: next_index,
        value,
    })
}

fn first_checkpoint(address: &Address, onion: &HashOnionConfig) -> Result<OnionValue> {
    onion
        .hashes
        .first()
        .copied()
        .ok_or_else(|| ForgingError::InvalidOnionConfig {
            address: hex::encode(address),
            reason: "onion has no checkpoints".into(),
        })
}

/// Drop usage records at or below the finalized height, always keeping
/// each address's highest record as its resumption point.
pub fn prune_used(used: Vec<UsedHashOnion>, finalized_height: u64) -> Vec<UsedHashOnion> {
    use std::collections::HashMap;

    let mut highest: HashMap<Address, u64> = HashMap::new();
    for record in &used {
        let entry = highest.entry(record.address).or_insert(record.height);
        if record.height > *entry {
            *entry = record.height;
        }
    }

    used.into_iter()
        .filter(|record| {
            record.height > finalized_height || highest.get(&record.address) == Some(&record.height)
        })
        .collect()
}
