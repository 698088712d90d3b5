//! Fork-safety rules
//!
//! A generator address must never sign two blocks at the same or
//! conflicting heights. The stored [`ForkSafetyRecord`] is the highest
//! state the address ever signed at; these checkers gate every forge
//! attempt and every status change against it.

use crate::domain::entities::ForkSafetyRecord;
use shared_types::Address;

/// Whether `address` may sign at `target_height`: only strictly above
/// the recorded height (an absent record counts as height 0, which
/// still forbids signing at height 0; chains start above the
/// genesis block).
pub fn may_forge(record: Option<&ForkSafetyRecord>, target_height: u64) -> bool {
    let recorded = record.map(|r| r.height).unwrap_or(0);
    target_height > recorded
}

/// The record to persist after signing at `height`, or `None` when the
/// stored record is already at or beyond it (never regress).
pub fn advanced_record(
    existing: Option<&ForkSafetyRecord>,
    address: Address,
    height: u64,
    max_height_prevoted: u64,
    max_height_previously_forged: u64,
) -> Option<ForkSafetyRecord> {
    if let Some(existing) = existing {
        if height <= existing.height {
            return None;
        }
    }
    Some(ForkSafetyRecord {
        address,
        height,
        max_height_prevoted,
        max_height_previously_forged,
    })
}

/// Whether an operator-supplied triple matches the stored record. With
/// no record on file, only the all-zero triple matches.
pub fn matches_stored(
    record: Option<&ForkSafetyRecord>,
    height: u64,
    max_height_prevoted: u64,
    max_height_previously_forged: u64,
) -> bool {
    match record {
        Some(record) => {
            record.height == height
                && record.max_height_prevoted == max_height_prevoted
                && record.max_height_previously_forged == max_height_previously_forged
        }
        None => height == 0 && max_height_prevoted == 0 && max_height_previously_forged == 0,
    }
}

/// Find the record for `address` in a decoded record list.
pub fn find<'a>(
    records: &'a [ForkSafetyRecord],
    address: &Address,
) -> Option<&'a ForkSafetyRecord> {
    records.iter().find(|record| record.address == *address)
}

/// Insert or replace the record for its address.
pub fn upsert(records: &mut Vec<ForkSafetyRecord>, record: ForkSafetyRecord) {
    match records.iter_mut().find(|r| r.address == record.address) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}
