//! # Hash Onions
//!
//! A hash onion is a commit-reveal chain built by repeated one-way
//! hashing of a secret seed. Reveals are disclosed in reverse-hash
//! order: hashing a later reveal once yields the previous one, so each
//! disclosure is cheap to verify against the published anchor while the
//! next reveal stays unpredictable.
//!
//! Onion values are 16-byte truncated BLAKE3 outputs; the persisted
//! usage records and block assets stay compact, and onion values are
//! only ever compared against other onion values.
//!
//! Checkpoints are stored last-to-first: `checkpoints[0]` is the fully
//! hashed anchor (the first value to reveal) and the final element is
//! the seed itself. A window of `distance` reveals can be rebuilt from
//! any single checkpoint, so a forger never stores the full chain.

use crate::CryptoError;

/// A single onion value (truncated BLAKE3, 16 bytes).
pub type OnionValue = [u8; 16];

/// One hashing step: truncate `blake3(value)` to 16 bytes.
pub fn onion_hash(value: &OnionValue) -> OnionValue {
    let digest = blake3::hash(value);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest.as_bytes()[..16]);
    out
}

/// Generate the checkpoint list for a fresh onion.
///
/// Walks `count` hashing steps forward from `seed`, keeping every
/// `distance`-th intermediate, and returns the kept values reversed:
/// `result[k]` sits `k * distance` reveals into the chain and
/// `result.last()` is the seed. The returned list has
/// `count / distance + 1` entries.
///
/// # Errors
///
/// Returns `CryptoError::InvalidOnionParameters` unless
/// `0 < distance <= count` and `count % distance == 0`.
pub fn hash_onion(
    seed: &OnionValue,
    count: u32,
    distance: u32,
) -> Result<Vec<OnionValue>, CryptoError> {
    if distance == 0 || count < distance {
        return Err(CryptoError::InvalidOnionParameters(format!(
            "distance {distance} must be in 1..={count}"
        )));
    }
    if count % distance != 0 {
        return Err(CryptoError::InvalidOnionParameters(format!(
            "count {count} must be a multiple of distance {distance}"
        )));
    }

    let mut checkpoints = Vec::with_capacity((count / distance + 1) as usize);
    checkpoints.push(*seed);

    let mut current = *seed;
    for step in 1..=count {
        current = onion_hash(&current);
        if step % distance == 0 {
            checkpoints.push(current);
        }
    }

    checkpoints.reverse();
    Ok(checkpoints)
}

/// Rebuild the `distance`-wide reveal window anchored at a checkpoint.
///
/// `window[0]` is the anchor itself (the reveal sitting exactly at the
/// checkpoint), and `window[j]` for `j >= 1` is the anchor hashed
/// `distance - j` times, i.e. the reveal `j` positions after the
/// previous checkpoint. Selecting `window[index % distance]` therefore yields
/// the reveal at absolute position `index` for any index whose
/// covering checkpoint is `ceil(index / distance)`.
pub fn checkpoint_window(anchor: &OnionValue, distance: u32) -> Vec<OnionValue> {
    let distance = distance as usize;
    let mut forward = Vec::with_capacity(distance.saturating_sub(1));
    let mut current = *anchor;
    for _ in 1..distance {
        current = onion_hash(&current);
        forward.push(current);
    }

    let mut window = Vec::with_capacity(distance);
    window.push(*anchor);
    for j in 1..distance {
        window.push(forward[distance - j - 1]);
    }
    window
}

/// Verify that `reveal` sits exactly `steps` positions after `earlier`
/// in the same chain: hashing `reveal` `steps` times must reproduce
/// `earlier`.
pub fn verify_reveal(reveal: &OnionValue, earlier: &OnionValue, steps: u32) -> bool {
    let mut current = *reveal;
    for _ in 0..steps {
        current = onion_hash(&current);
    }
    current == *earlier
}
