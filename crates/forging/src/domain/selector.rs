//! Fee-priority transaction selection
//!
//! Greedy block filling over per-sender, nonce-ordered queues: a max
//! heap keyed by fee holds each sender's lowest unselected transaction,
//! so the globally best candidate is always on top while per-sender
//! nonce order is preserved. Candidates are applied against a
//! disposable state snapshot before acceptance; the snapshot is thrown
//! away afterwards, so selection has no persistent side effects.

use crate::ports::outbound::StateSnapshot;
use shared_types::{Address, PooledTransaction};
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// Heap entry: one sender's current candidate.
#[derive(Debug, PartialEq, Eq)]
struct CandidateRef {
    fee: u64,
    sender: Address,
    queue_index: usize,
}

impl PartialOrd for CandidateRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Fee first; the remaining fields only make the order total so
        // equal-fee pops stay deterministic.
        self.fee
            .cmp(&other.fee)
            .then_with(|| other.sender.cmp(&self.sender))
            .then_with(|| other.queue_index.cmp(&self.queue_index))
    }
}

/// Select transactions for one block.
///
/// `groups` are the pool's processable transactions, one nonce-ascending
/// queue per sender. A transaction that fails application invalidates
/// its sender's remaining queue (later nonces cannot apply either); a
/// transaction that would push the payload past `max_payload_bytes`
/// stops selection entirely.
pub async fn select_transactions(
    groups: Vec<(Address, Vec<PooledTransaction>)>,
    state: &mut (dyn StateSnapshot + '_),
    max_payload_bytes: u64,
) -> Vec<PooledTransaction> {
    let queues: HashMap<Address, Vec<PooledTransaction>> = groups
        .into_iter()
        .filter(|(_, queue)| !queue.is_empty())
        .collect();

    let mut heap: BinaryHeap<CandidateRef> = queues
        .iter()
        .map(|(sender, queue)| CandidateRef {
            fee: queue[0].fee,
            sender: *sender,
            queue_index: 0,
        })
        .collect();

    let mut selected = Vec::new();
    let mut payload_bytes = 0u64;

    while let Some(candidate) = heap.pop() {
        let queue = &queues[&candidate.sender];
        let tx = &queue[candidate.queue_index];

        if let Err(error) = state.apply(tx).await {
            // Later transactions from this sender carry higher nonces
            // and cannot apply either: drop the whole queue.
            debug!(
                sender = %hex::encode(candidate.sender),
                nonce = tx.nonce,
                %error,
                "transaction failed to apply; dropping sender's remaining queue"
            );
            continue;
        }

        if payload_bytes + tx.size as u64 > max_payload_bytes {
            // Block filling prioritizes high fees over squeezing in
            // smaller late candidates: stop here.
            break;
        }

        payload_bytes += tx.size as u64;
        selected.push(tx.clone());

        let next_index = candidate.queue_index + 1;
        if let Some(next) = queue.get(next_index) {
            if next.nonce == tx.nonce + 1 {
                heap.push(CandidateRef {
                    fee: next.fee,
                    sender: candidate.sender,
                    queue_index: next_index,
                });
            }
        }
    }

    debug!(
        count = selected.len(),
        payload_bytes, max_payload_bytes, "transaction selection complete"
    );

    selected
}
