//! Metrics collection for the forging engine

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters exported to the node's telemetry.
#[derive(Debug, Default)]
pub struct ForgingMetrics {
    /// Total blocks forged
    pub blocks_forged: AtomicU64,

    /// Total transactions included across forged blocks
    pub transactions_included: AtomicU64,

    /// Total slots skipped (any reason)
    pub slots_skipped: AtomicU64,

    /// Total transaction selection time (microseconds)
    pub selection_time_us: AtomicU64,

    /// Times an onion came within one checkpoint of exhaustion
    pub onion_near_exhaustion: AtomicU64,
}

impl ForgingMetrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a forged block.
    pub fn record_block_forged(&self, tx_count: u64) {
        self.blocks_forged.fetch_add(1, Ordering::Relaxed);
        self.transactions_included
            .fetch_add(tx_count, Ordering::Relaxed);
    }

    /// Record a skipped slot.
    pub fn record_slot_skipped(&self) {
        self.slots_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record selection duration.
    pub fn record_selection_time(&self, duration_us: u64) {
        self.selection_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a near-exhaustion warning.
    pub fn record_near_exhaustion(&self) {
        self.onion_near_exhaustion.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks forged so far.
    pub fn get_blocks_forged(&self) -> u64 {
        self.blocks_forged.load(Ordering::Relaxed)
    }

    /// Average transactions per forged block.
    pub fn get_avg_transactions_per_block(&self) -> f64 {
        let blocks = self.blocks_forged.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        self.transactions_included.load(Ordering::Relaxed) as f64 / blocks as f64
    }
}
