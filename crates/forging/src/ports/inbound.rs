//! Inbound ports (driving side)
//!
//! The operations an administrative endpoint and the node runtime
//! drive the forging engine with.

use crate::domain::ForgingStatus;
use crate::error::Result;
use async_trait::async_trait;
use shared_types::{Address, Block};

/// A request to enable or disable forging for one address.
#[derive(Clone, Debug)]
pub struct ForgingStatusUpdate {
    /// Generator address to toggle
    pub address: Address,
    /// Operator password protecting the generator credential
    pub password: String,
    /// `true` to enable forging, `false` to disable
    pub enable: bool,
    /// Claimed last-forged height (checked against the stored record)
    pub height: u64,
    /// Claimed max prevoted height at that point
    pub max_height_prevoted: u64,
    /// Claimed previously-forged height at that point
    pub max_height_previously_forged: u64,
    /// Accept the claimed triple even if it contradicts the stored
    /// record. Dangerous; for operator-driven recovery only.
    pub overwrite: bool,
}

/// Primary port: the forging engine's API.
#[async_trait]
pub trait ForgingApi: Send {
    /// Enable or disable forging for an address; see
    /// [`ForgingStatusUpdate`] for the consistency rules.
    async fn update_forging_status(
        &mut self,
        update: ForgingStatusUpdate,
    ) -> Result<ForgingStatus>;

    /// Read-only snapshot: every configured delegate and whether its
    /// keypair is currently loaded.
    fn forging_status(&self) -> Vec<ForgingStatus>;

    /// Evaluate one scheduler tick at wall-clock time `now`; returns
    /// the forged block if this tick produced one.
    async fn on_tick(&mut self, now: u64) -> Result<Option<Block>>;
}
