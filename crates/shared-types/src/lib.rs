//! # Shared Types - Core Chain Entities
//!
//! Entity definitions exchanged between the Meridian subsystems:
//! the chain/ledger, the transaction pool, consensus, and the forging
//! engine.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `PublicKey`, `Signature`, `SeedReveal`
//! - **Chain**: [`Block`], [`BlockHeader`], [`BlockAssets`]
//! - **Pool**: [`PooledTransaction`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entities;

pub use entities::{
    Address, Block, BlockAssets, BlockHeader, Hash, PooledTransaction, PublicKey, SeedReveal,
    Signature,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
