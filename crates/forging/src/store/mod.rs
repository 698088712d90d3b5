//! Persistence layer of the forging engine
//!
//! All bookkeeping goes through the [`GeneratorStore`] overlay so a
//! forge attempt's side effects can be prepared speculatively and
//! committed in one atomic batch only after the block is signed.

pub mod codec;
pub mod generator_store;

pub use generator_store::{
    GeneratorStore, KEY_PREVIOUSLY_FORGED, KEY_REGISTERED_HASH_ONION, KEY_USED_HASH_ONION,
};
