//! Pure domain logic of the forging engine: no IO, unit-testable in
//! isolation. Persistence goes through `crate::store`, collaborators
//! through `crate::ports`.

pub mod entities;
pub mod fork_safety;
pub mod hash_onion;
pub mod keypairs;
pub mod scheduler;
pub mod selector;

pub use entities::{
    ForgingStatus, ForkSafetyRecord, GeneratorKeypair, RegisteredOnionSeed, SeedReveal,
    UsedHashOnion,
};
pub use keypairs::KeypairStore;
pub use scheduler::{SlotClock, SlotContext, SlotDecision, SkipReason};
pub use selector::select_transactions;
