//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | BLAKE3 | Hashing, key derivation, address derivation |
//! | `signatures` | Ed25519 | Block signing |
//! | `passphrase` | XChaCha20-Poly1305 | Generator credential encryption |
//! | `onion` | BLAKE3 (truncated) | Hash-onion commit-reveal chains |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, constant-time, side-channel immune
//! - **Ed25519**: Deterministic nonces, no RNG dependency
//! - **BLAKE3**: SIMD-accelerated keyed hashing and key derivation
//! - **Hash onion**: sequential reveals verifiable against a published
//!   anchor without exposing the seed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod onion;
pub mod passphrase;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{address_from_public_key, blake3_hash, blake3_hash_many, derive_key};
pub use onion::{checkpoint_window, hash_onion, onion_hash, verify_reveal, OnionValue};
pub use passphrase::{
    decrypt_keypair, decrypt_with_password, encrypt_with_password, EncryptedMessage,
};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
