//! # BLAKE3 Hashing
//!
//! One-shot hashing, multi-input hashing, context-separated key
//! derivation, and address derivation.

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple inputs as one continuous stream.
pub fn blake3_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Derive a 256-bit key from context and input key material.
///
/// The context string must be unique per use case (BLAKE3 `derive_key`
/// domain separation).
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}

/// Derive a 20-byte account address from an Ed25519 public key.
///
/// The address is the first 20 bytes of `blake3(public_key)`.
pub fn address_from_public_key(public_key: &[u8; 32]) -> [u8; 20] {
    let digest = blake3_hash(public_key);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[..20]);
    address
}
