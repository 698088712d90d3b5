//! # Passphrase Encryption
//!
//! XChaCha20-Poly1305 encryption of generator credentials under an
//! operator password. The symmetric key is derived with BLAKE3
//! `derive_key` over the password and a per-message random salt, so
//! equal passwords never produce equal keys.

use crate::{hashing, CryptoError};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Domain-separation context for credential key derivation.
const KDF_CONTEXT: &str = "meridian 2025-01-01 generator credential";

/// A password-encrypted message: salt, nonce and ciphertext travel
/// together so the envelope is self-contained in config files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Per-message random salt mixed into key derivation.
    pub salt: [u8; 16],
    /// XChaCha20 nonce (192-bit).
    pub nonce: [u8; 24],
    /// Ciphertext with appended Poly1305 tag.
    pub ciphertext: Vec<u8>,
}

fn password_key(password: &str, salt: &[u8; 16]) -> [u8; 32] {
    let mut material = Vec::with_capacity(password.len() + salt.len());
    material.extend_from_slice(password.as_bytes());
    material.extend_from_slice(salt);
    let key = hashing::derive_key(KDF_CONTEXT, &material);
    material.zeroize();
    key
}

/// Encrypt `plaintext` under `password`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if the cipher rejects the
/// input.
pub fn encrypt_with_password(
    password: &str,
    plaintext: &[u8],
) -> Result<EncryptedMessage, CryptoError> {
    let mut salt = [0u8; 16];
    let mut nonce = [0u8; 24];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

    let mut key = password_key(password, &salt);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedMessage {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt an [`EncryptedMessage`] with `password`.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` on a wrong password or a
/// tampered ciphertext (the Poly1305 tag check fails in both cases).
pub fn decrypt_with_password(
    password: &str,
    message: &EncryptedMessage,
) -> Result<Vec<u8>, CryptoError> {
    let mut key = password_key(password, &message.salt);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    cipher
        .decrypt(
            XNonce::from_slice(&message.nonce),
            message.ciphertext.as_ref(),
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Decrypt an encrypted 32-byte Ed25519 seed and build the keypair.
///
/// The decrypted plaintext is zeroized before returning; callers never
/// see raw seed bytes.
///
/// # Errors
///
/// `CryptoError::DecryptionFailed` on a wrong password, or
/// `CryptoError::InvalidKeyLength` if the plaintext is not a 32-byte
/// seed.
pub fn decrypt_keypair(
    password: &str,
    message: &EncryptedMessage,
) -> Result<crate::Ed25519KeyPair, CryptoError> {
    let mut plaintext = decrypt_with_password(password, message)?;
    if plaintext.len() != 32 {
        let actual = plaintext.len();
        plaintext.zeroize();
        return Err(CryptoError::InvalidKeyLength {
            expected: 32,
            actual,
        });
    }

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&plaintext);
    plaintext.zeroize();

    let keypair = crate::Ed25519KeyPair::from_seed(seed);
    seed.zeroize();
    Ok(keypair)
}
