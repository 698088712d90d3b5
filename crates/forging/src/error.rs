//! Error types for the forging engine

use thiserror::Error;

/// Result type alias for forging operations
pub type Result<T> = std::result::Result<T, ForgingError>;

/// Errors that can occur while managing or running the forging engine
#[derive(Debug, Error)]
pub enum ForgingError {
    /// No encrypted credential is configured for the address
    #[error("No generator credential registered for address {address}")]
    UnknownGenerator {
        /// Hex-encoded address
        address: String,
    },

    /// Wrong password, or the decrypted key does not map to the address
    #[error("Invalid password and address combination for {address}")]
    InvalidCredentials {
        /// Hex-encoded address
        address: String,
    },

    /// Enabling forging was requested while the node is behind the network
    #[error("Node is not synced; refusing to enable forging for {address}")]
    NotSynced {
        /// Hex-encoded address
        address: String,
    },

    /// Supplied fork-safety triple does not match the stored record
    #[error(
        "Forger info for {address} contradicts the stored record \
         (height {height}, prevoted {max_height_prevoted}, previously forged {max_height_previously_forged})"
    )]
    ContradictingForgerInfo {
        /// Hex-encoded address
        address: String,
        /// Supplied height
        height: u64,
        /// Supplied max prevoted height
        max_height_prevoted: u64,
        /// Supplied max previously forged height
        max_height_previously_forged: u64,
    },

    /// The configured hash onion has no reveals left
    #[error("Hash onion exhausted for {address}: {used} of {total} reveals consumed")]
    OnionExhausted {
        /// Hex-encoded address
        address: String,
        /// Highest consumed reveal index
        used: u32,
        /// Total reveal budget of the onion
        total: u32,
    },

    /// The configured hash onion is structurally invalid
    #[error("Invalid hash onion configuration for {address}: {reason}")]
    InvalidOnionConfig {
        /// Hex-encoded address
        address: String,
        /// What is wrong with the configuration
        reason: String,
    },

    /// Key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted record could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// A collaborator (chain, pool, consensus, processor) failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Cryptographic primitive failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl ForgingError {
    /// Errors that must never be downgraded: accepting the operation
    /// anyway could lead to double-signing or signing from a stale
    /// security state.
    pub fn is_safety_critical(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::ContradictingForgerInfo { .. }
                | Self::NotSynced { .. }
                | Self::OnionExhausted { .. }
        )
    }
}
