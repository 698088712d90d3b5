//! Binary encoding of persisted records and signing payloads
//!
//! Record lists are wrapped in a schema-versioned container before
//! bincode encoding, so a future layout change can migrate old data
//! instead of misreading it.

use crate::error::{ForgingError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{BlockHeader, Hash};

/// Version tag written ahead of every persisted record list.
pub const SCHEMA_VERSION: u8 = 1;

#[derive(Serialize)]
struct VersionedRecordsRef<'a, T: Serialize> {
    version: u8,
    records: &'a [T],
}

#[derive(Deserialize)]
struct VersionedRecords<T> {
    version: u8,
    records: Vec<T>,
}

/// Encode a record list under the current schema version.
pub fn encode_records<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    bincode::serialize(&VersionedRecordsRef {
        version: SCHEMA_VERSION,
        records,
    })
    .map_err(|e| ForgingError::Codec(e.to_string()))
}

/// Decode a record list, rejecting unknown schema versions.
pub fn decode_records<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let wrapper: VersionedRecords<T> =
        bincode::deserialize(bytes).map_err(|e| ForgingError::Codec(e.to_string()))?;

    if wrapper.version != SCHEMA_VERSION {
        return Err(ForgingError::Codec(format!(
            "unsupported record schema version {}",
            wrapper.version
        )));
    }
    Ok(wrapper.records)
}

/// The byte string a generator signs: the network identifier followed
/// by the header with a zeroed signature field.
pub fn signing_bytes(network_id: &Hash, header: &BlockHeader) -> Result<Vec<u8>> {
    let mut unsigned = header.clone();
    unsigned.signature = [0u8; 64];

    let encoded =
        bincode::serialize(&unsigned).map_err(|e| ForgingError::Codec(e.to_string()))?;

    let mut bytes = Vec::with_capacity(network_id.len() + encoded.len());
    bytes.extend_from_slice(network_id);
    bytes.extend_from_slice(&encoded);
    Ok(bytes)
}
