//! The stored record type and the canary sentinel convention.
//!
//! Everything the index persists is an ordinary DHT value. An [IndexEntry]
//! carries the indexed record: the full binary key, the opaque
//! application payload, and the index name. The name rides the DHT's
//! side-channel tag rather than the payload, so a reader can filter an
//! address down to one index without decoding anything.
//!
//! A canary is the degenerate sibling of an entry: empty payload, tag
//! derived from the index name with a reserved suffix. Its only meaning
//! is its presence: any canary at an address says "a tree node of this
//! index lives here". The suffix keeps canaries inside the index's tag
//! filter while making them impossible to confuse with entry records.

use bytes::Bytes;
use pht_api::{DhtValue, PhtError, PhtResult, ValueFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reserved tag suffix marking canary values.
const CANARY_SUFFIX: &str = ".canary";

/// A record stored in the DHT by a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The complete binary key of the indexed item.
    pub prefix: Bytes,

    /// Opaque application payload.
    pub value: Bytes,

    /// The index instance this entry belongs to; carried in the DHT
    /// side-channel tag, not in the payload.
    pub name: String,
}

/// Payload wire shape of an [IndexEntry]; the name travels separately.
#[derive(Serialize, Deserialize)]
struct EntryPayload {
    #[serde(with = "pht_api::b64")]
    prefix: Bytes,
    #[serde(with = "pht_api::b64")]
    value: Bytes,
}

impl IndexEntry {
    /// Construct an entry for the index `name`.
    pub fn new(prefix: Bytes, value: Bytes, name: String) -> Self {
        Self {
            prefix,
            value,
            name,
        }
    }

    /// Pack this entry into a DHT value, name on the side channel.
    pub fn to_value(&self) -> PhtResult<DhtValue> {
        let payload = serde_json::to_vec(&EntryPayload {
            prefix: self.prefix.clone(),
            value: self.value.clone(),
        })
        .map_err(|e| PhtError::codec("index entry", e))?;
        Ok(DhtValue {
            user_type: self.name.clone(),
            payload: payload.into(),
        })
    }

    /// Unpack an entry from a DHT value.
    ///
    /// Fails on canary values and on undecodable payloads; the caller
    /// decides whether that is worth reporting.
    pub fn from_value(v: &DhtValue) -> PhtResult<Self> {
        if v.user_type.ends_with(CANARY_SUFFIX) {
            return Err(PhtError::other("not an index entry: canary value"));
        }
        let payload: EntryPayload = serde_json::from_slice(&v.payload)
            .map_err(|e| PhtError::codec("index entry", e))?;
        Ok(Self {
            prefix: payload.prefix,
            value: payload.value,
            name: v.user_type.clone(),
        })
    }
}

/// The canary tag of the index `name`.
pub fn canary_tag(name: &str) -> String {
    format!("{name}{CANARY_SUFFIX}")
}

/// An empty-bodied canary value for the index `name`.
pub fn canary_value(name: &str) -> DhtValue {
    DhtValue {
        user_type: canary_tag(name),
        payload: Bytes::new(),
    }
}

/// A filter admitting every value of the index `name`, entries and
/// canaries alike, so several indices can share one DHT.
pub fn index_filter(name: &str) -> ValueFilter {
    let name = name.to_string();
    Arc::new(move |user_type: &str| user_type.starts_with(&name))
}
