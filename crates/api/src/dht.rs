//! The underlying DHT collaborator trait.
//!
//! The prefix hash tree treats the DHT as a black box offering point
//! lookups and stores over [DhtAddr] addresses. Anything beyond that
//! interface, such as transport, bootstrap, replication, or value TTL
//! policy, belongs to the DHT implementation.

use crate::{DhtAddr, PhtResult};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A logical value stored in the DHT.
///
/// The `user_type` is a side channel the DHT exposes to consumers without
/// decoding the payload, which is how multiple indices can share one DHT:
/// a reader filters on the tag before ever touching the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhtValue {
    /// Side-channel tag, visible to filters.
    pub user_type: String,

    /// Opaque payload bytes.
    pub payload: bytes::Bytes,
}

/// A filter predicate over a value's side-channel tag.
///
/// Receives the `user_type` of a candidate value and decides inclusion.
pub type ValueFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The API of the underlying key/value DHT the index is layered over.
///
/// Implementations must be cheap to clone through [DynDht] and safe to
/// call concurrently; the index issues parallel `get`s against distinct
/// addresses within a single logical search.
pub trait Dht: 'static + Send + Sync + std::fmt::Debug {
    /// Retrieve all values stored at `addr` whose side-channel tag passes
    /// `filter`.
    ///
    /// An `Err` means the underlying network operation failed; partial
    /// results are discarded by the caller in that case.
    fn get(
        &self,
        addr: DhtAddr,
        filter: ValueFilter,
    ) -> BoxFuture<'_, PhtResult<Vec<DhtValue>>>;

    /// Store a value at `addr`.
    fn put(
        &self,
        addr: DhtAddr,
        value: DhtValue,
    ) -> BoxFuture<'_, PhtResult<()>>;
}

/// Trait-object version of the DHT collaborator.
pub type DynDht = Arc<dyn Dht>;
