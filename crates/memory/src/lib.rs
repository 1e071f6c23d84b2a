#![deny(missing_docs)]
//! An in-memory [Dht] implementation for pht tests and examples.
//!
//! This backend keeps every value in a process-local map and never
//! expires anything. It exists so the index logic can be exercised
//! without a network; it is not a real DHT.

use bytes::Bytes;
use futures::future::BoxFuture;
use pht_api::{Dht, DhtAddr, DhtValue, DynDht, PhtResult, ValueFilter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory DHT backend.
///
/// `put` of a value identical to one already stored at the address is
/// treated as a refresh rather than a duplicate, which is how a real DHT
/// behaves when the same canary or record is re-announced to extend its
/// TTL.
#[derive(Debug, Default)]
pub struct MemDht {
    inner: RwLock<HashMap<DhtAddr, Vec<DhtValue>>>,
}

impl MemDht {
    /// Construct a new empty [MemDht].
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a new empty [MemDht] as a trait object.
    pub fn create() -> DynDht {
        Arc::new(Self::new())
    }

    /// Every value currently stored at `addr`, unfiltered.
    ///
    /// Test accessor; the trait surface only exposes filtered reads.
    pub async fn values_at(&self, addr: &DhtAddr) -> Vec<DhtValue> {
        self.inner
            .read()
            .await
            .get(addr)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of stored values across all addresses.
    pub async fn len(&self) -> usize {
        self.inner.read().await.values().map(Vec::len).sum()
    }

    /// Whether nothing is stored at all.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Dht for MemDht {
    fn get(
        &self,
        addr: DhtAddr,
        filter: ValueFilter,
    ) -> BoxFuture<'_, PhtResult<Vec<DhtValue>>> {
        Box::pin(async move {
            Ok(self
                .inner
                .read()
                .await
                .get(&addr)
                .map(|values| {
                    values
                        .iter()
                        .filter(|v| filter(&v.user_type))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn put(
        &self,
        addr: DhtAddr,
        value: DhtValue,
    ) -> BoxFuture<'_, PhtResult<()>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let values = inner.entry(addr).or_default();
            if !values.contains(&value) {
                values.push(value);
            }
            Ok(())
        })
    }
}

/// Shorthand for building a [DhtValue] in tests.
pub fn value(user_type: impl Into<String>, payload: impl Into<Bytes>) -> DhtValue {
    DhtValue {
        user_type: user_type.into(),
        payload: payload.into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn addr(b: &'static [u8]) -> DhtAddr {
        DhtAddr::from(Bytes::from_static(b))
    }

    fn accept_all() -> ValueFilter {
        Arc::new(|_: &str| true)
    }

    #[tokio::test]
    async fn get_returns_only_filtered_values() {
        let dht = MemDht::new();
        dht.put(addr(b"a"), value("idx", "one")).await.unwrap();
        dht.put(addr(b"a"), value("other", "two")).await.unwrap();

        let got = dht
            .get(addr(b"a"), Arc::new(|t: &str| t.starts_with("idx")))
            .await
            .unwrap();
        assert_eq!(vec![value("idx", "one")], got);

        let got = dht.get(addr(b"a"), accept_all()).await.unwrap();
        assert_eq!(2, got.len());

        // a miss is an empty result, not an error
        assert!(dht.get(addr(b"b"), accept_all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn identical_put_is_a_refresh() {
        let dht = MemDht::new();
        for _ in 0..3 {
            dht.put(addr(b"a"), value("idx", "one")).await.unwrap();
        }
        dht.put(addr(b"a"), value("idx", "two")).await.unwrap();

        assert_eq!(2, dht.values_at(&addr(b"a")).await.len());
        assert_eq!(2, dht.len().await);
    }
}
