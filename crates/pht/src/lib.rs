#![deny(missing_docs)]
//! A prefix hash tree: a trie-structured distributed index layered over a
//! generic key/value DHT.
//!
//! The underlying DHT offers only point lookups: hash an address, fetch
//! the values stored there. This crate maps application keys onto
//! variable-length bit prefixes and stores each indexed record at the DHT
//! address derived from some prefix of its binary key. Interior tree nodes
//! are marked with canary sentinel values, so a binary search over prefix
//! *length* can find the deepest node whose subtree contains a target key
//! in `O(log |key|)` DHT round trips, giving prefix and nearest-match
//! lookups on top of a point-lookup substrate.
//!
//! The pieces:
//! - The [Prefix] value type: an immutable bit string over the linearized
//!   key content, hashable to a [DhtAddr](pht_api::DhtAddr).
//! - The [PrefixCache]: a bounded, time-expiring in-memory trie of
//!   recently touched prefixes that seeds the binary search on repeated
//!   queries.
//! - The [IndexEntry] record and the canary sentinel convention that lets
//!   peers recognize tree nodes among ordinary DHT values.
//! - The [Pht] facade with its `lookup` and `insert` operations.
//!
//! The DHT itself, and the mapping from application keys to binary
//! content, are collaborators behind the [Dht](pht_api::Dht) and
//! [Linearizer](pht_api::Linearizer) traits of the `pht_api` crate.

mod prefix;
pub use prefix::*;

mod cache;
pub use cache::*;

mod entry;
pub use entry::*;

mod pht;
pub use pht::*;
