//! The prefix hash tree facade and its lookup engine.
//!
//! A tree node is nothing but a DHT address: the hash of some prefix of a
//! linearized key, marked by a canary value. Finding the leaf responsible
//! for a key is therefore a search over prefix *length*, and because
//! canaries make "is there a node at depth d" a cheap point query, the
//! search can bisect: probe the address at depth `mid` and at `mid + 1`
//! in parallel, then
//! - node at both: descend, `lo = mid + 1`,
//! - node at `mid` only: `mid` is the leaf,
//! - node at neither: the tree ends above, `hi = mid - 1`.
//!
//! Each completed search feeds the [PrefixCache], so a warm client starts
//! near the right depth and skips the top of the bisection entirely.
//!
//! Inserts ride the same engine: an exact search in collect-all mode
//! returns the current leaf and its occupants, the record goes one bit
//! deeper when the leaf is full, and canaries are refreshed along the way
//! so future searches can see the extended tree.

use crate::{canary_tag, canary_value, index_filter, IndexEntry, Prefix, PrefixCache};
use bytes::Bytes;
use futures::future::BoxFuture;
use pht_api::{DhtValue, DynDht, DynLinearizer, Key, PhtResult, Timestamp};
use rand::Rng;
use tokio::sync::Mutex;

use config::*;


/// Pht configuration types.
pub mod config {
    use std::time::Duration;

    /// Configuration parameters for [Pht](super::Pht).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PhtConfig {
        /// Cap on the number of anchored paths the trie cache retains.
        /// Default: 1024.
        pub max_cache_leaves: usize,

        /// How long an untouched cache path stays alive. Default: 10 min.
        pub cache_expire: Duration,

        /// How many records a leaf may hold before an insert extends the
        /// tree one bit deeper. Default: 100.
        pub max_node_entry_count: usize,

        /// Probability of climbing one more level when refreshing
        /// ancestor canaries on insert. Default: 0.5.
        pub canary_up_probability: f64,
    }

    impl Default for PhtConfig {
        fn default() -> Self {
            Self {
                max_cache_leaves: 1024,
                cache_expire: Duration::from_secs(60 * 10),
                max_node_entry_count: 100,
                canary_up_probability: 0.5,
            }
        }
    }

    /// Module-level configuration for [Pht](super::Pht).
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PhtModConfig {
        /// Pht configuration.
        pub pht: PhtConfig,
    }

    impl pht_api::config::ModConfig for PhtModConfig {}
}

/// The outcome of a lookup: the matched values and the prefix of the leaf
/// the search ended at.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Values matching the query, per the exact or nearest rule.
    pub values: Vec<Bytes>,

    /// The leaf prefix the search committed to.
    pub prefix: Prefix,
}

/// How a search classifies the entries it encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    /// Keep entries whose full key equals the query key.
    Exact,
    /// Keep every entry seen; used by insert to count leaf occupancy.
    CollectAll,
    /// Keep the set of entries sharing the most leading bits with the
    /// query.
    Nearest,
}

/// API trait for the prefix hash tree.
#[cfg_attr(feature = "mockall", mockall::automock)]
pub trait PhtApi: 'static + Send + Sync + std::fmt::Debug {
    /// Look up `key`; see [Pht::lookup].
    fn lookup(
        &self,
        key: Key,
        exact_match: bool,
    ) -> BoxFuture<'_, PhtResult<LookupResult>>;

    /// Insert `value` under `key`; see [Pht::insert].
    fn insert(&self, key: Key, value: Bytes) -> BoxFuture<'_, PhtResult<()>>;
}

/// A named prefix hash tree over a DHT.
///
/// Holds the DHT handle, the index name, and the client-side trie cache.
/// All tree state beyond the cache lives in the DHT itself, so instances
/// are cheap and any number of peers can serve the same index by
/// constructing it with the same name and linearizer.
#[derive(Debug)]
pub struct Pht {
    name: String,
    canary: String,
    dht: DynDht,
    linearizer: DynLinearizer,
    cache: Mutex<PrefixCache>,
    config: PhtConfig,
}

impl Pht {
    /// Construct a prefix hash tree named `name` over `dht`.
    pub fn new(
        name: impl Into<String>,
        dht: DynDht,
        linearizer: DynLinearizer,
        config: PhtConfig,
    ) -> Self {
        let name = name.into();
        let canary = canary_tag(&name);
        let cache =
            Mutex::new(PrefixCache::new(config.max_cache_leaves, config.cache_expire));
        Self {
            name,
            canary,
            dht,
            linearizer,
            cache,
            config,
        }
    }

    /// Look up the values indexed under `key`.
    ///
    /// With `exact_match` the result holds the values stored under
    /// exactly `key`. Without it, the result holds the set of values
    /// whose keys share the most leading bits with `key` among those the
    /// traversal encountered; if the leaf subtree turns out empty, the
    /// search widens once into the sibling subtree before giving up.
    ///
    /// An `Err` reflects a failed DHT operation; an empty value list with
    /// `Ok` means the search completed and found nothing.
    pub async fn lookup(
        &self,
        key: &Key,
        exact_match: bool,
    ) -> PhtResult<LookupResult> {
        let kp = Prefix::full(self.linearizer.linearize(key));
        let hint = self.cache.lock().await.lookup(&kp, Timestamp::now());
        let rule = if exact_match {
            MatchRule::Exact
        } else {
            MatchRule::Nearest
        };
        let (values, prefix) = self.lookup_step(kp, hint, rule).await?;
        Ok(LookupResult { values, prefix })
    }

    /// Insert `value` under `key`.
    ///
    /// Locates the current leaf for the key, extends the target one bit
    /// deeper when the leaf is already at capacity, refreshes the canaries
    /// marking the target node, and stores the record at the target's
    /// address. Records already at a split leaf are not rewritten; a
    /// record's effective leaf is the deepest node along its prefix chain
    /// at which it is found.
    pub async fn insert(&self, key: &Key, value: Bytes) -> PhtResult<()> {
        let kp = Prefix::full(self.linearizer.linearize(key));
        let hint = self.cache.lock().await.lookup(&kp, Timestamp::now());
        let (occupants, mut target) = self
            .lookup_step(kp.clone(), hint, MatchRule::CollectAll)
            .await?;

        if occupants.len() >= self.config.max_node_entry_count {
            target = kp.prefix_of(target.size() + 1);
            tracing::debug!(
                index = %self.name,
                depth = target.size(),
                "leaf full, extending one bit deeper"
            );
        }

        let entry =
            IndexEntry::new(kp.content().clone(), value, self.name.clone())
                .to_value()?;
        let (put, ()) = futures::join!(
            self.dht.put(target.hash(), entry),
            self.update_canary(target.clone())
        );
        put
    }

    /// One whole binary search over prefix length, including the one-shot
    /// sibling restart.
    ///
    /// `start` overrides the first midpoint when non-negative (the cache
    /// hint); afterwards midpoints bisect `[lo, hi]`. Returns the
    /// accumulated values and the leaf prefix the search committed to.
    async fn lookup_step(
        &self,
        prefix: Prefix,
        start: i32,
        rule: MatchRule,
    ) -> PhtResult<(Vec<Bytes>, Prefix)> {
        let filter = index_filter(&self.name);
        let mut p = prefix;
        let mut lo: i64 = 0;
        let mut hi: i64 = p.size() as i64;
        let mut start = start as i64;
        let mut vals: Vec<Bytes> = Vec::new();
        let mut max_common = 0usize;
        let mut restarted = false;

        loop {
            // an exhausted range still needs a mid for the leaf commit;
            // truncating division lands it where the bisection stopped
            let mid = if start >= 0 {
                start as usize
            } else {
                ((lo + hi) / 2).max(0) as usize
            };
            start = -1;

            if lo <= hi {
                let first_fut =
                    self.dht.get(p.prefix_of(mid).hash(), filter.clone());
                let (first, second) = if mid < p.size() {
                    let (f, s) = futures::join!(
                        first_fut,
                        self.dht
                            .get(p.prefix_of(mid + 1).hash(), filter.clone())
                    );
                    (f, Some(s))
                } else {
                    // no deeper probe exists below a full-length prefix
                    (first_fut.await, None)
                };

                let first = first?;
                let first_is_pht =
                    self.absorb(&p, first, rule, &mut vals, &mut max_common);

                if !first_is_pht {
                    // nothing at mid: the tree ends above. Values the
                    // deeper probe returned still count; its failure does
                    // not, the decision is already made.
                    if let Some(Ok(second)) = second {
                        self.absorb(&p, second, rule, &mut vals, &mut max_common);
                    }
                    hi = mid as i64 - 1;
                    continue;
                }

                let second_is_pht = match second {
                    None => false,
                    Some(second) => {
                        let second = second?;
                        self.absorb(&p, second, rule, &mut vals, &mut max_common)
                    }
                };
                if second_is_pht {
                    lo = mid as i64 + 1;
                    continue;
                }
            }

            // leaf at mid
            let matched = p.prefix_of(mid);
            self.cache.lock().await.insert(&matched, Timestamp::now());

            if vals.is_empty()
                && rule == MatchRule::Nearest
                && mid > 0
                && !restarted
            {
                let sibling = matched.sibling().full_size();
                tracing::debug!(
                    index = %self.name,
                    prefix = %matched,
                    "empty leaf, widening into the sibling subtree"
                );
                lo = mid as i64;
                hi = sibling.size() as i64;
                p = sibling;
                restarted = true;
                continue;
            }

            return Ok((vals, matched));
        }
    }

    /// Classify one probe's values into `vals` under `rule`.
    ///
    /// Returns true if any canary marked the probed address as a tree
    /// node of this index.
    fn absorb(
        &self,
        p: &Prefix,
        values: Vec<DhtValue>,
        rule: MatchRule,
        vals: &mut Vec<Bytes>,
        max_common: &mut usize,
    ) -> bool {
        let mut is_pht = false;
        for v in values {
            if v.user_type == self.canary {
                is_pht = true;
                continue;
            }
            let entry = match IndexEntry::from_value(&v) {
                Ok(entry) => entry,
                Err(err) => {
                    // a foreign or corrupt value classifies as nothing
                    tracing::debug!(?err, "skipping undecodable value");
                    continue;
                }
            };
            match rule {
                MatchRule::CollectAll => vals.push(entry.value),
                MatchRule::Exact => {
                    if entry.prefix == *p.content() {
                        vals.push(entry.value);
                    }
                }
                MatchRule::Nearest => {
                    let c = Prefix::common_bits(p, &Prefix::full(entry.prefix));
                    if vals.is_empty() {
                        vals.push(entry.value);
                        *max_common = c;
                    } else if c == *max_common {
                        vals.push(entry.value);
                    } else if c > *max_common {
                        vals.clear();
                        vals.push(entry.value);
                        *max_common = c;
                    }
                }
            }
        }
        is_pht
    }

    /// Refresh the canaries marking `p` as a tree node.
    ///
    /// Puts a canary at `p` and at its sibling, then climbs one level
    /// with the configured probability and repeats. The geometric climb
    /// keeps ancestor canaries fresh across many inserts without paying a
    /// full-depth walk on each one. Failures are logged and swallowed;
    /// canaries are redundant and the next insert retries them anyway.
    async fn update_canary(&self, p: Prefix) {
        let mut p = p;
        loop {
            let main = self.dht.put(p.hash(), canary_value(&self.name));
            if p.size() > 0 {
                let sibling = self
                    .dht
                    .put(p.sibling().hash(), canary_value(&self.name));
                let (main, sibling) = futures::join!(main, sibling);
                for res in [main, sibling] {
                    if let Err(err) = res {
                        tracing::warn!(?err, "canary refresh failed");
                    }
                }
            } else if let Err(err) = main.await {
                tracing::warn!(?err, "canary refresh failed");
            }

            if p.size() > 0
                && rand::thread_rng().gen_bool(self.config.canary_up_probability)
            {
                p = p.parent();
            } else {
                break;
            }
        }
    }
}

impl PhtApi for Pht {
    fn lookup(
        &self,
        key: Key,
        exact_match: bool,
    ) -> BoxFuture<'_, PhtResult<LookupResult>> {
        Box::pin(async move { Pht::lookup(self, &key, exact_match).await })
    }

    fn insert(&self, key: Key, value: Bytes) -> BoxFuture<'_, PhtResult<()>> {
        Box::pin(async move { Pht::insert(self, &key, value).await })
    }
}
