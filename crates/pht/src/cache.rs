//! Client-side trie cache of recently touched prefixes.
//!
//! Every completed search learns the depth of one real tree node. Keeping
//! those depths in a small binary trie lets the next search over a nearby
//! key start its probing at a depth that is likely close to a real node
//! instead of bisecting from scratch, skipping the upper rounds of the
//! binary search.
//!
//! The trie is bounded two ways: a cap on the number of anchored leaves,
//! and a per-entry expiry. Ownership runs from the leaves upward: the
//! `leaves` multimap (ordered by anchor timestamp) is the only thing that
//! keeps nodes alive, each node pins its parent chain, and parent-to-child
//! links are non-owning. Dropping the last anchor of a childless node
//! therefore collapses the whole dangling chain toward the root. Rather
//! than encoding that with strong/weak reference pairs, nodes live in an
//! id-addressed arena with an explicit anchor count per node; the cascade
//! is a loop walking parent links.

use crate::Prefix;
use pht_api::Timestamp;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

type NodeId = u64;

#[derive(Debug)]
struct CacheNode {
    parent: Option<NodeId>,
    /// Child ids by branch bit; non-owning, cleared on child removal.
    children: [Option<NodeId>; 2],
    /// Advances monotonically; every traversal of this node refreshes it.
    last_reply: Timestamp,
    /// Number of `leaves` entries currently pointing at this node.
    anchors: u32,
}

/// A bounded, time-expiring binary trie of recently touched prefixes.
///
/// Not internally synchronized; the owning index wraps it in a lock.
#[derive(Debug)]
pub struct PrefixCache {
    max_leaves: usize,
    expire: Duration,
    nodes: HashMap<NodeId, CacheNode>,
    root: Option<NodeId>,
    /// Anchor multimap ordered by timestamp; the sequence number
    /// disambiguates equal timestamps.
    leaves: BTreeMap<(Timestamp, u64), NodeId>,
    next_id: NodeId,
    next_seq: u64,
}

impl PrefixCache {
    /// Construct a cache holding at most `max_leaves` anchored paths, each
    /// expiring `expire` after its last touch.
    pub fn new(max_leaves: usize, expire: Duration) -> Self {
        Self {
            max_leaves,
            expire,
            nodes: HashMap::new(),
            root: None,
            leaves: BTreeMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Record that a search confirmed a tree node at prefix `p`.
    ///
    /// Walks `p` bit by bit from the root, creating missing nodes, touches
    /// `last_reply` on every node along the path including the root, and
    /// anchors the final node at `now`.
    pub fn insert(&mut self, p: &Prefix, now: Timestamp) {
        // expired entries, then surplus, so the new anchor fits the cap
        self.evict_expired(now);
        while !self.leaves.is_empty() && self.leaves.len() >= self.max_leaves
        {
            self.evict_front();
        }

        let root = match self.root {
            Some(id) => id,
            None => {
                let id = self.alloc(None, now);
                self.root = Some(id);
                id
            }
        };
        self.node_mut(root).last_reply = now;

        let mut cur = root;
        for i in 0..p.size() {
            let dir = p.bit(i) as usize;
            let existing = self.node_mut(cur).children[dir];
            let next = match existing {
                Some(id) => id,
                None => {
                    let id = self.alloc(Some(cur), now);
                    self.node_mut(cur).children[dir] = Some(id);
                    id
                }
            };
            self.node_mut(next).last_reply = now;
            cur = next;
        }

        self.anchor(cur, now);
    }

    /// Best-effort starting depth for a search over `p`.
    ///
    /// Walks from the root following the bits of `p` until a child is
    /// missing or the bits run out, touching every traversed node, and
    /// returns the depth of the deepest node reached (`-1` when nothing
    /// matched). The deepest node is re-anchored at `now` so hot paths
    /// stay alive: its previous anchor entry (keyed by its prior
    /// `last_reply`) is replaced by a fresh one.
    pub fn lookup(&mut self, p: &Prefix, now: Timestamp) -> i32 {
        self.evict_expired(now);

        let mut pos = 0usize;
        let mut cur = self.root;
        let mut deepest: Option<(NodeId, Timestamp)> = None;

        while let Some(id) = cur {
            if pos >= p.size() {
                break;
            }
            let node = self.node_mut(id);
            let prior = node.last_reply;
            node.last_reply = now;
            deepest = Some((id, prior));
            cur = node.children[p.bit(pos) as usize];
            pos += 1;
        }

        if let Some((id, prior)) = deepest {
            let prior_key = self
                .leaves
                .range((prior, 0)..=(prior, u64::MAX))
                .find(|(_, nid)| **nid == id)
                .map(|(k, _)| *k);
            if let Some(k) = prior_key {
                self.leaves.remove(&k);
                self.node_mut(id).anchors -= 1;
            }
            self.anchor(id, now);
            while self.leaves.len() > self.max_leaves {
                self.evict_front();
            }
        }

        pos as i32 - 1
    }

    fn alloc(&mut self, parent: Option<NodeId>, now: Timestamp) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            CacheNode {
                parent,
                children: [None, None],
                last_reply: now,
                anchors: 0,
            },
        );
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut CacheNode {
        self.nodes.get_mut(&id).expect("cache node missing from arena")
    }

    fn anchor(&mut self, id: NodeId, now: Timestamp) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.leaves.insert((now, seq), id);
        self.node_mut(id).anchors += 1;
    }

    fn evict_expired(&mut self, now: Timestamp) {
        let expire = self.expire;
        while self
            .leaves
            .first_key_value()
            .is_some_and(|(k, _)| k.0 + expire < now)
        {
            self.evict_front();
        }
    }

    fn evict_front(&mut self) {
        if let Some((_, id)) = self.leaves.pop_first() {
            self.release(id);
        }
    }

    /// Drop one anchor from `id` and collapse the newly dangling chain.
    fn release(&mut self, id: NodeId) {
        self.node_mut(id).anchors -= 1;
        let mut cur = Some(id);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            if node.anchors > 0
                || node.children[0].is_some()
                || node.children[1].is_some()
            {
                break;
            }
            let parent = node.parent;
            self.nodes.remove(&id);
            match parent {
                Some(pid) => {
                    let p = self.node_mut(pid);
                    if p.children[0] == Some(id) {
                        p.children[0] = None;
                    } else if p.children[1] == Some(id) {
                        p.children[1] = None;
                    }
                }
                None => self.root = None,
            }
            cur = parent;
        }
    }
}
