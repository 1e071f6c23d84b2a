//! Application key linearization.

use std::sync::Arc;

/// An opaque application key.
///
/// The index never interprets keys itself; a [Linearizer] maps them onto
/// the binary content the tree's prefixes are drawn from.
pub type Key = bytes::Bytes;

/// Maps application keys onto canonical binary content.
///
/// The mapping must be deterministic across peers: every reader and writer
/// of an index has to derive the same bit string from the same key, or
/// records become unreachable. Order-preserving mappings additionally give
/// the tree its range-query power, but that property is up to the
/// implementation.
pub trait Linearizer: 'static + Send + Sync + std::fmt::Debug {
    /// Produce the canonical bit-string content for `key`.
    fn linearize(&self, key: &Key) -> bytes::Bytes;
}

/// Trait-object version of [Linearizer].
pub type DynLinearizer = Arc<dyn Linearizer>;

/// Pass-through linearizer for keys that already are canonical byte
/// strings.
#[derive(Debug)]
pub struct IdentityLinearizer;

impl IdentityLinearizer {
    /// Construct an [IdentityLinearizer] trait object.
    pub fn create() -> DynLinearizer {
        Arc::new(IdentityLinearizer)
    }
}

impl Linearizer for IdentityLinearizer {
    fn linearize(&self, key: &Key) -> bytes::Bytes {
        key.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_is_pass_through() {
        let l = IdentityLinearizer::create();
        let k = bytes::Bytes::from_static(b"some-key");
        assert_eq!(k, l.linearize(&k));
    }
}
