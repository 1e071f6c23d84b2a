//! The immutable bit-prefix value type.
//!
//! A [Prefix] is a view of the first `size` bits of a linearized key,
//! keeping a handle on the full original content so a search can be
//! widened again (see [Prefix::full_size]). Bits are addressed MSB-first
//! within each byte, so bit `i` of the prefix is bit `7 - (i % 8)` of
//! byte `i / 8`.
//!
//! Equality is over the represented bits: two prefixes of the same length
//! whose leading bits agree are equal even if their trailing content
//! differs. [Prefix::hash] is likewise computed over a canonical encoding
//! with unused trailing bits zeroed, so the same tree node hashes to the
//! same DHT address on every peer regardless of which key it was reached
//! through.

use bytes::{Bytes, BytesMut};
use pht_api::DhtAddr;
use sha2::{Digest, Sha256};

/// An immutable bit string identifying a node of the prefix hash tree.
#[derive(Clone)]
pub struct Prefix {
    content: Bytes,
    size: usize,
}

impl Prefix {
    /// A prefix spanning every bit of `content`.
    pub fn full(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let size = content.len() * 8;
        Self { content, size }
    }

    /// A prefix of the first `size` bits of `content`.
    ///
    /// `size` is clamped to the bit length of `content`.
    pub fn with_len(content: impl Into<Bytes>, size: usize) -> Self {
        let content = content.into();
        let size = size.min(content.len() * 8);
        Self { content, size }
    }

    /// Build a prefix from a literal string of `'0'`/`'1'` characters.
    ///
    /// Intended for tests and fixtures. Panics on any other character.
    pub fn from_bit_str(bits: &str) -> Self {
        let mut content = BytesMut::zeroed(bits.len().div_ceil(8));
        for (i, c) in bits.chars().enumerate() {
            match c {
                '0' => (),
                '1' => content[i / 8] |= 1 << (7 - (i % 8)),
                _ => panic!("invalid bit character: {c:?}"),
            }
        }
        Self {
            content: content.freeze(),
            size: bits.len(),
        }
    }

    /// Bit length of this prefix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The full linearized key content this prefix was drawn from.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Bit at index `i`, MSB first. `i` must be below [Prefix::size].
    pub fn bit(&self, i: usize) -> bool {
        debug_assert!(i < self.size);
        self.content[i / 8] & (1 << (7 - (i % 8))) != 0
    }

    /// The sub-prefix of the first `n` bits, saturating at [Prefix::size].
    pub fn prefix_of(&self, n: usize) -> Prefix {
        Prefix {
            content: self.content.clone(),
            size: n.min(self.size),
        }
    }

    /// The prefix one bit shorter than this one.
    ///
    /// Must not be called on an empty prefix; callers check
    /// [Prefix::size] first.
    pub fn parent(&self) -> Prefix {
        debug_assert!(self.size > 0);
        Prefix {
            content: self.content.clone(),
            size: self.size.saturating_sub(1),
        }
    }

    /// The sibling prefix: same length, last bit flipped.
    ///
    /// The flip is applied to a copy of the full content, so extending the
    /// sibling with [Prefix::full_size] restarts a search inside the
    /// sibling subtree. Must not be called on an empty prefix.
    pub fn sibling(&self) -> Prefix {
        debug_assert!(self.size > 0);
        let i = self.size - 1;
        let mut content = BytesMut::from(&self.content[..]);
        content[i / 8] ^= 1 << (7 - (i % 8));
        Prefix {
            content: content.freeze(),
            size: self.size,
        }
    }

    /// Extend this prefix back to the full bit length of its content.
    pub fn full_size(&self) -> Prefix {
        Prefix::full(self.content.clone())
    }

    /// The DHT address of this prefix.
    ///
    /// SHA-256 over the canonical encoding: the bit length as a big-endian
    /// u64, followed by the content truncated to the bytes the prefix
    /// occupies, with unused trailing bits zeroed. Two prefixes that
    /// represent the same bits therefore hash identically on every peer.
    pub fn hash(&self) -> DhtAddr {
        let mut hasher = Sha256::new();
        hasher.update((self.size as u64).to_be_bytes());
        hasher.update(self.canonical_bytes());
        DhtAddr::from(Bytes::copy_from_slice(&hasher.finalize()))
    }

    /// Length of the longest common bit prefix of `a` and `b`, compared up
    /// to the shorter of the two.
    pub fn common_bits(a: &Prefix, b: &Prefix) -> usize {
        let limit = a.size.min(b.size);
        for i in 0..limit {
            if a.bit(i) != b.bit(i) {
                return i;
            }
        }
        limit
    }

    /// Content truncated to the occupied bytes, trailing unused bits
    /// zeroed.
    fn canonical_bytes(&self) -> Vec<u8> {
        let n = self.size.div_ceil(8);
        let mut out = self.content[..n].to_vec();
        let spare = n * 8 - self.size;
        if spare > 0 {
            // mask off the low `spare` bits of the last byte
            out[n - 1] &= 0xffu8 << spare;
        }
        out
    }
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && Prefix::common_bits(self, other) == self.size
    }
}

impl Eq for Prefix {}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.size {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prefix({self})")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bit_addressing_is_msb_first() {
        let p = Prefix::full(Bytes::from_static(&[0b1010_0000, 0b0000_0001]));
        assert_eq!(16, p.size());
        assert!(p.bit(0));
        assert!(!p.bit(1));
        assert!(p.bit(2));
        assert!(p.bit(15));
        assert_eq!("1010000000000001", p.to_string());
    }

    #[test]
    fn from_bit_str_round_trips_display() {
        for bits in ["", "1", "0", "1011", "111100001", "10000000000000001"] {
            assert_eq!(bits, Prefix::from_bit_str(bits).to_string());
        }
    }

    #[test]
    fn prefix_of_saturates() {
        let p = Prefix::from_bit_str("1011");
        assert_eq!(Prefix::from_bit_str("10"), p.prefix_of(2));
        assert_eq!(p, p.prefix_of(4));
        assert_eq!(p, p.prefix_of(400));
        assert_eq!(0, p.prefix_of(0).size());
    }

    #[test]
    fn parent_drops_last_bit() {
        let p = Prefix::from_bit_str("1011");
        assert_eq!(Prefix::from_bit_str("101"), p.parent());
        assert_eq!(Prefix::from_bit_str(""), p.parent().parent().parent().parent());
    }

    #[test]
    fn sibling_flips_last_bit_only() {
        let p = Prefix::from_bit_str("1011");
        assert_eq!(Prefix::from_bit_str("1010"), p.sibling());
        assert_eq!(p, p.sibling().sibling());

        // the flip carries into the content, so widening the sibling
        // restarts below the flipped bit
        let full = Prefix::full(Bytes::from_static(&[0b1011_1111]));
        let sib = full.prefix_of(4).sibling().full_size();
        assert_eq!("10101111", sib.to_string());
    }

    #[test]
    fn equality_ignores_trailing_content() {
        let a = Prefix::with_len(Bytes::from_static(&[0b1010_1111]), 4);
        let b = Prefix::with_len(Bytes::from_static(&[0b1010_0000]), 4);
        assert_eq!(a, b);
        assert_ne!(a, a.prefix_of(3));
        assert_ne!(a, Prefix::from_bit_str("1011"));
    }

    #[test]
    fn hash_is_canonical_over_bits() {
        let a = Prefix::with_len(Bytes::from_static(&[0b1010_1111, 0xff]), 4);
        let b = Prefix::from_bit_str("1010");
        assert_eq!(a.hash(), b.hash());

        // differing size or differing bits give a different address
        assert_ne!(a.hash(), a.prefix_of(3).hash());
        assert_ne!(a.hash(), a.sibling().hash());
        assert_ne!(
            Prefix::from_bit_str("").hash(),
            Prefix::from_bit_str("0").hash()
        );
    }

    #[test]
    fn common_bits_stops_at_first_divergence() {
        let a = Prefix::from_bit_str("10110");
        assert_eq!(5, Prefix::common_bits(&a, &a));
        assert_eq!(3, Prefix::common_bits(&a, &Prefix::from_bit_str("10100")));
        assert_eq!(0, Prefix::common_bits(&a, &Prefix::from_bit_str("0")));
        // compared up to the shorter of the two
        assert_eq!(2, Prefix::common_bits(&a, &Prefix::from_bit_str("10")));
        assert_eq!(0, Prefix::common_bits(&a, &Prefix::from_bit_str("")));
    }
}
