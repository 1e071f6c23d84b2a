//! Types dealing with DHT addressing.

/// An address in the underlying DHT keyspace.
///
/// This is the output of hashing a canonicalized bit prefix. The bytes are
/// ONLY the actual hash bytes, without prefix or suffix, so equality and
/// ordering follow the hash function directly.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct DhtAddr(#[serde(with = "crate::b64")] pub bytes::Bytes);

impl std::ops::Deref for DhtAddr {
    type Target = bytes::Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<bytes::Bytes> for DhtAddr {
    fn from(b: bytes::Bytes) -> Self {
        DhtAddr(b)
    }
}

/// Base64 rendering makes log lines and assertion failures legible,
/// as opposed to rust's default of a decimal byte array.
impl std::fmt::Display for DhtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use base64::prelude::*;
        f.write_str(&BASE64_URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl std::fmt::Debug for DhtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
