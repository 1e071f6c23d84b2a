#![deny(missing_docs)]
//! Contract types for the pht distributed index.
//!
//! This crate defines the types shared between the prefix hash tree and
//! its host: the error type, addresses, timestamps, module configuration,
//! and the collaborator traits the tree consumes (the underlying DHT and
//! the key linearizer). Async trait surfaces use
//! [BoxFuture](futures::future::BoxFuture) throughout. The tree itself
//! lives in the `pht` crate.

pub mod config;

mod error;
pub use error::*;

mod id;
pub use id::*;

mod timestamp;
pub use timestamp::*;

mod dht;
pub use dht::*;

mod key;
pub use key::*;

/// Serde adapter storing [bytes::Bytes] fields as unpadded url-safe
/// base64 text.
pub mod b64 {
    use base64::display::Base64Display;
    use base64::prelude::*;

    /// Encode `bytes` as base64 text, without an intermediate string.
    pub fn serialize<S>(
        bytes: &bytes::Bytes,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer
            .collect_str(&Base64Display::new(bytes, &BASE64_URL_SAFE_NO_PAD))
    }

    /// Decode base64 text back into bytes.
    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<bytes::Bytes, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text: String = serde::Deserialize::deserialize(deserializer)?;
        let raw = BASE64_URL_SAFE_NO_PAD
            .decode(text)
            .map_err(serde::de::Error::custom)?;
        Ok(raw.into())
    }
}
