//! Error and result types shared by the pht crates.

/// Result alias used across the pht crates.
pub type PhtResult<T> = Result<T, PhtError>;

/// Failures surfaced by the index and its collaborators.
///
/// Variants are coarse on purpose: callers react to *where* a failure
/// came from (the network, a codec, or the index itself), not to the
/// precise cause, so each variant carries a rendered message rather than
/// a live source error. That keeps the type small, `Clone`, and
/// comparable in tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhtError {
    /// The underlying DHT reported a failed `get` or `put`.
    #[error("dht failure: {0}")]
    Dht(String),

    /// A stored payload or configuration section failed to encode or
    /// decode.
    #[error("codec failure: {ctx}: {cause}")]
    Codec {
        /// What was being encoded or decoded.
        ctx: String,

        /// The codec's rendered error.
        cause: String,
    },

    /// Any other index-level failure.
    #[error("{0}")]
    Other(String),
}

impl PhtError {
    /// A failed DHT operation.
    pub fn dht(msg: impl std::fmt::Display) -> Self {
        Self::Dht(msg.to_string())
    }

    /// An encode or decode failure on `ctx`, wrapping the codec's own
    /// error.
    pub fn codec(
        ctx: impl std::fmt::Display,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::Codec {
            ctx: ctx.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Any other failure, described by `msg`.
    pub fn other(msg: impl std::fmt::Display) -> Self {
        Self::Other(msg.to_string())
    }
}
