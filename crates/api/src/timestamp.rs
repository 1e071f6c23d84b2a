use std::time::Duration;

/// Microsecond wall-clock instant, as the trie cache tracks time.
///
/// The cache orders its leaf anchors by this type and evicts by
/// comparing "anchor time plus expiry window" against the current
/// instant, so the surface is deliberately small: the current instant,
/// construction from raw microseconds for deterministic tests, total
/// ordering, and adding a [Duration].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current wall-clock instant.
    ///
    /// A clock set before the Unix epoch reads as the epoch itself.
    pub fn now() -> Self {
        let micros = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_micros() as i64)
            .unwrap_or(0);
        Self(micros)
    }

    /// The instant `micros` microseconds past the Unix epoch.
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Microseconds past the Unix epoch.
    pub fn as_micros(&self) -> i64 {
        self.0
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at the far future rather than wrapping.
    fn add(self, window: Duration) -> Timestamp {
        let window = i64::try_from(window.as_micros()).unwrap_or(i64::MAX);
        Timestamp(self.0.saturating_add(window))
    }
}
