//! Put Options Module
//!
//! Per-call knobs for writes: TTL override and pin flag.

use std::time::Duration;

/// TTL handling for a single put.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expiry {
    /// New entries take the engine's default TTL; existing entries keep theirs
    #[default]
    Inherit,
    /// Expire after this much idle time
    After(Duration),
    /// Never expire
    Never,
}

impl Expiry {
    /// Maps a seconds value where `0` means "no expiry".
    pub fn from_secs(secs: u64) -> Self {
        Self::after(Duration::from_secs(secs))
    }

    /// `After(ttl)`, or `Never` for a zero TTL.
    pub fn after(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiry::Never
        } else {
            Expiry::After(ttl)
        }
    }

    /// Resolves the TTL to store, given the entry's current TTL (None for a
    /// new entry) and the engine default.
    pub(crate) fn resolve(
        self,
        current: Option<Option<Duration>>,
        default_ttl: Option<Duration>,
    ) -> Option<Duration> {
        match self {
            Expiry::After(ttl) => Some(ttl).filter(|ttl| !ttl.is_zero()),
            Expiry::Never => None,
            Expiry::Inherit => current.unwrap_or(default_ttl),
        }
    }
}

// == Put Options ==
/// Options accepted by `put_with`.
///
/// `pin` left as `None` keeps an existing entry's pin flag (new entries are
/// unpinned).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub expiry: Expiry,
    pub pin: Option<bool>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an idle TTL; a zero TTL means no expiry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.expiry = Expiry::after(ttl);
        self
    }

    pub fn no_expiry(mut self) -> Self {
        self.expiry = Expiry::Never;
        self
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pin = Some(pinned);
        self
    }
}
