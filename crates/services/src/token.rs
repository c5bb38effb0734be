use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one asynchronous request against a shared slot.
///
/// Tokens only grow. A completion may touch shared state only while its token
/// is still the latest one issued for that slot; anything older is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues strictly increasing `SessionToken`s.
#[derive(Debug, Default)]
pub struct TokenSource {
    last: AtomicU64,
}

impl TokenSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> SessionToken {
        SessionToken(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
