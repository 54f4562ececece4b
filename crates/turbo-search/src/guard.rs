//! Last-request-wins tracking for overlapping async loads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out increasing request ids and tells whether an id is still the
/// newest. A response whose id is stale must not be committed.
#[derive(Debug, Default)]
pub struct RequestGuard {
    latest: AtomicU64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request and return its id.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether no request has started since `id`.
    pub fn is_current(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }
}
