//! Correlation store for replies produced outside the dispatch call.
//!
//! Some requests (an alert, a slider, an interaction) are answered by a
//! user action long after the request arrived. The handler records the
//! request id here; domain code later resolves it through a dedicated
//! completion entry point, which takes the id out exactly once.

use std::collections::HashMap;

/// Pending `(method -> request id)` correlation entries.
#[derive(Debug, Default)]
pub struct DeferredReplies {
    pending: HashMap<String, u64>,
}

impl DeferredReplies {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `request_id` for `method` awaits a later reply.
    ///
    /// A second defer for the same method replaces the first; the earlier
    /// request is then unanswerable and the caller's timeout applies.
    pub fn defer(&mut self, method: &str, request_id: u64) {
        if let Some(previous) = self.pending.insert(method.to_string(), request_id) {
            tracing::warn!(
                method,
                previous,
                request_id,
                "deferred reply replaced an unresolved entry"
            );
        }
    }

    /// Take the pending request id for `method`, resolving it exactly once.
    pub fn take(&mut self, method: &str) -> Option<u64> {
        self.pending.remove(method)
    }

    /// Whether a reply for `method` is still owed.
    pub fn is_pending(&self, method: &str) -> bool {
        self.pending.contains_key(method)
    }

    /// Number of replies still owed.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is owed.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every entry (session teardown).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
