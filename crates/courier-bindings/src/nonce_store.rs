//! Nonce storage for replay detection.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Mutex, PoisonError},
    time::SystemTime,
};

/// Remembers nonces for as long as a message carrying them could still be
/// accepted.
///
/// Implementations are shared by every thread using the channel and must
/// make `store_nonce` atomic: two concurrent calls with the same context and
/// nonce must not both succeed.
pub trait NonceStore: Send + Sync {
    /// Record `nonce` within `context`. Returns `false` if it was already
    /// recorded.
    fn store_nonce(&self, context: &str, nonce: &str, timestamp: SystemTime) -> bool;

    /// Forget nonces whose message timestamp is before `cutoff`.
    fn purge_before(&self, cutoff: SystemTime);
}

/// In-process [`NonceStore`].
///
/// Nonces are keyed by `(context, nonce)`. Memory grows with traffic inside
/// the replay window and is reclaimed by [`purge_before`](NonceStore::purge_before).
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    seen: Mutex<HashMap<(String, String), SystemTime>>,
}

impl MemoryNonceStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nonces currently remembered
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no nonce is remembered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NonceStore for MemoryNonceStore {
    fn store_nonce(&self, context: &str, nonce: &str, timestamp: SystemTime) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.entry((context.to_string(), nonce.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(timestamp);
                true
            },
        }
    }

    fn purge_before(&self, cutoff: SystemTime) {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).retain(|_, at| *at >= cutoff);
    }
}
