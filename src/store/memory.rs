// ABOUTME: In-memory session store with TTL entries and LRU bounding
// ABOUTME: Atomic take implemented as a single write-locked remove
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::SessionStore;
use crate::errors::AppResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// In-memory entry with expiration
#[derive(Debug, Clone)]
struct StoreEntry {
    value: String,
    expires_at: Instant,
}

impl StoreEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session store with LRU eviction
///
/// `LruCache` bounds the number of pending slots so an attacker requesting
/// auth URLs in a loop cannot grow memory without bound; the oldest pending
/// slots are evicted first, which is indistinguishable from TTL expiry to
/// their owners.
#[derive(Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<LruCache<String, StoreEntry>>>,
}

impl InMemorySessionStore {
    /// Fallback capacity when configuration specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a store bounded to `max_entries` pending slots
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = StoreEntry::new(value.to_owned(), ttl);
        self.entries.write().await.push(key.to_owned(), entry);
        Ok(())
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        // Single locked pop keeps read-then-delete atomic: a concurrent
        // take on the same key observes the entry already gone.
        let removed = self.entries.write().await.pop(key);
        match removed {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }
}
