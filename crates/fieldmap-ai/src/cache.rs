//! Bounded, time-expiring cache of model responses.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};

use fieldmap_model::{Suggestion, SuggestionRequest};

/// Default number of cached responses.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default lifetime of a cached response (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CachedResponse {
    suggestions: Vec<Suggestion>,
    stored_at: Instant,
}

/// Suggestions keyed by the digest of the request payload.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CachedResponse>>,
    ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl ResponseCache {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// SHA-256 hex digest of the request's JSON form.
    pub fn key_for(request: &SuggestionRequest) -> Option<String> {
        let payload = serde_json::to_vec(request).ok()?;
        Some(hex::encode(Sha256::digest(&payload)))
    }

    /// A live entry for `key`; expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<Vec<Suggestion>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = entries
            .peek(key)
            .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl);
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.suggestions.clone())
    }

    pub fn insert(&self, key: String, suggestions: Vec<Suggestion>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(
            key,
            CachedResponse {
                suggestions,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
