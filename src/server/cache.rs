//! TTL cache for extracted-text responses

use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// In-memory cache of extracted text keyed by document id
///
/// Entries expire after the TTL; raw text never changes once a document
/// completes, so invalidation beyond expiry is unnecessary.
pub struct TextCache {
    entries: DashMap<Uuid, CachedText>,
    ttl: Duration,
}

struct CachedText {
    text: String,
    expires_at: Instant,
}

impl TextCache {
    /// Create a cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fetch a live entry, dropping it if expired
    pub fn get(&self, document_id: &Uuid) -> Option<String> {
        if let Some(entry) = self.entries.get(document_id) {
            if entry.expires_at > Instant::now() {
                return Some(entry.text.clone());
            }
        }
        self.entries.remove(document_id);
        None
    }

    /// Store an entry, resetting its expiry
    pub fn insert(&self, document_id: Uuid, text: String) {
        self.entries.insert(
            document_id,
            CachedText {
                text,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_live_entries() {
        let cache = TextCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        cache.insert(id, "hello".to_string());
        assert_eq!(cache.get(&id), Some("hello".to_string()));
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = TextCache::new(Duration::from_millis(10));
        let id = Uuid::new_v4();
        cache.insert(id, "short lived".to_string());

        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get(&id), None);
    }

    #[test]
    fn unknown_ids_miss() {
        let cache = TextCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&Uuid::new_v4()), None);
    }
}
