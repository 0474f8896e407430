// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for registered key lookups.
//!
//! Senders look up the same recipients over and over; this keeps those
//! lookups off redb.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::RegisteredKey;

/// Cached entry: registered key + insertion time.
struct CacheEntry {
    key: RegisteredKey,
    inserted_at: Instant,
}

/// In-process LRU cache keyed by identity.
pub struct KeyCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl KeyCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of identities to cache (at least 1).
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Get the cached key for an identity.
    ///
    /// Returns `None` if not cached or expired.
    pub fn get(&self, identity: &str) -> Option<RegisteredKey> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(identity) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.key.clone());
            }
            cache.pop(identity);
        }
        None
    }

    /// Fill the cache from a database read, unless a newer registration
    /// for the same identity is already cached.
    pub fn put(&self, key: RegisteredKey) {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(existing) = cache.peek(&key.identity) {
                if existing.key.registered_at > key.registered_at {
                    return;
                }
            }
            insert(&mut cache, key);
        }
    }

    /// Store a key that was just committed, overwriting whatever is cached.
    ///
    /// The committed write is the last write whatever its timestamp says, so
    /// no ordering check applies here.
    pub fn replace(&self, key: RegisteredKey) {
        if let Ok(mut cache) = self.cache.lock() {
            insert(&mut cache, key);
        }
    }
}

fn insert(cache: &mut LruCache<String, CacheEntry>, key: RegisteredKey) {
    cache.put(
        key.identity.clone(),
        CacheEntry {
            key,
            inserted_at: Instant::now(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(identity: &str, fill: u8, registered_at: i64) -> RegisteredKey {
        RegisteredKey {
            identity: identity.to_string(),
            encryption_public_key: [fill; 32],
            registered_at,
        }
    }

    #[test]
    fn cache_put_and_get() {
        let cache = KeyCache::new(10, Duration::from_secs(300));
        assert!(cache.get("alice").is_none());

        cache.put(key("alice", 1, 100));
        assert_eq!(cache.get("alice").unwrap().encryption_public_key, [1; 32]);
    }

    #[test]
    fn replace_ignores_timestamps() {
        let cache = KeyCache::new(10, Duration::from_secs(300));
        cache.put(key("alice", 1, 500));
        cache.replace(key("alice", 2, 100));
        assert_eq!(cache.get("alice").unwrap().encryption_public_key, [2; 32]);
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = KeyCache::new(10, Duration::from_millis(1));
        cache.put(key("alice", 1, 100));

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn older_registration_does_not_replace_newer() {
        let cache = KeyCache::new(10, Duration::from_secs(300));
        cache.put(key("alice", 2, 200));
        cache.put(key("alice", 1, 100));
        assert_eq!(cache.get("alice").unwrap().encryption_public_key, [2; 32]);
    }

    #[test]
    fn identities_are_case_sensitive() {
        let cache = KeyCache::new(10, Duration::from_secs(300));
        cache.put(key("Alice", 1, 100));
        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn zero_capacity_still_caches_one() {
        let cache = KeyCache::new(0, Duration::from_secs(300));
        cache.put(key("a", 1, 1));
        cache.put(key("b", 2, 1));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }
}
