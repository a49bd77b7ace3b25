//! Session caches for read-mostly documents.
//!
//! Pack indexes and spell documents are cached for the lifetime of a session
//! and dropped explicitly when the curation engine reports a change. The TTL
//! only bounds staleness for changes made by other participants.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// A thread-safe cache with time-to-live expiration.
///
/// Expired entries are never returned; they are dropped on the next write
/// that touches them or on [`TtlCache::purge_expired`].
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Cached<V>>>,
    ttl: Duration,
}

struct Cached<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Cached<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now()).await;
    }

    async fn insert_at(&self, key: K, value: V, stored_at: Instant) {
        self.entries
            .write()
            .await
            .insert(key, Cached { value, stored_at });
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Drop one entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry matching `predicate`. Returns how many were dropped.
    pub async fn invalidate_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|key, entry| !predicate(key, &entry.value));
        before - guard.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries and return how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, entry| entry.is_fresh(ttl));
        before - guard.len()
    }

    /// Entry count, including expired entries not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stale(ttl: Duration) -> Instant {
        Instant::now() - (ttl + Duration::from_millis(1))
    }

    #[tokio::test]
    async fn fresh_entries_are_served() {
        let cache: TtlCache<String, Vec<&str>> = TtlCache::new(Duration::from_secs(60));
        cache.insert("dnd5e.spells".into(), vec!["wizard"]).await;
        assert_eq!(cache.get(&"dnd5e.spells".into()).await, Some(vec!["wizard"]));
        assert_eq!(cache.get(&"world.lists".into()).await, None);
    }

    #[tokio::test]
    async fn stale_entries_are_not_served_and_get_purged() {
        let ttl = Duration::from_millis(10);
        let cache: TtlCache<&str, u32> = TtlCache::new(ttl);
        cache.insert_at("old-pack", 1, stale(ttl)).await;
        cache.insert("new-pack", 2).await;

        assert_eq!(cache.get(&"old-pack").await, None);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn invalidation_is_targeted() {
        let cache: TtlCache<&str, &str> = TtlCache::new(Duration::from_secs(60));
        cache.insert("bless", "cleric").await;
        cache.insert("shield", "wizard").await;
        cache.insert("sleep", "wizard").await;

        assert!(cache.invalidate(&"bless").await);
        assert!(!cache.invalidate(&"bless").await);
        assert_eq!(cache.invalidate_where(|_, class| *class == "wizard").await, 2);
        assert!(cache.is_empty().await);
    }
}
