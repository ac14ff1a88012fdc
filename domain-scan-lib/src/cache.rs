//! Time-bounded memo of verdicts.
//!
//! Reads take a shared lock and never block each other; writes take the
//! exclusive lock. Expiry is checked on read, and a background sweep
//! removes stale entries on a fixed interval to bound memory.

use crate::types::Signature;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    available: bool,
    signatures: Vec<Signature>,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// A cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVerdict {
    pub available: bool,
    pub signatures: Vec<Signature>,
}

/// In-memory verdict cache keyed by domain.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry. Expired entries are misses but stay in place
    /// until the next sweep.
    pub fn get(&self, domain: &str) -> Option<CachedVerdict> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(domain)?;

        if entry.is_expired(Instant::now(), self.ttl) {
            return None;
        }

        Some(CachedVerdict {
            available: entry.available,
            signatures: entry.signatures.clone(),
        })
    }

    /// Store a verdict, starting a fresh TTL window.
    pub fn set(&self, domain: &str, available: bool, signatures: Vec<Signature>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            domain.to_string(),
            CacheEntry {
                available,
                signatures,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn clean(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `clean` every `every` on the tokio runtime.
    ///
    /// The task holds only a weak reference and ends once the cache is
    /// dropped. Dropping the returned handle stops it earlier.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        let cache: Weak<ResultCache> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.clean();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "cache sweep");
                }
            }
        });

        SweeperHandle { task }
    }
}

/// Owns the background sweep task; aborts it on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = ResultCache::new(TTL);
        cache.set("ab1.li", true, vec![]);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            cache.get("ab1.li"),
            Some(CachedVerdict {
                available: true,
                signatures: vec![]
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_after_ttl_without_delete() {
        let cache = ResultCache::new(TTL);
        cache.set("ab1.li", true, vec![]);

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        assert_eq!(cache.get("ab1.li"), None);
        // lazy expiry leaves the entry for the sweep
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clean(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_ttl() {
        let cache = ResultCache::new(TTL);
        cache.set("ab1.li", false, vec![Signature::DnsNs]);

        tokio::time::advance(Duration::from_secs(50)).await;
        cache.set("ab1.li", false, vec![Signature::Whois]);

        tokio::time::advance(Duration::from_secs(50)).await;
        let hit = cache.get("ab1.li").unwrap();
        assert_eq!(hit.signatures, vec![Signature::Whois]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_keeps_fresh_entries() {
        let cache = ResultCache::new(TTL);
        cache.set("old.li", true, vec![]);
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.set("new.li", true, vec![]);
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.clean(), 1);
        assert!(cache.get("new.li").is_some());
        assert!(cache.get("old.li").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_stale_entries() {
        let cache = Arc::new(ResultCache::new(TTL));
        cache.set("ab1.li", true, vec![]);
        let sweeper = cache.start_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(cache.is_empty());
        assert!(!sweeper.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_ends_with_cache() {
        let cache = Arc::new(ResultCache::new(TTL));
        let sweeper = cache.start_sweeper(Duration::from_secs(1));
        drop(cache);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(sweeper.is_finished());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResultCache::new(TTL));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let own = format!("w{}-{}.li", worker, i);
                        cache.set(&own, i % 2 == 0, vec![]);
                        cache.set("shared.li", false, vec![Signature::DnsA]);
                        assert!(cache.get(&own).is_some());
                        assert!(cache.get("shared.li").is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8 * 500 + 1);
    }
}
