//! Process-wide result cache keyed by (host, mode).
//!
//! Build one [`ResultCache`] per process and hand the orchestrator an `Arc`
//! to it. Expired entries are ignored on read and overwritten on the next
//! run; [`ResultCache::purge_expired`] is housekeeping only.
//!
//! The cache also hands out per-key run locks so that two discovery runs for
//! the same site and mode never hit the external service at the same time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use url::Url;

use crate::error::{DiscoveryError, Result};
use crate::traits::clock::{Clock, SystemClock};
use crate::types::{candidate::PartnerCandidate, config::DiscoveryMode};

/// Cache identity. Depends only on the seed host and mode, never on results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub host: String,
    pub mode: DiscoveryMode,
}

impl CacheKey {
    pub fn new(host: impl Into<String>, mode: DiscoveryMode) -> Self {
        Self {
            host: host.into().trim().to_ascii_lowercase(),
            mode,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.host, self.mode)
    }
}

/// A cached discovery result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: CacheKey,
    pub expires_at: DateTime<Utc>,
    pub results: Vec<PartnerCandidate>,
    pub directory_urls: Vec<String>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Hostname of a seed URL, lowercased.
///
/// Fails with [`DiscoveryError::ParseFailure`] for input that is not an
/// absolute URL with a host.
pub fn normalize_host(seed: &str) -> Result<String> {
    Url::parse(seed.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .ok_or_else(|| DiscoveryError::ParseFailure {
            input: seed.to_string(),
        })
}

type RunLocks = Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>;

/// Exclusive use of a cache key for one run.
///
/// Dropping it releases the key, and forgets the key's lock once no other
/// run holds or waits on it.
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: CacheKey,
    locks: RunLocks,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

impl fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    run_locks: RunLocks,
    clock: Arc<dyn Clock>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    /// Create an empty cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache on an injected clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            run_locks: Arc::default(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fresh entry for a key, if any. Never mutates the entry.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .cloned()
    }

    /// Store (or overwrite) the entry for a key.
    pub fn put(
        &self,
        key: CacheKey,
        results: Vec<PartnerCandidate>,
        directory_urls: Vec<String>,
        ttl: Duration,
    ) -> CacheEntry {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let entry = CacheEntry {
            key: key.clone(),
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            results,
            directory_urls,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry.clone());
        entry
    }

    /// Wait for exclusive use of a key.
    ///
    /// Runs for different keys never contend.
    pub async fn lock_key(&self, key: &CacheKey) -> KeyGuard {
        let lock = {
            let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        KeyGuard {
            guard: Some(lock.lock_owned().await),
            key: key.clone(),
            locks: Arc::clone(&self.run_locks),
        }
    }

    /// Keys with a run in flight or waiting.
    pub fn active_runs(&self) -> usize {
        self.run_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache").field("entries", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClock;

    fn partner(name: &str) -> PartnerCandidate {
        PartnerCandidate::new(name).with_website(format!("https://{}.com", name))
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://WWW.Acme.com/x").unwrap(), "www.acme.com");
        assert!(matches!(
            normalize_host("not a url"),
            Err(DiscoveryError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_key_is_case_insensitive_on_host() {
        assert_eq!(
            CacheKey::new("Acme.com", DiscoveryMode::Standard),
            CacheKey::new("acme.com", DiscoveryMode::Standard)
        );
        assert_ne!(
            CacheKey::new("acme.com", DiscoveryMode::Standard),
            CacheKey::new("acme.com", DiscoveryMode::Aggressive)
        );
        assert_eq!(
            CacheKey::new("acme.com", DiscoveryMode::Aggressive).to_string(),
            "acme.com::aggressive"
        );
    }

    #[test]
    fn test_get_respects_expiry() {
        let clock = Arc::new(FakeClock::new());
        let cache = ResultCache::with_clock(clock.clone());
        let key = CacheKey::new("acme.com", DiscoveryMode::Standard);

        cache.put(key.clone(), vec![partner("a")], vec![], Duration::from_secs(60));
        assert_eq!(cache.get(&key).unwrap().results.len(), 1);

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(&key).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).is_none());
        // Expired entries are ignored, not evicted
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_does_not_mutate() {
        let cache = ResultCache::with_clock(Arc::new(FakeClock::new()));
        let key = CacheKey::new("acme.com", DiscoveryMode::Standard);
        let stored = cache.put(key.clone(), vec![partner("a")], vec!["u".into()], Duration::from_secs(60));
        assert_eq!(cache.get(&key).unwrap(), stored);
        assert_eq!(cache.get(&key).unwrap(), stored);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResultCache::with_clock(Arc::new(FakeClock::new()));
        let key = CacheKey::new("acme.com", DiscoveryMode::Standard);
        cache.put(key.clone(), vec![partner("a")], vec![], Duration::from_secs(60));
        cache.put(key.clone(), vec![], vec![], Duration::from_secs(60));
        assert!(cache.get(&key).unwrap().results.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let clock = Arc::new(FakeClock::new());
        let cache = ResultCache::with_clock(clock.clone());
        cache.put(CacheKey::new("a.com", DiscoveryMode::Standard), vec![], vec![], Duration::from_secs(10));
        cache.put(CacheKey::new("b.com", DiscoveryMode::Standard), vec![], vec![], Duration::from_secs(100));

        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let cache = ResultCache::new();
        let a = CacheKey::new("a.com", DiscoveryMode::Standard);
        let b = CacheKey::new("b.com", DiscoveryMode::Standard);

        let _guard_a = cache.lock_key(&a).await;
        let guard_b = tokio::time::timeout(Duration::from_millis(100), cache.lock_key(&b)).await;
        assert!(guard_b.is_ok());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let cache = ResultCache::new();
        let a = CacheKey::new("a.com", DiscoveryMode::Standard);

        let guard = cache.lock_key(&a).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), cache.lock_key(&a)).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = tokio::time::timeout(Duration::from_millis(50), cache.lock_key(&a)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let cache = Arc::new(ResultCache::new());
        let a = CacheKey::new("a.com", DiscoveryMode::Standard);

        let first = cache.lock_key(&a).await;
        assert_eq!(cache.active_runs(), 1);

        // A waiter keeps the lock alive past the first release
        let waiter = {
            let cache = Arc::clone(&cache);
            let a = a.clone();
            tokio::spawn(async move {
                let _second = cache.lock_key(&a).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        waiter.await.unwrap();

        assert_eq!(cache.active_runs(), 0);

        for i in 0..10 {
            let key = CacheKey::new(format!("site-{}.com", i), DiscoveryMode::Aggressive);
            drop(cache.lock_key(&key).await);
        }
        assert_eq!(cache.active_runs(), 0);
    }
}
