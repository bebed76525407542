//! Deposit Status Cache Module
//!
//! Best-effort TTL cache in front of ledger queries. The cache is advisory
//! only: when disabled (or on a miss) callers fall through to the remote
//! query. Disablement is a normal, tested code path, not an error.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::deposit::DepositStatus;

struct CacheEntry {
    status: DepositStatus,
    expires_at: Instant,
}

/// Keyed TTL cache of deposit status observations. Thread-safe via RwLock.
pub struct StatusCache {
    enabled: bool,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl StatusCache {
    /// Create a cache. A disabled cache never stores or returns entries.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached status. Expired entries are treated as misses and
    /// removed.
    pub async fn get(&self, key: &str) -> Option<DepositStatus> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.status.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is expired; drop it under the write lock
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at <= now {
                entries.remove(key);
            }
        }
        None
    }

    /// Store a status observation with the given TTL. No-op when disabled.
    pub async fn put(&self, key: &str, status: DepositStatus, ttl: Duration) {
        if !self.enabled {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                status,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
