//! Decision cache.
//!
//! Keyed by the canonical `host + path` form so a query string can neither
//! poison nor whitelist a whole page. Entries expire lazily on lookup.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use weblante_common::{Decision, Verdict};

use crate::canonical;

/// Shared store of prior verdicts. Implementations may be bounded or
/// distributed; callers only rely on get/put/evict semantics.
#[async_trait]
pub trait DecisionCache: Send + Sync {
    /// Unexpired decision for `url`, if any. Expired entries are evicted.
    async fn get(&self, url: &str) -> Option<Decision>;

    /// Store `decision` for `url`. No-op when its verdict has no TTL.
    async fn put(&self, url: &str, decision: &Decision);

    /// Drop every expired entry. Returns how many were removed.
    async fn evict_expired(&self) -> usize;
}

/// Time-to-live per verdict. `None` disables caching for that verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub allow: Option<Duration>,
    pub block: Option<Duration>,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            allow: Some(Duration::hours(1)),
            block: Some(Duration::hours(6)),
        }
    }
}

impl CacheTtl {
    pub fn for_verdict(&self, verdict: Verdict) -> Option<Duration> {
        match verdict {
            Verdict::Allow => self.allow,
            Verdict::Block => self.block,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    decision: Decision,
    expires_at: DateTime<Utc>,
}

/// Process-wide in-memory cache. Unbounded: entries self-expire on lookup
/// and `evict_expired` sweeps the rest.
#[derive(Debug, Default)]
pub struct InMemoryDecisionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: CacheTtl,
}

impl InMemoryDecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: CacheTtl) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    pub fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<Decision> {
        let key = canonical::cache_key(url);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let entry = entries.get(&key)?;
        if now >= entry.expires_at {
            entries.remove(&key);
            debug!(key = %key, "Cache entry expired");
            return None;
        }
        Some(entry.decision.clone())
    }

    pub fn put_at(&self, url: &str, decision: &Decision, now: DateTime<Utc>) {
        let Some(ttl) = self.ttl.for_verdict(decision.verdict) else {
            return;
        };
        let key = canonical::cache_key(url);
        let entry = CacheEntry {
            decision: decision.clone(),
            expires_at: now + ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    /// Drop every entry expired at `now`. Returns how many were removed.
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, e| now < e.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DecisionCache for InMemoryDecisionCache {
    async fn get(&self, url: &str) -> Option<Decision> {
        self.get_at(url, Utc::now())
    }

    async fn put(&self, url: &str, decision: &Decision) {
        self.put_at(url, decision, Utc::now());
    }

    async fn evict_expired(&self) -> usize {
        let removed = self.evict_expired_at(Utc::now());
        if removed > 0 {
            debug!(removed, "Evicted expired cache entries");
        }
        removed
    }
}
