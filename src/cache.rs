// src/cache.rs
//
// Opportunistic response cache: whole JSON bodies memoized under a
// tenant+query-scoped key with an absolute TTL (no sliding refresh), and
// invalidated in bulk by category. The pipeline underneath is idempotent, so
// a miss race that recomputes the same body twice is harmless.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use metrics::counter;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
const ENV_TTL_SECS: &str = "BLOBWATCH_CACHE_TTL_SECS";

/// Invalidation scope for a cached response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Dashboard,
    AuditLogs,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(Category::Dashboard),
            "audit-logs" => Some(Category::AuditLogs),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    body: Value,
    category: Category,
    inserted: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    inner: RwLock<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// TTL from `BLOBWATCH_CACHE_TTL_SECS`, defaulting to 300s.
    pub fn from_env() -> Self {
        let ttl = std::env::var(ENV_TTL_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);
        Self::new(ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable key over tenant + route + canonicalized query.
    pub fn key(tenant: &str, path: &str, query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant.as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(query.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut map = self.inner.write().expect("response cache lock poisoned");
        match map.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => {
                counter!("response_cache_hits_total").increment(1);
                Some(entry.body.clone())
            }
            Some(_) => {
                // Expired; evict eagerly so the map doesn't accrete.
                map.remove(key);
                counter!("response_cache_misses_total").increment(1);
                None
            }
            None => {
                counter!("response_cache_misses_total").increment(1);
                None
            }
        }
    }

    pub fn put(&self, key: String, category: Category, body: Value) {
        let mut map = self.inner.write().expect("response cache lock poisoned");
        map.insert(
            key,
            Entry {
                body,
                category,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every entry in one category.
    pub fn invalidate(&self, category: Category) {
        let mut map = self.inner.write().expect("response cache lock poisoned");
        map.retain(|_, entry| entry.category != category);
    }

    pub fn clear(&self) {
        let mut map = self.inner.write().expect("response cache lock poisoned");
        map.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("response cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_and_scoped() {
        let a = ResponseCache::key("acme", "/api/audit-logs", "page=1");
        let b = ResponseCache::key("acme", "/api/audit-logs", "page=1");
        let c = ResponseCache::key("acme", "/api/audit-logs", "page=2");
        let d = ResponseCache::key("other", "/api/audit-logs", "page=1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = ResponseCache::key("t", "/p", "q");
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), Category::Dashboard, json!({"n": 1}));
        assert_eq!(cache.get(&key), Some(json!({"n": 1})));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = ResponseCache::new(Duration::ZERO);
        let key = ResponseCache::key("t", "/p", "q");
        cache.put(key.clone(), Category::Dashboard, json!(1));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn invalidate_is_scoped_to_category() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let dash = ResponseCache::key("t", "/dash", "");
        let logs = ResponseCache::key("t", "/logs", "");
        cache.put(dash.clone(), Category::Dashboard, json!("d"));
        cache.put(logs.clone(), Category::AuditLogs, json!("l"));

        cache.invalidate(Category::Dashboard);
        assert!(cache.get(&dash).is_none());
        assert_eq!(cache.get(&logs), Some(json!("l")));

        cache.clear();
        assert!(cache.get(&logs).is_none());
    }

    #[test]
    fn category_parse_accepts_known_names() {
        assert_eq!(Category::parse("dashboard"), Some(Category::Dashboard));
        assert_eq!(Category::parse("audit-logs"), Some(Category::AuditLogs));
        assert_eq!(Category::parse("users"), None);
    }
}
