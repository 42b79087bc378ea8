//! Decision cache.
//!
//! Responses are keyed by a blake3 hash of the request's attributes and the
//! policy store generation they were computed against, so two requests that
//! differ only in their id share an entry and a response computed before a
//! policy change is never served after it. Attributes resolved through an
//! attribute finder are not part of the key; the engine does not cache when
//! a finder is configured.

use crate::api::Response;
use crate::request::Request;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// An LRU cache of responses with a fixed time to live.
pub struct DecisionCache {
    l1: Mutex<LruCache<String, CachedResponse>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CachedResponse {
    response: Response,
    expires_at: Instant,
}

impl DecisionCache {
    /// Create a cache holding at most `max_entries` responses.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            l1: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up the cached response for `request` at store `generation`.
    ///
    /// The returned response carries the caller's request id.
    pub fn get(&self, request: &Request, generation: u64) -> Option<Response> {
        let key = Self::compute_key(request, generation)?;
        let mut cache = self.l1.lock();

        if let Some(cached) = cache.get(&key) {
            if cached.expires_at > Instant::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let mut response = cached.response.clone();
                response.request_id = request.id.clone();
                return Some(response);
            }
            cache.pop(&key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Cache `response` for `request`, computed at store `generation`.
    pub fn put(&self, request: &Request, generation: u64, response: &Response) {
        let Some(key) = Self::compute_key(request, generation) else {
            return;
        };
        let cached = CachedResponse {
            response: response.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.l1.lock().put(key, cached);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.l1.lock().clear();
        tracing::debug!("Decision cache cleared");
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            size: self.l1.lock().len(),
            hit_rate,
        }
    }

    fn compute_key(request: &Request, generation: u64) -> Option<String> {
        match serde_json::to_vec(&request.attributes) {
            Ok(bytes) => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&bytes);
                hasher.update(&generation.to_le_bytes());
                Some(hasher.finalize().to_hex().to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Request not cacheable");
                None
            }
        }
    }
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current cache size
    pub size: usize,
    /// Hit rate percentage
    pub hit_rate: f64,
}
