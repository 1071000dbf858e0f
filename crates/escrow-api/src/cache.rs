//! Query cache.
//!
//! Reads are cached as JSON under a [`QueryKey`]. Mutations invalidate by key
//! prefix, so `["escrow", "7"]` drops everything cached for escrow 7.
//!
//! A read that was in flight while an invalidation ran still returns its value
//! but does not cache it.

use escrow_auth::ClientResult;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Ordered key segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self(segments.into_iter().map(|s| s.to_string()).collect())
    }

    /// Append a segment.
    pub fn push(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    /// Append an optional segment, using `all` when absent.
    pub fn push_or_all(self, segment: Option<&str>) -> Self {
        self.push(segment.unwrap_or("all"))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Thread-safe read cache.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Value>>>,
    /// Bumped under the entries lock by every invalidation.
    generation: Arc<AtomicU64>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    /// Errors are not cached.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> ClientResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let cached = self.entries.lock().get(&key).cloned();
        if let Some(value) = cached {
            match serde_json::from_value(value) {
                Ok(hit) => {
                    debug!(key = %key, "Query cache hit");
                    return Ok(hit);
                }
                Err(e) => debug!(key = %key, error = %e, "Discarding unreadable cache entry"),
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let fresh = fetch().await?;
        let value = serde_json::to_value(&fresh)?;

        let mut entries = self.entries.lock();
        if self.generation.load(Ordering::SeqCst) == generation {
            entries.insert(key, value);
        } else {
            debug!(key = %key, "Invalidated while fetching, not caching");
        }
        Ok(fresh)
    }

    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T) -> ClientResult<()> {
        let value = serde_json::to_value(value)?;
        self.entries.lock().insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many were dropped.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(prefix = %prefix, dropped, "Invalidated cached queries");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .finish()
    }
}
