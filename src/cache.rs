// src/cache.rs

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    config::{CACHE_TIME_SECS, STALE_TIME_SECS},
    error::AppError,
};

/// Freshness and retention rules shared by every cached read.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Entries younger than this are served without a request.
    pub stale_time: Duration,
    /// Entries not read for this long are dropped.
    pub cache_time: Duration,
    pub refetch_on_focus: bool,
    pub refetch_on_reconnect: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(STALE_TIME_SECS),
            cache_time: Duration::from_secs(CACHE_TIME_SECS),
            refetch_on_focus: false,
            refetch_on_reconnect: true,
        }
    }
}

struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
    last_read: Instant,
    stale: bool,
}

/// Keyed store of remote reads.
///
/// Keys are `resource` or `resource:id`; invalidating `resource` also hits its
/// `resource:*` children.
#[derive(Clone)]
pub struct QueryCache {
    policy: CachePolicy,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl QueryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the cached value when fresh, otherwise runs `fetch` and stores its result.
    ///
    /// The lock is not held while `fetch` runs; concurrent misses may both fetch.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let now = Instant::now();
        {
            let mut entries = self.entries.lock().await;
            self.collect_garbage(&mut entries, now);

            if let Some(entry) = entries.get_mut(key) {
                if !entry.stale && now.duration_since(entry.fetched_at) < self.policy.stale_time {
                    entry.last_read = now;
                    return Ok(serde_json::from_value(entry.value.clone())?);
                }
            }
        }

        tracing::debug!(key, "cache miss, fetching");
        let value = fetch().await?;
        let json = serde_json::to_value(&value)?;

        let now = Instant::now();
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: json,
                fetched_at: now,
                last_read: now,
                stale: false,
            },
        );
        Ok(value)
    }

    /// Marks the key and its children stale, then fetches again.
    pub async fn refetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.invalidate(key).await;
        self.get_or_fetch(key, fetch).await
    }

    pub async fn invalidate(&self, prefix: &str) {
        let mut entries = self.entries.lock().await;
        let child_prefix = format!("{prefix}:");
        for (key, entry) in entries.iter_mut() {
            if key == prefix || key.starts_with(&child_prefix) {
                entry.stale = true;
            }
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// The user returned to the app.
    pub async fn on_focus(&self) {
        if self.policy.refetch_on_focus {
            self.mark_all_stale().await;
        }
    }

    /// Connectivity came back.
    pub async fn on_reconnect(&self) {
        if self.policy.refetch_on_reconnect {
            tracing::debug!("reconnected, marking cached reads stale");
            self.mark_all_stale().await;
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    async fn mark_all_stale(&self) {
        for entry in self.entries.lock().await.values_mut() {
            entry.stale = true;
        }
    }

    fn collect_garbage(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let retention = self.policy.cache_time;
        entries.retain(|_, e| now.duration_since(e.last_read) < retention);
    }
}

/// Builds a `resource:id` cache key.
pub fn key(resource: &str, id: &str) -> String {
    format!("{resource}:{id}")
}
