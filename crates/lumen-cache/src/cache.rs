// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The resource cache.

use crate::config::{CacheConfig, LoadPriority};
use crate::error::{LoadError, LoadResult};
use crate::fetcher::ResourceFetcher;
use futures::future::{BoxFuture, FutureExt, Shared};
use lumen_core::config::LiveConfig;
use lumen_core::resource::CacheControl;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// A loaded resource. Cloning shares the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The key the resource was loaded under.
    pub key: String,
    /// The raw bytes.
    pub payload: Arc<Vec<u8>>,
}

/// A cached resource with its usage bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) resource: Resource,
    pub(crate) cached_at: Instant,
    pub(crate) access_count: u64,
    pub(crate) last_accessed: Instant,
}

impl CacheEntry {
    fn new(resource: Resource, now: Instant) -> Self {
        Self {
            resource,
            cached_at: now,
            access_count: 0,
            last_accessed: now,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    /// Lower scores are evicted first.
    fn eviction_score(&self, now: Instant) -> f64 {
        self.access_count as f64 + now.saturating_duration_since(self.last_accessed).as_secs_f64()
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that started a fetch.
    pub misses: u64,
    /// Fetches that failed or timed out.
    pub failures: u64,
    /// Entries evicted so far.
    pub evictions: u64,
    /// Entries currently cached.
    pub cached: usize,
    /// Loads currently in flight.
    pub in_flight: usize,
    /// Keys currently memoised as failed.
    pub failed_keys: usize,
}

type SharedLoad = Shared<BoxFuture<'static, LoadResult<Resource>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    failed: HashMap<String, LoadError>,
    in_flight: HashMap<String, SharedLoad>,
    stats: CacheStats,
}

pub(crate) struct CacheInner {
    pub(crate) config: CacheConfig,
    pub(crate) live: LiveConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    permits: Arc<Semaphore>,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::error!("ResourceCache: state poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Records the outcome of a finished fetch.
    fn complete(&self, key: &str, outcome: &LoadResult<Resource>) {
        let now = Instant::now();
        let mut state = self.state();
        state.in_flight.remove(key);
        match outcome {
            Ok(resource) => {
                if state.entries.len() >= self.config.capacity() {
                    let evicted = evict_lower_half(&mut state.entries, now);
                    state.stats.evictions += evicted as u64;
                    log::debug!("ResourceCache: at capacity, evicted {} entries", evicted);
                }
                state
                    .entries
                    .insert(key.to_string(), CacheEntry::new(resource.clone(), now));
            }
            Err(e) => {
                log::warn!("ResourceCache: {}", e);
                state.stats.failures += 1;
                state.failed.insert(key.to_string(), e.clone());
            }
        }
    }
}

/// Removes the lower half (rounded up) of the entries, ranked ascending by
/// access count plus seconds since the last access. Returns how many went.
pub(crate) fn evict_lower_half(entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
    let to_remove = entries.len().div_ceil(2);
    if to_remove == 0 {
        return 0;
    }

    let mut ranked: Vec<(f64, String)> = entries
        .iter()
        .map(|(key, entry)| (entry.eviction_score(now), key.clone()))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    for (_, key) in ranked.into_iter().take(to_remove) {
        entries.remove(&key);
    }
    to_remove
}

/// A bounded, priority-aware resource loader and cache.
///
/// Cheap to clone; every clone shares the same cache. Loads must be issued
/// from within a tokio runtime.
#[derive(Clone)]
pub struct ResourceCache {
    pub(crate) inner: Arc<CacheInner>,
}

impl ResourceCache {
    /// Creates a new cache. `live` supplies the preload ratio.
    pub fn new(config: CacheConfig, fetcher: Arc<dyn ResourceFetcher>, live: LiveConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_loads.max(1)));
        Self {
            inner: Arc::new(CacheInner {
                config,
                live,
                fetcher,
                permits,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Loads a resource, serving it from the cache when possible.
    ///
    /// Concurrent loads of the same key share one fetch. A key whose fetch
    /// failed short-circuits with [`LoadError::PreviouslyFailed`] until
    /// [`clear_failed_cache`](Self::clear_failed_cache) is called.
    pub async fn load(&self, key: &str, priority: LoadPriority) -> LoadResult<Resource> {
        let pending = {
            let mut state = self.inner.state();

            if let Some(entry) = state.entries.get_mut(key) {
                entry.touch(Instant::now());
                let resource = entry.resource.clone();
                state.stats.hits += 1;
                return Ok(resource);
            }
            if state.failed.contains_key(key) {
                return Err(LoadError::PreviouslyFailed {
                    key: key.to_string(),
                });
            }

            match state.in_flight.get(key) {
                Some(pending) => {
                    log::trace!("ResourceCache: joining in-flight load of '{}'", key);
                    pending.clone()
                }
                None => {
                    state.stats.misses += 1;
                    // The state lock is held until the shared future is
                    // registered, so the task cannot complete before it is.
                    let pending = self.spawn_load(key.to_string(), priority);
                    state.in_flight.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    fn spawn_load(&self, key: String, priority: LoadPriority) -> SharedLoad {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move { run_load(inner, task_key, priority).await });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(LoadError::Fetch {
                    key,
                    reason: format!("load task aborted: {e}"),
                }),
            }
        }
        .boxed()
        .shared()
    }

    /// Returns a cached resource and counts the access.
    pub fn get(&self, key: &str) -> Option<Resource> {
        let mut state = self.inner.state();
        let entry = state.entries.get_mut(key)?;
        entry.touch(Instant::now());
        let resource = entry.resource.clone();
        state.stats.hits += 1;
        Some(resource)
    }

    /// Returns `true` if the key is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.state().entries.contains_key(key)
    }

    /// Returns `true` if the key is memoised as failed.
    pub fn has_failed(&self, key: &str) -> bool {
        self.inner.state().failed.contains_key(key)
    }

    /// Age of a cached entry.
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.inner
            .state()
            .entries
            .get(key)
            .map(|entry| entry.cached_at.elapsed())
    }

    /// Evicts the lower half of the cache. Returns the number of evicted entries.
    pub fn cleanup_cache(&self) -> usize {
        let mut state = self.inner.state();
        let evicted = evict_lower_half(&mut state.entries, Instant::now());
        state.stats.evictions += evicted as u64;
        log::info!(
            "ResourceCache: cleanup evicted {} entries, {} remain",
            evicted,
            state.entries.len()
        );
        evicted
    }

    /// Forgets every memoised failure. Returns the number of keys cleared.
    pub fn clear_failed_cache(&self) -> usize {
        let mut state = self.inner.state();
        let cleared = state.failed.len();
        state.failed.clear();
        if cleared > 0 {
            log::debug!("ResourceCache: cleared {} failed keys", cleared);
        }
        cleared
    }

    /// Number of resources currently cached.
    pub fn cached_count(&self) -> usize {
        self.inner.state().entries.len()
    }

    /// Returns the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state();
        CacheStats {
            cached: state.entries.len(),
            in_flight: state.in_flight.len(),
            failed_keys: state.failed.len(),
            ..state.stats
        }
    }
}

async fn run_load(
    inner: Arc<CacheInner>,
    key: String,
    priority: LoadPriority,
) -> LoadResult<Resource> {
    let _permit = match priority {
        LoadPriority::High => None,
        LoadPriority::Normal | LoadPriority::Low => {
            Arc::clone(&inner.permits).acquire_owned().await.ok()
        }
    };

    let after_ms = inner.config.load_timeout_ms;
    let timeout = Duration::from_millis(after_ms);
    let outcome = match tokio::time::timeout(timeout, inner.fetcher.fetch(&key)).await {
        Ok(Ok(bytes)) => {
            log::trace!("ResourceCache: fetched '{}' ({} bytes)", key, bytes.len());
            Ok(Resource {
                key: key.clone(),
                payload: Arc::new(bytes),
            })
        }
        Ok(Err(e)) => Err(LoadError::Fetch {
            key: key.clone(),
            reason: format!("{e:#}"),
        }),
        Err(_) => Err(LoadError::Timeout {
            key: key.clone(),
            after_ms,
        }),
    };

    inner.complete(&key, &outcome);
    outcome
}

impl CacheControl for ResourceCache {
    fn cleanup_cache(&self) -> usize {
        ResourceCache::cleanup_cache(self)
    }

    fn clear_failed_cache(&self) -> usize {
        ResourceCache::clear_failed_cache(self)
    }

    fn cached_count(&self) -> usize {
        ResourceCache::cached_count(self)
    }
}
