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

//! Cache configuration.

use serde::{Deserialize, Serialize};

/// How urgently a resource is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPriority {
    /// Needed for what is on screen now. Bypasses the concurrency gate.
    High,
    /// A regular request.
    #[default]
    Normal,
    /// Speculative work such as section preloading.
    Low,
}

/// Configuration for the resource cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of entries at which half of the cache is evicted.
    pub max_cache_size: usize,
    /// Upper bound on a single fetch.
    pub load_timeout_ms: u64,
    /// Fetches allowed to run at once for normal and low priority loads.
    pub max_concurrent_loads: usize,
    /// Delay between two consecutive preload requests of a section.
    pub preload_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 50,
            load_timeout_ms: 15_000,
            max_concurrent_loads: 6,
            preload_interval_ms: 100,
        }
    }
}

impl CacheConfig {
    /// Entry bound actually enforced. A zero size is bumped to one.
    pub fn capacity(&self) -> usize {
        self.max_cache_size.max(1)
    }
}
