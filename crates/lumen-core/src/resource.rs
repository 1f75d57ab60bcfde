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

//! The pressure-relief interface of the resource cache.

/// What the adaptive controller may do to the resource cache.
pub trait CacheControl: Send + Sync {
    /// Evicts the lower half of the cache. Returns the number of evicted entries.
    fn cleanup_cache(&self) -> usize;

    /// Forgets every memoised load failure. Returns the number of keys cleared.
    fn clear_failed_cache(&self) -> usize;

    /// Number of resources currently cached.
    fn cached_count(&self) -> usize;
}
