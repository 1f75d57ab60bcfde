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

//! The transport seam of the cache.

use async_trait::async_trait;

/// Fetches the raw bytes of a resource.
///
/// Implemented by the host (HTTP client, file system, asset bundle...). The
/// cache adds deduplication, timeouts and failure memoisation on top.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches the resource identified by `key`.
    async fn fetch(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}
