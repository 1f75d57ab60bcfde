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

//! Staggered, ratio-limited section preloading.

use crate::cache::ResourceCache;
use crate::config::LoadPriority;
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of a section preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadSummary {
    /// The section name.
    pub section: String,
    /// Keys offered for the section.
    pub requested: usize,
    /// Keys actually scheduled, after the preload ratio.
    pub scheduled: usize,
    /// Scheduled keys that ended up cached.
    pub loaded: usize,
    /// Scheduled keys that failed.
    pub failed: usize,
}

/// Number of keys to preload out of `len` for the given ratio.
///
/// Rounds to nearest and never drops below one key for a non-empty section.
pub fn preload_count(len: usize, ratio: f32) -> usize {
    if len == 0 {
        return 0;
    }
    let wanted = (len as f32 * ratio.clamp(0.0, 1.0)).round() as usize;
    wanted.clamp(1, len)
}

impl ResourceCache {
    /// Preloads the front of a section's keys with low priority.
    ///
    /// The share of keys comes from the live preload ratio; requests are
    /// issued at fixed intervals. The returned handle resolves once every
    /// scheduled load settled.
    pub fn preload_section(
        &self,
        section: &str,
        keys: Vec<String>,
    ) -> JoinHandle<PreloadSummary> {
        let ratio = self.inner.live.read(|config| config.resources.preload_ratio);
        let requested = keys.len();
        let scheduled = preload_count(requested, ratio);
        let interval = Duration::from_millis(self.inner.config.preload_interval_ms);
        let cache = self.clone();
        let section = section.to_string();

        log::debug!(
            "ResourceCache: preloading {}/{} keys of section '{}' (ratio {:.2})",
            scheduled,
            requested,
            section,
            ratio
        );

        tokio::spawn(async move {
            let mut loads = Vec::with_capacity(scheduled);
            for (i, key) in keys.into_iter().take(scheduled).enumerate() {
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                let cache = cache.clone();
                loads.push(tokio::spawn(async move {
                    cache.load(&key, LoadPriority::Low).await
                }));
            }

            let mut loaded = 0;
            let mut failed = 0;
            for outcome in futures::future::join_all(loads).await {
                match outcome {
                    Ok(Ok(_)) => loaded += 1,
                    _ => failed += 1,
                }
            }

            log::debug!(
                "ResourceCache: section '{}' preloaded ({} ok, {} failed)",
                section,
                loaded,
                failed
            );
            PreloadSummary {
                section,
                requested,
                scheduled,
                loaded,
                failed,
            }
        })
    }
}
