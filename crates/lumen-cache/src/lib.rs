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

//! A bounded, priority-aware resource loader and cache.
//!
//! The adaptive controller reaches the cache through the
//! [`CacheControl`](lumen_core::CacheControl) trait to relieve memory
//! pressure; effect code loads and preloads through [`ResourceCache`].

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod preload;

pub use cache::{CacheStats, Resource, ResourceCache};
pub use config::{CacheConfig, LoadPriority};
pub use error::{LoadError, LoadResult};
pub use fetcher::ResourceFetcher;
pub use preload::{preload_count, PreloadSummary};
