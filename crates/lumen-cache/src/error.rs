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

//! Errors produced by resource loads.

use thiserror::Error;

/// Why a resource could not be delivered.
///
/// Clonable so that every caller waiting on the same in-flight load receives
/// the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The fetcher reported an error.
    #[error("Failed to fetch '{key}': {reason}")]
    Fetch {
        /// The resource key.
        key: String,
        /// What the fetcher reported.
        reason: String,
    },

    /// The fetch did not complete in time.
    #[error("Loading '{key}' timed out after {after_ms} ms")]
    Timeout {
        /// The resource key.
        key: String,
        /// The timeout that elapsed.
        after_ms: u64,
    },

    /// The key failed before and has not been cleared since.
    #[error("Resource '{key}' failed previously")]
    PreviouslyFailed {
        /// The resource key.
        key: String,
    },
}

impl LoadError {
    /// The key the error refers to.
    pub fn key(&self) -> &str {
        match self {
            LoadError::Fetch { key, .. }
            | LoadError::Timeout { key, .. }
            | LoadError::PreviouslyFailed { key } => key,
        }
    }
}

/// Result type for resource loads.
pub type LoadResult<T> = Result<T, LoadError>;
