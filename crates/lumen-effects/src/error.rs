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

//! Errors raised by native effect drivers.

use thiserror::Error;

/// A failure of a native effect.
///
/// Never surfaces to the adaptive controller: registries log it and schedule
/// a recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// The factory could not create the effect.
    #[error("Failed to create effect '{id}': {reason}")]
    Create {
        /// The effect id.
        id: String,
        /// What went wrong.
        reason: String,
    },

    /// A running effect misbehaved.
    #[error("Effect '{id}' failed: {reason}")]
    Driver {
        /// The effect id.
        id: String,
        /// What went wrong.
        reason: String,
    },
}

/// Result type for driver operations.
pub type EffectResult<T> = Result<T, EffectError>;
