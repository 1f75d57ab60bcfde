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

//! Global alert rate limiting.

use std::time::{Duration, Instant};

/// Admits at most one alert per window, whatever its kind.
#[derive(Debug, Clone)]
pub struct AlertLimiter {
    window: Duration,
    last: Option<Instant>,
}

impl AlertLimiter {
    /// Creates a limiter with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `true` and arms the window if an alert may be emitted at `now`.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
