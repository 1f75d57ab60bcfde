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

//! Event types flowing from the telemetry sampler to its subscribers.

use crate::telemetry::alert::Alert;
use crate::telemetry::snapshot::TelemetrySnapshot;
use std::sync::Arc;

/// A typed event published by the telemetry sampler.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// A regular per-tick snapshot. Shared, never mutated after publication.
    Sample(Arc<TelemetrySnapshot>),
    /// A threshold crossing, either from a tick or from a high-priority
    /// producer (long task, layout shift) between ticks.
    Alert(Alert),
}
