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

//! Provides the data model shared by the telemetry sampler and its consumers.
//!
//! The sampler in `lumen-telemetry` produces [`TelemetrySnapshot`]s and
//! [`Alert`]s; the adaptive controller in `lumen-control` consumes them as
//! [`TelemetryEvent`]s. This module only defines the "common language".

pub mod alert;
pub mod event;
pub mod snapshot;
pub mod thresholds;

pub use self::alert::{Alert, AlertKind, AlertSeverity};
pub use self::event::TelemetryEvent;
pub use self::snapshot::{
    BatteryMetrics, FpsMetrics, HealthStatus, MemoryMetrics, MetricStatus, NetworkMetrics,
    RenderTiming, TelemetrySnapshot,
};
pub use self::thresholds::ThresholdConfig;
