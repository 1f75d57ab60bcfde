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

//! The immutable per-tick view of runtime health.

use serde::Serialize;
use std::time::Instant;

/// Health classification of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    /// Within normal bounds.
    #[default]
    Good,
    /// Past the warning threshold.
    Warning,
    /// Past the critical threshold.
    Critical,
}

/// Frame rate metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FpsMetrics {
    /// Frames per second measured over the last tick window.
    pub current: f32,
    /// Mean over the history.
    pub average: f32,
    /// Minimum over the history.
    pub min: f32,
    /// Maximum over the history.
    pub max: f32,
    /// Oldest-first history of per-tick measurements.
    pub history: Vec<f32>,
}

/// Memory pressure metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryMetrics {
    /// Used memory as a fraction of the limit (0.0 to 1.0).
    pub used_fraction: f32,
    /// Used memory in bytes.
    pub used_bytes: u64,
    /// Memory limit in bytes.
    pub limit_bytes: u64,
    /// Oldest-first history of the used fraction.
    pub history: Vec<f32>,
}

/// Estimated per-frame work split, derived from the frame time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RenderTiming {
    /// Estimated layout time in milliseconds.
    pub layout_ms: f32,
    /// Estimated paint time in milliseconds.
    pub paint_ms: f32,
    /// Estimated animation time in milliseconds.
    pub animation_ms: f32,
}

/// Network health metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkMetrics {
    /// Round-trip latency in milliseconds.
    pub latency_ms: f32,
    /// Estimated bandwidth in Mbps.
    pub bandwidth_mbps: f32,
    /// Requests observed since start.
    pub requests_total: u64,
    /// Failed requests observed since start.
    pub requests_failed: u64,
}

/// Battery metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryMetrics {
    /// Charge level from 0.0 to 1.0.
    pub level: f32,
    /// Whether the device is charging.
    pub charging: bool,
    /// Level lost per hour while discharging.
    pub discharge_rate_per_hour: f32,
}

impl Default for BatteryMetrics {
    fn default() -> Self {
        Self {
            level: 1.0,
            charging: true,
            discharge_rate_per_hour: 0.0,
        }
    }
}

/// Derived per-metric status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Frame rate status.
    pub fps: MetricStatus,
    /// Memory status.
    pub memory: MetricStatus,
    /// Network status.
    pub network: MetricStatus,
    /// Battery status.
    pub battery: MetricStatus,
}

/// Rolling runtime metrics as of one sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// When the tick ran.
    #[serde(skip)]
    pub timestamp: Instant,
    /// Monotonic tick number, starting at 1.
    pub sequence: u64,
    /// Frame rate metrics.
    pub fps: FpsMetrics,
    /// Memory metrics.
    pub memory: MemoryMetrics,
    /// Estimated frame work split.
    pub timing: RenderTiming,
    /// Network metrics.
    pub network: NetworkMetrics,
    /// Battery metrics.
    pub battery: BatteryMetrics,
    /// Coarse system load (0.0 to 1.0) derived from frame rate and memory.
    pub system_load: f32,
    /// Derived status of each metric.
    pub status: HealthStatus,
}

impl TelemetrySnapshot {
    /// Creates an empty snapshot with healthy defaults.
    pub fn empty(timestamp: Instant) -> Self {
        Self {
            timestamp,
            sequence: 0,
            fps: FpsMetrics::default(),
            memory: MemoryMetrics::default(),
            timing: RenderTiming::default(),
            network: NetworkMetrics::default(),
            battery: BatteryMetrics::default(),
            system_load: 0.0,
            status: HealthStatus::default(),
        }
    }
}
