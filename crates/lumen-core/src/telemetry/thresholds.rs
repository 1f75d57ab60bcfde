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

//! Warning/critical thresholds for every sampled metric.

use crate::telemetry::alert::AlertSeverity;
use crate::telemetry::snapshot::MetricStatus;
use serde::{Deserialize, Serialize};

/// Thresholds used to derive [`MetricStatus`] values and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// FPS below this is a warning.
    pub fps_warning: f32,
    /// FPS below this is critical.
    pub fps_critical: f32,
    /// Memory fraction at or above this is a warning.
    pub memory_warning: f32,
    /// Memory fraction at or above this is critical.
    pub memory_critical: f32,
    /// Latency above this (ms) is a warning.
    pub latency_warning_ms: f32,
    /// Latency above this (ms) is critical.
    pub latency_critical_ms: f32,
    /// Discharging battery level below this is a warning.
    pub battery_warning: f32,
    /// Discharging battery level below this is critical.
    pub battery_critical: f32,
    /// Long task duration (ms) at or above this is a warning.
    pub long_task_warning_ms: f32,
    /// Long task duration (ms) at or above this is critical.
    pub long_task_critical_ms: f32,
    /// Layout shift score at or above this is a warning.
    pub layout_shift_warning: f32,
    /// Layout shift score at or above this is critical.
    pub layout_shift_critical: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            fps_warning: 30.0,
            fps_critical: 15.0,
            memory_warning: 0.70,
            memory_critical: 0.85,
            latency_warning_ms: 1000.0,
            latency_critical_ms: 3000.0,
            battery_warning: 0.20,
            battery_critical: 0.10,
            long_task_warning_ms: 50.0,
            long_task_critical_ms: 200.0,
            layout_shift_warning: 0.10,
            layout_shift_critical: 0.25,
        }
    }
}

impl ThresholdConfig {
    /// Classifies a frame rate.
    pub fn fps_status(&self, fps: f32) -> MetricStatus {
        if fps < self.fps_critical {
            MetricStatus::Critical
        } else if fps < self.fps_warning {
            MetricStatus::Warning
        } else {
            MetricStatus::Good
        }
    }

    /// Classifies a memory usage fraction.
    pub fn memory_status(&self, used_fraction: f32) -> MetricStatus {
        if used_fraction >= self.memory_critical {
            MetricStatus::Critical
        } else if used_fraction >= self.memory_warning {
            MetricStatus::Warning
        } else {
            MetricStatus::Good
        }
    }

    /// Classifies a network latency.
    pub fn network_status(&self, latency_ms: f32) -> MetricStatus {
        if latency_ms > self.latency_critical_ms {
            MetricStatus::Critical
        } else if latency_ms > self.latency_warning_ms {
            MetricStatus::Warning
        } else {
            MetricStatus::Good
        }
    }

    /// Classifies a battery level. A charging battery is always good.
    pub fn battery_status(&self, level: f32, charging: bool) -> MetricStatus {
        if charging {
            MetricStatus::Good
        } else if level < self.battery_critical {
            MetricStatus::Critical
        } else if level < self.battery_warning {
            MetricStatus::Warning
        } else {
            MetricStatus::Good
        }
    }

    /// Classifies a long task duration. `None` means below any threshold.
    pub fn long_task_severity(&self, duration_ms: f32) -> Option<AlertSeverity> {
        if duration_ms >= self.long_task_critical_ms {
            Some(AlertSeverity::Critical)
        } else if duration_ms >= self.long_task_warning_ms {
            Some(AlertSeverity::Warning)
        } else {
            None
        }
    }

    /// Classifies a layout shift score. `None` means below any threshold.
    pub fn layout_shift_severity(&self, score: f32) -> Option<AlertSeverity> {
        if score >= self.layout_shift_critical {
            Some(AlertSeverity::Critical)
        } else if score >= self.layout_shift_warning {
            Some(AlertSeverity::Warning)
        } else {
            None
        }
    }
}

impl MetricStatus {
    /// Maps a degraded status to the matching alert severity.
    pub fn alert_severity(&self) -> Option<AlertSeverity> {
        match self {
            MetricStatus::Good => None,
            MetricStatus::Warning => Some(AlertSeverity::Warning),
            MetricStatus::Critical => Some(AlertSeverity::Critical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_status_bands() {
        let t = ThresholdConfig::default();
        assert_eq!(t.fps_status(60.0), MetricStatus::Good);
        assert_eq!(t.fps_status(29.0), MetricStatus::Warning);
        assert_eq!(t.fps_status(10.0), MetricStatus::Critical);
    }

    #[test]
    fn test_memory_status_bands() {
        let t = ThresholdConfig::default();
        assert_eq!(t.memory_status(0.5), MetricStatus::Good);
        assert_eq!(t.memory_status(0.7), MetricStatus::Warning);
        assert_eq!(t.memory_status(0.85), MetricStatus::Critical);
    }

    #[test]
    fn test_charging_battery_is_good() {
        let t = ThresholdConfig::default();
        assert_eq!(t.battery_status(0.05, true), MetricStatus::Good);
        assert_eq!(t.battery_status(0.05, false), MetricStatus::Critical);
        assert_eq!(t.battery_status(0.15, false), MetricStatus::Warning);
    }

    #[test]
    fn test_long_task_severity() {
        let t = ThresholdConfig::default();
        assert_eq!(t.long_task_severity(30.0), None);
        assert_eq!(t.long_task_severity(80.0), Some(AlertSeverity::Warning));
        assert_eq!(t.long_task_severity(250.0), Some(AlertSeverity::Critical));
    }
}
