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

//! Threshold-crossing alerts.

use std::fmt;
use std::time::Instant;

/// The metric that crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Frame rate fell below a threshold.
    LowFps,
    /// Memory usage rose above a threshold.
    HighMemory,
    /// Network latency rose above a threshold.
    SlowNetwork,
    /// Battery level fell below a threshold while discharging.
    LowBattery,
    /// A single main-loop task ran for too long.
    LongTask,
    /// Visible content moved unexpectedly.
    LayoutShift,
}

impl AlertKind {
    /// Returns the snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowFps => "low_fps",
            AlertKind::HighMemory => "high_memory",
            AlertKind::SlowNetwork => "slow_network",
            AlertKind::LowBattery => "low_battery",
            AlertKind::LongTask => "long_task",
            AlertKind::LayoutShift => "layout_shift",
        }
    }
}

/// How far past its threshold the metric is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertSeverity {
    /// Past the warning threshold.
    Warning,
    /// Past the critical threshold.
    Critical,
}

/// A typed event raised when a metric crosses a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Which metric crossed.
    pub kind: AlertKind,
    /// How far it crossed.
    pub severity: AlertSeverity,
    /// The observed value (unit depends on the kind).
    pub value: f64,
    /// When the crossing was observed.
    pub timestamp: Instant,
}

impl Alert {
    /// Returns `true` for critical alerts.
    pub fn is_critical(&self) -> bool {
        self.severity == AlertSeverity::Critical
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} (value={:.2})",
            self.severity,
            self.kind.as_str(),
            self.value
        )
    }
}
