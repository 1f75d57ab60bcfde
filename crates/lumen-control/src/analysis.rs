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

//! Health analysis for the adaptive controller.
//!
//! The `HealthAnalyzer` folds every telemetry snapshot into per-metric
//! streak counters and short rolling histories, then reduces them to at most
//! one [`Finding`] per evaluation: the reason to adapt and how hard.

use lumen_core::control::{AdaptationReason, AdaptationSeverity};
use lumen_core::telemetry::{HealthStatus, MetricStatus, TelemetrySnapshot};
use lumen_telemetry::{window_change, RingBuffer};
use serde::{Deserialize, Serialize};

/// Score penalties (warning, critical) for the frame rate.
const FPS_PENALTY: (f32, f32) = (15.0, 30.0);
/// Score penalties (warning, critical) for memory.
const MEMORY_PENALTY: (f32, f32) = (10.0, 25.0);
/// Score penalties (warning, critical) for the network.
const NETWORK_PENALTY: (f32, f32) = (5.0, 15.0);
/// Score penalties (warning, critical) for the battery.
const BATTERY_PENALTY: (f32, f32) = (5.0, 15.0);

/// Short-term trend detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of samples per compared window.
    pub window: usize,
    /// Relative FPS decline that counts as a trend (0.1 = 10 %).
    pub fps_decline: f32,
    /// Relative memory rise that counts as a trend.
    pub memory_rise: f32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 5,
            fps_decline: 0.10,
            memory_rise: 0.10,
        }
    }
}

/// Settings of the health analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Consecutive warning samples needed before a warning triggers.
    pub warning_streak: u32,
    /// Health score below which the whole system counts as overloaded.
    pub overload_score: f32,
    /// Proactive trend detection.
    pub trend: TrendConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            warning_streak: 3,
            overload_score: 50.0,
            trend: TrendConfig::default(),
        }
    }
}

/// A monitored metric, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Frame rate.
    Fps,
    /// Memory usage.
    Memory,
    /// Battery level.
    Battery,
    /// Network latency.
    Network,
}

impl Metric {
    /// Every metric, in evaluation priority order.
    pub const ALL: [Metric; 4] = [Metric::Fps, Metric::Memory, Metric::Battery, Metric::Network];

    /// The adaptation reason this metric maps to.
    pub fn reason(&self) -> AdaptationReason {
        match self {
            Metric::Fps => AdaptationReason::FpsDrop,
            Metric::Memory => AdaptationReason::MemoryPressure,
            Metric::Battery => AdaptationReason::BatteryLow,
            Metric::Network => AdaptationReason::NetworkSlow,
        }
    }

    fn status(&self, status: &HealthStatus) -> MetricStatus {
        match self {
            Metric::Fps => status.fps,
            Metric::Memory => status.memory,
            Metric::Battery => status.battery,
            Metric::Network => status.network,
        }
    }

    fn index(&self) -> usize {
        match self {
            Metric::Fps => 0,
            Metric::Memory => 1,
            Metric::Battery => 2,
            Metric::Network => 3,
        }
    }
}

/// Consecutive degraded samples of one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streak {
    /// Consecutive warning samples.
    pub warning: u32,
    /// Consecutive critical samples.
    pub critical: u32,
}

impl Streak {
    /// Folds one sample into the streak.
    ///
    /// A good sample resets both counters, a warning sample resets the
    /// critical counter, and a critical sample leaves the warning counter
    /// untouched.
    pub fn observe(&mut self, status: MetricStatus) {
        match status {
            MetricStatus::Good => *self = Streak::default(),
            MetricStatus::Warning => {
                self.warning += 1;
                self.critical = 0;
            }
            MetricStatus::Critical => self.critical += 1,
        }
    }
}

/// A decision to adapt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    /// Why.
    pub reason: AdaptationReason,
    /// How hard.
    pub severity: AdaptationSeverity,
}

impl Finding {
    fn new(reason: AdaptationReason, severity: AdaptationSeverity) -> Self {
        Self { reason, severity }
    }
}

/// Folds telemetry into streaks, a health score and trends.
#[derive(Debug, Clone)]
pub struct HealthAnalyzer {
    config: AnalysisConfig,
    streaks: [Streak; 4],
    status: HealthStatus,
    samples: u64,
    fps_history: RingBuffer,
    memory_history: RingBuffer,
}

impl HealthAnalyzer {
    /// Creates an analyzer that has seen no sample yet.
    pub fn new(config: AnalysisConfig) -> Self {
        let capacity = config.trend.window.max(1) * 2;
        Self {
            config,
            streaks: [Streak::default(); 4],
            status: HealthStatus::default(),
            samples: 0,
            fps_history: RingBuffer::new(capacity),
            memory_history: RingBuffer::new(capacity),
        }
    }

    /// Returns the analysis settings.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Number of samples observed since creation or the last reset.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Per-metric status of the latest sample.
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Current streak of `metric`.
    pub fn streak(&self, metric: Metric) -> Streak {
        self.streaks[metric.index()]
    }

    /// Folds one snapshot into the analysis.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) {
        self.status = snapshot.status;
        for metric in Metric::ALL {
            self.streaks[metric.index()].observe(metric.status(&snapshot.status));
        }
        self.fps_history.push(snapshot.fps.current);
        self.memory_history.push(snapshot.memory.used_fraction);
        self.samples += 1;
    }

    /// 100 minus the penalty of every degraded metric in the latest sample.
    pub fn health_score(&self) -> f32 {
        let penalty = |status: MetricStatus, (warning, critical): (f32, f32)| match status {
            MetricStatus::Good => 0.0,
            MetricStatus::Warning => warning,
            MetricStatus::Critical => critical,
        };
        let total = penalty(self.status.fps, FPS_PENALTY)
            + penalty(self.status.memory, MEMORY_PENALTY)
            + penalty(self.status.network, NETWORK_PENALTY)
            + penalty(self.status.battery, BATTERY_PENALTY);
        (100.0 - total).max(0.0)
    }

    /// Picks the single reason to adapt for, if any.
    ///
    /// A collapsed health score forces `system_overload` on its own. Otherwise
    /// metrics are checked in priority order: a critical sample triggers at
    /// once, a warning only after enough consecutive samples.
    pub fn evaluate(&self) -> Option<Finding> {
        if self.samples == 0 {
            return None;
        }

        // ── 1. Overall Score ─────────────────────────────────────────────
        let score = self.health_score();
        if score < self.config.overload_score {
            log::warn!("Analysis: health score {:.0}, system overload.", score);
            return Some(Finding::new(
                AdaptationReason::SystemOverload,
                AdaptationSeverity::Critical,
            ));
        }

        // ── 2. Per-Metric Streaks ────────────────────────────────────────
        for metric in Metric::ALL {
            let streak = self.streaks[metric.index()];
            let current = metric.status(&self.status);
            if current == MetricStatus::Critical && streak.critical > 0 {
                log::warn!("Analysis: {:?} critical.", metric);
                return Some(Finding::new(metric.reason(), AdaptationSeverity::High));
            }
            if current == MetricStatus::Warning && streak.warning >= self.config.warning_streak {
                log::info!(
                    "Analysis: {:?} warning for {} consecutive samples.",
                    metric,
                    streak.warning
                );
                return Some(Finding::new(metric.reason(), AdaptationSeverity::Medium));
            }
        }
        None
    }

    /// Detects a worsening short-term trend, FPS first.
    pub fn trend(&self) -> Option<Finding> {
        let trend = &self.config.trend;

        if let Some(change) = window_change(&self.fps_history.to_vec(), trend.window) {
            if change < -trend.fps_decline {
                log::info!("Analysis: FPS declining by {:.0}%.", -change * 100.0);
                return Some(Finding::new(
                    AdaptationReason::FpsDrop,
                    AdaptationSeverity::Medium,
                ));
            }
        }
        if let Some(change) = window_change(&self.memory_history.to_vec(), trend.window) {
            if change > trend.memory_rise {
                log::info!("Analysis: memory rising by {:.0}%.", change * 100.0);
                return Some(Finding::new(
                    AdaptationReason::MemoryPressure,
                    AdaptationSeverity::Medium,
                ));
            }
        }
        None
    }

    /// Forgets every sample, streak and history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
