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

//! Types describing adaptation decisions and their outcomes.

use crate::config::AdaptiveConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Why an adaptation was triggered.
///
/// The declaration order is the evaluation priority (first = checked first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationReason {
    /// Frame rate degraded.
    FpsDrop,
    /// Memory usage too high.
    MemoryPressure,
    /// Battery running out.
    BatteryLow,
    /// Network too slow.
    NetworkSlow,
    /// Overall health score collapsed.
    SystemOverload,
}

impl AdaptationReason {
    /// Every reason, in evaluation priority order.
    pub const ALL: [AdaptationReason; 5] = [
        AdaptationReason::FpsDrop,
        AdaptationReason::MemoryPressure,
        AdaptationReason::BatteryLow,
        AdaptationReason::NetworkSlow,
        AdaptationReason::SystemOverload,
    ];

    /// Returns the snake_case name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptationReason::FpsDrop => "fps_drop",
            AdaptationReason::MemoryPressure => "memory_pressure",
            AdaptationReason::BatteryLow => "battery_low",
            AdaptationReason::NetworkSlow => "network_slow",
            AdaptationReason::SystemOverload => "system_overload",
        }
    }

    /// The fixed list of actions executed for this reason.
    pub fn actions(&self) -> &'static [AdaptationAction] {
        use AdaptationAction::*;
        match self {
            AdaptationReason::FpsDrop => &[
                ReduceAnimations,
                DisableParticles,
                ThrottleCursor,
                ReduceSliderSpeed,
            ],
            AdaptationReason::MemoryPressure => {
                &[ClearCache, ReducePreload, DisableTilt, ReduceBatchSize]
            }
            AdaptationReason::BatteryLow => &[
                DisableAutoplay,
                DisableParticles,
                DisableTilt,
                ReduceAnimations,
                ThrottleCursor,
            ],
            AdaptationReason::NetworkSlow => &[
                ReduceImageQuality,
                ReducePreload,
                DisablePreloaders,
                ReduceBatchSize,
            ],
            AdaptationReason::SystemOverload => &[
                PauseAllEffects,
                DisableParticles,
                DisableTilt,
                DisableParallax,
                ReduceAnimations,
                ClearCache,
            ],
        }
    }
}

impl fmt::Display for AdaptationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown reason or severity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNameError(pub String);

impl fmt::Display for UnknownNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown name '{}'", self.0)
    }
}

impl std::error::Error for UnknownNameError {}

impl FromStr for AdaptationReason {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdaptationReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| UnknownNameError(s.to_string()))
    }
}

/// How hard an adaptation reacts. Scales the cooldown that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptationSeverity {
    /// Sustained warnings or a proactive trend.
    Medium,
    /// A critical metric.
    High,
    /// The whole system is overloaded.
    Critical,
}

impl AdaptationSeverity {
    /// Multiplier applied to the base cooldown.
    pub fn cooldown_multiplier(&self) -> f32 {
        match self {
            AdaptationSeverity::Medium => 1.0,
            AdaptationSeverity::High => 1.5,
            AdaptationSeverity::Critical => 2.0,
        }
    }

    /// Returns the lowercase name of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptationSeverity::Medium => "medium",
            AdaptationSeverity::High => "high",
            AdaptationSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AdaptationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdaptationSeverity {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medium" => Ok(AdaptationSeverity::Medium),
            "high" => Ok(AdaptationSeverity::High),
            "critical" => Ok(AdaptationSeverity::Critical),
            other => Err(UnknownNameError(other.to_string())),
        }
    }
}

/// A single step of an adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationAction {
    /// Shorten tweens, halve stagger and concurrency, drop text splitting.
    ReduceAnimations,
    /// Stop the particle field.
    DisableParticles,
    /// Double the cursor throttle.
    ThrottleCursor,
    /// Slow down slider autoplay.
    ReduceSliderSpeed,
    /// Evict half of the resource cache.
    ClearCache,
    /// Halve the preload ratio.
    ReducePreload,
    /// Stop pointer tilt.
    DisableTilt,
    /// Halve the resource batch size.
    ReduceBatchSize,
    /// Stop slider autoplay.
    DisableAutoplay,
    /// Stop parallax scrolling.
    DisableParallax,
    /// Lower image quality.
    ReduceImageQuality,
    /// Stop loading placeholders.
    DisablePreloaders,
    /// Pause every registered effect.
    PauseAllEffects,
}

impl AdaptationAction {
    /// Returns the snake_case name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptationAction::ReduceAnimations => "reduce_animations",
            AdaptationAction::DisableParticles => "disable_particles",
            AdaptationAction::ThrottleCursor => "throttle_cursor",
            AdaptationAction::ReduceSliderSpeed => "reduce_slider_speed",
            AdaptationAction::ClearCache => "clear_cache",
            AdaptationAction::ReducePreload => "reduce_preload",
            AdaptationAction::DisableTilt => "disable_tilt",
            AdaptationAction::ReduceBatchSize => "reduce_batch_size",
            AdaptationAction::DisableAutoplay => "disable_autoplay",
            AdaptationAction::DisableParallax => "disable_parallax",
            AdaptationAction::ReduceImageQuality => "reduce_image_quality",
            AdaptationAction::DisablePreloaders => "disable_preloaders",
            AdaptationAction::PauseAllEffects => "pause_all_effects",
        }
    }
}

impl fmt::Display for AdaptationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused an adaptation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationTrigger {
    /// The fixed-interval evaluation tick.
    Scheduled,
    /// A critical alert outside cooldown.
    Alert,
    /// A critical alert that arrived during cooldown, applied afterwards.
    Deferred,
    /// A short-term trend detected on a telemetry update.
    Proactive,
    /// The debug/test hook.
    Manual,
}

/// Result of one action within an adaptation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    /// The action that ran.
    pub action: AdaptationAction,
    /// Whether it completed.
    pub succeeded: bool,
    /// What it did, or why it failed.
    pub detail: String,
}

/// System state captured before and after an adaptation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// The live configuration.
    pub config: AdaptiveConfig,
    /// The health score at that moment.
    pub health_score: f32,
    /// Number of cached resources.
    pub cached_resources: usize,
}

/// One entry of the in-memory adaptation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationRecord {
    /// When the adaptation ran.
    #[serde(skip)]
    pub timestamp: Instant,
    /// Why it ran.
    pub reason: AdaptationReason,
    /// How hard it reacted.
    pub severity: AdaptationSeverity,
    /// What triggered it.
    pub trigger: AdaptationTrigger,
    /// Outcome of every action, in table order.
    pub actions: Vec<ActionOutcome>,
    /// State before the actions ran.
    pub before: StateSnapshot,
    /// State after the actions ran.
    pub after: StateSnapshot,
}

impl AdaptationRecord {
    /// Number of actions that failed.
    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| !a.succeeded).count()
    }
}
