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

//! # Lumen Control
//!
//! The adaptive controller: reads telemetry, decides when and how hard to
//! degrade visual effects, and applies its decisions to the live
//! configuration, the effect registries and the resource cache.
//!
//! - [`HealthAnalyzer`] reduces the telemetry stream to per-metric streaks,
//!   a health score and short-term trends.
//! - [`ActionExecutor`] runs the actions mapped to an adaptation reason.
//! - [`AdaptiveController`] owns the state machine, cooldown and rate limit.
//! - [`AdaptiveService`] drives the controller on its own thread.

#![warn(missing_docs)]

pub mod actions;
pub mod analysis;
pub mod controller;
pub mod registry;
pub mod service;

pub use actions::{ActionError, ActionExecutor};
pub use analysis::{AnalysisConfig, Finding, HealthAnalyzer, Metric, Streak, TrendConfig};
pub use controller::{AdaptationStatistics, AdaptiveController, ControllerConfig, ControllerState};
pub use registry::EffectorRegistry;
pub use service::{AdaptiveService, ServiceConfig};
