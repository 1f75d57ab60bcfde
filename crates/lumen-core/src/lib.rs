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

//! # Lumen Core
//!
//! Foundational crate containing the data model, traits and interface
//! contracts of the adaptive quality loop.
//!
//! Like every core crate in the workspace, it defines the abstract "what":
//! capability profiles and tiers, the adaptive effect configuration, telemetry
//! snapshots and alerts, adaptation records, and the seams (`Effector`,
//! `CacheControl`, probes) the service crates plug into.

#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod effector;
pub mod platform;
pub mod profile;
pub mod resource;
pub mod telemetry;

pub use config::{AdaptiveConfig, LiveConfig};
pub use control::{AdaptationAction, AdaptationReason, AdaptationRecord, AdaptationSeverity};
pub use effector::{ElementRef, Effector, HostEvent, PauseSource};
pub use profile::{CapabilityProfile, PerformanceTier};
pub use resource::CacheControl;
pub use telemetry::{Alert, AlertKind, AlertSeverity, MetricStatus, TelemetryEvent, TelemetrySnapshot};
