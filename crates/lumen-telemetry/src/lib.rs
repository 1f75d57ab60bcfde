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

//! Capability profiling and runtime telemetry for the adaptive quality loop.
//!
//! The [`CapabilityProfiler`] runs once at startup; the [`TelemetrySampler`]
//! runs continuously and publishes [`TelemetryEvent`](lumen_core::TelemetryEvent)s
//! to its subscribers.

#![warn(missing_docs)]

pub mod alerts;
pub mod metrics;
pub mod profiler;
pub mod sampler;
pub mod service;

pub use alerts::AlertLimiter;
pub use metrics::{window_change, RingBuffer};
pub use profiler::{CapabilityProfiler, ProfilerConfig};
pub use sampler::{SamplerConfig, SamplerCore};
pub use service::{FrameCounter, TelemetrySampler};
