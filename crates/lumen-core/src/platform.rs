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

//! Provides abstractions over the host platform signals.
//!
//! [`DeviceProbe`] is queried once by the capability profiler; [`RuntimeProbe`]
//! is polled on every telemetry tick. Concrete implementations live in
//! `lumen-infra` or in the host.

use crate::profile::{BatteryStatus, FeatureFlags, NetworkInfo, ScreenInfo};
use async_trait::async_trait;
use std::fmt;

/// An error raised by a platform probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The platform does not expose this signal.
    Unsupported(&'static str),
    /// The probe exists but failed.
    Failed {
        /// The probe that failed.
        probe: &'static str,
        /// What went wrong.
        details: String,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Unsupported(probe) => write!(f, "Probe '{probe}' is not supported"),
            ProbeError::Failed { probe, details } => {
                write!(f, "Probe '{probe}' failed: {details}")
            }
        }
    }
}

impl std::error::Error for ProbeError {}

/// A specialized `Result` for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// One-shot device capability probes.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Number of logical cores.
    fn logical_cores(&self) -> ProbeResult<u32>;

    /// Device memory estimate in gigabytes.
    fn memory_gb(&self) -> ProbeResult<f32>;

    /// Network information.
    fn network(&self) -> ProbeResult<NetworkInfo>;

    /// Renderer string of an accelerated graphics context, or `None` if none
    /// could be created.
    fn gpu_renderer(&self) -> ProbeResult<Option<String>>;

    /// Screen geometry and pointer capability.
    fn screen(&self) -> ProbeResult<ScreenInfo>;

    /// Optional feature support.
    fn features(&self) -> ProbeResult<FeatureFlags>;

    /// Battery state. May take arbitrarily long or never resolve.
    async fn battery(&self) -> ProbeResult<BatteryStatus>;
}

/// A memory reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    /// Used bytes.
    pub used_bytes: u64,
    /// Limit in bytes.
    pub limit_bytes: u64,
}

impl MemoryReading {
    /// Used memory as a fraction of the limit.
    pub fn fraction(&self) -> f32 {
        if self.limit_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.limit_bytes as f64) as f32
    }
}

/// A network reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkReading {
    /// Round-trip latency in milliseconds.
    pub latency_ms: f32,
    /// Bandwidth in Mbps.
    pub bandwidth_mbps: f32,
}

/// Probes polled on every telemetry tick.
///
/// `None` means the signal is unavailable right now; the sampler keeps the
/// previous value.
pub trait RuntimeProbe: Send + Sync {
    /// Current memory usage.
    fn memory(&self) -> Option<MemoryReading>;

    /// Current network conditions.
    fn network(&self) -> Option<NetworkReading> {
        None
    }

    /// Current battery state.
    fn battery(&self) -> Option<BatteryStatus> {
        None
    }
}

/// A runtime probe that never has anything to report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRuntimeProbe;

impl RuntimeProbe for NullRuntimeProbe {
    fn memory(&self) -> Option<MemoryReading> {
        None
    }
}
