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

//! sysinfo-based implementations of the device and runtime probes.

use async_trait::async_trait;
use lumen_core::platform::{DeviceProbe, MemoryReading, ProbeError, ProbeResult, RuntimeProbe};
use lumen_core::profile::{BatteryStatus, FeatureFlags, NetworkInfo, ScreenInfo};
use std::sync::{Arc, Mutex};
use sysinfo::System;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A device probe that uses the `sysinfo` crate.
///
/// Only CPU and memory are observable this way; the other signals report
/// [`ProbeError::Unsupported`] and the profiler falls back to its defaults.
pub struct SysinfoDeviceProbe {
    system: Arc<Mutex<System>>,
}

impl SysinfoDeviceProbe {
    /// Creates a new probe with a fully refreshed system view.
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }

    fn with_system<T>(&self, probe: &'static str, f: impl FnOnce(&System) -> T) -> ProbeResult<T> {
        self.system
            .lock()
            .map(|system| f(&system))
            .map_err(|_| ProbeError::Failed {
                probe,
                details: "system state poisoned".to_string(),
            })
    }
}

impl Default for SysinfoDeviceProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceProbe for SysinfoDeviceProbe {
    fn logical_cores(&self) -> ProbeResult<u32> {
        let cores = self.with_system("logical_cores", |system| system.cpus().len())?;
        if cores == 0 {
            return Err(ProbeError::Failed {
                probe: "logical_cores",
                details: "no cpu reported".to_string(),
            });
        }
        Ok(cores as u32)
    }

    fn memory_gb(&self) -> ProbeResult<f32> {
        let total = self.with_system("memory_gb", |system| system.total_memory())?;
        if total == 0 {
            return Err(ProbeError::Failed {
                probe: "memory_gb",
                details: "total memory reported as zero".to_string(),
            });
        }
        Ok((total as f64 / BYTES_PER_GB) as f32)
    }

    fn network(&self) -> ProbeResult<NetworkInfo> {
        Err(ProbeError::Unsupported("network"))
    }

    fn gpu_renderer(&self) -> ProbeResult<Option<String>> {
        Err(ProbeError::Unsupported("gpu_renderer"))
    }

    fn screen(&self) -> ProbeResult<ScreenInfo> {
        Err(ProbeError::Unsupported("screen"))
    }

    fn features(&self) -> ProbeResult<FeatureFlags> {
        // A native process can always run worker threads.
        Ok(FeatureFlags {
            workers: true,
            ..FeatureFlags::default()
        })
    }

    async fn battery(&self) -> ProbeResult<BatteryStatus> {
        // sysinfo doesn't expose the battery.
        Err(ProbeError::Unsupported("battery"))
    }
}

/// A runtime probe reporting process-wide memory pressure through `sysinfo`.
pub struct SysinfoRuntimeProbe {
    system: Mutex<System>,
}

impl SysinfoRuntimeProbe {
    /// Creates a new runtime probe.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SysinfoRuntimeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeProbe for SysinfoRuntimeProbe {
    fn memory(&self) -> Option<MemoryReading> {
        let Ok(mut system) = self.system.lock() else {
            log::warn!("SysinfoRuntimeProbe: system state poisoned");
            return None;
        };
        system.refresh_memory();
        let limit_bytes = system.total_memory();
        if limit_bytes == 0 {
            return None;
        }
        Some(MemoryReading {
            used_bytes: system.used_memory(),
            limit_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_probe_reports_cpu_and_memory() {
        let probe = SysinfoDeviceProbe::new();
        if let Ok(cores) = probe.logical_cores() {
            assert!(cores >= 1);
        }
        if let Ok(memory) = probe.memory_gb() {
            assert!(memory > 0.0);
        }
        assert_eq!(probe.network(), Err(ProbeError::Unsupported("network")));
        assert!(probe.features().unwrap().workers);
    }

    #[tokio::test]
    async fn test_battery_is_unsupported() {
        let probe = SysinfoDeviceProbe::new();
        assert!(probe.battery().await.is_err());
    }

    #[test]
    fn test_runtime_memory_fraction_is_bounded() {
        let probe = SysinfoRuntimeProbe::new();
        if let Some(reading) = probe.memory() {
            let fraction = reading.fraction();
            assert!((0.0..=1.0).contains(&fraction));
        }
    }
}
