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

//! One-shot device capability profiling.

use lumen_core::platform::{DeviceProbe, ProbeResult};
use lumen_core::profile::{gpu_tier_from_renderer, BatteryStatus, CapabilityProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration of the capability profiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Upper bound on the battery query.
    pub battery_timeout_ms: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            battery_timeout_ms: 2000,
        }
    }
}

/// Captures a [`CapabilityProfile`] from a [`DeviceProbe`].
///
/// Profiling never fails: each failing probe is replaced by its default.
pub struct CapabilityProfiler {
    probe: Arc<dyn DeviceProbe>,
    config: ProfilerConfig,
}

impl CapabilityProfiler {
    /// Creates a profiler over the given probe.
    pub fn new(probe: Arc<dyn DeviceProbe>, config: ProfilerConfig) -> Self {
        Self { probe, config }
    }

    /// Runs every probe and assembles the profile.
    pub async fn profile(&self) -> CapabilityProfile {
        let defaults = CapabilityProfile::default();
        let probe = self.probe.as_ref();

        let logical_cores = or_default(
            "logical_cores",
            probe.logical_cores(),
            defaults.logical_cores,
        );
        let memory_gb = or_default("memory_gb", probe.memory_gb(), defaults.memory_gb);
        let network = or_default("network", probe.network(), defaults.network);
        let gpu_tier = match probe.gpu_renderer() {
            Ok(renderer) => gpu_tier_from_renderer(renderer.as_deref()),
            Err(e) => {
                log::debug!("Profiler: {}, using default", e);
                defaults.gpu_tier
            }
        };
        let screen = or_default("screen", probe.screen(), defaults.screen);
        let features = or_default("features", probe.features(), defaults.features);

        let timeout = Duration::from_millis(self.config.battery_timeout_ms);
        let battery = match tokio::time::timeout(timeout, probe.battery()).await {
            Ok(result) => or_default("battery", result, BatteryStatus::default()),
            Err(_) => {
                log::warn!(
                    "Profiler: battery probe timed out after {:?}, assuming full and charging",
                    timeout
                );
                BatteryStatus::default()
            }
        };

        let profile = CapabilityProfile {
            logical_cores,
            memory_gb,
            network,
            gpu_tier,
            battery,
            screen,
            features,
        };
        log::info!(
            "Profiler: {} cores, {:.1} GB, gpu tier {}, score {:.1} → {} tier",
            profile.logical_cores,
            profile.memory_gb,
            profile.gpu_tier,
            profile.score(),
            profile.tier()
        );
        profile
    }
}

fn or_default<T>(probe: &str, result: ProbeResult<T>, default: T) -> T {
    result.unwrap_or_else(|e| {
        log::debug!("Profiler: {} probe: {}, using default", probe, e);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lumen_core::platform::ProbeError;
    use lumen_core::profile::{
        EffectiveConnectionType, FeatureFlags, NetworkInfo, PerformanceTier, ScreenInfo,
    };

    /// A probe where nothing works.
    struct BrokenProbe;

    #[async_trait]
    impl DeviceProbe for BrokenProbe {
        fn logical_cores(&self) -> ProbeResult<u32> {
            Err(ProbeError::Unsupported("logical_cores"))
        }
        fn memory_gb(&self) -> ProbeResult<f32> {
            Err(ProbeError::Unsupported("memory_gb"))
        }
        fn network(&self) -> ProbeResult<NetworkInfo> {
            Err(ProbeError::Failed {
                probe: "network",
                details: "no connection api".to_string(),
            })
        }
        fn gpu_renderer(&self) -> ProbeResult<Option<String>> {
            Err(ProbeError::Unsupported("gpu_renderer"))
        }
        fn screen(&self) -> ProbeResult<ScreenInfo> {
            Err(ProbeError::Unsupported("screen"))
        }
        fn features(&self) -> ProbeResult<FeatureFlags> {
            Err(ProbeError::Unsupported("features"))
        }
        async fn battery(&self) -> ProbeResult<BatteryStatus> {
            Err(ProbeError::Unsupported("battery"))
        }
    }

    /// A capable desktop whose battery query never resolves.
    struct HangingBatteryDesktop;

    #[async_trait]
    impl DeviceProbe for HangingBatteryDesktop {
        fn logical_cores(&self) -> ProbeResult<u32> {
            Ok(8)
        }
        fn memory_gb(&self) -> ProbeResult<f32> {
            Ok(8.0)
        }
        fn network(&self) -> ProbeResult<NetworkInfo> {
            Ok(NetworkInfo {
                effective_type: EffectiveConnectionType::FourG,
                downlink_mbps: 50.0,
                rtt_ms: 40,
            })
        }
        fn gpu_renderer(&self) -> ProbeResult<Option<String>> {
            Ok(Some("NVIDIA GeForce RTX 3070".to_string()))
        }
        fn screen(&self) -> ProbeResult<ScreenInfo> {
            Ok(ScreenInfo::default())
        }
        fn features(&self) -> ProbeResult<FeatureFlags> {
            Ok(FeatureFlags {
                workers: true,
                offscreen_canvas: true,
                webgl: true,
            })
        }
        async fn battery(&self) -> ProbeResult<BatteryStatus> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_failing_probes_fall_back_to_defaults() {
        let profiler = CapabilityProfiler::new(Arc::new(BrokenProbe), ProfilerConfig::default());
        let profile = profiler.profile().await;
        assert_eq!(profile, CapabilityProfile::default());
    }

    #[tokio::test]
    async fn test_battery_timeout_assumes_charging() {
        let profiler = CapabilityProfiler::new(
            Arc::new(HangingBatteryDesktop),
            ProfilerConfig {
                battery_timeout_ms: 50,
            },
        );
        let profile = profiler.profile().await;

        assert_eq!(profile.battery, BatteryStatus::default());
        assert_eq!(profile.gpu_tier, 3);
        assert_eq!(profile.tier(), PerformanceTier::High);
    }
}
