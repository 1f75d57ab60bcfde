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

//! Simulated host: device, runtime signals, network and native effects.

use crate::config::DeviceKind;
use anyhow::{bail, Result};
use async_trait::async_trait;
use lumen_cache::ResourceFetcher;
use lumen_core::config::{AnimationSettings, SliderSettings};
use lumen_core::effector::ElementRef;
use lumen_core::platform::{DeviceProbe, MemoryReading, NetworkReading, ProbeResult, RuntimeProbe};
use lumen_core::profile::{
    BatteryStatus, EffectiveConnectionType, FeatureFlags, NetworkInfo, ScreenInfo,
};
use lumen_effects::{
    AnimationFactory, AnimationRequest, EffectDriver, EffectResult, SliderFactory,
};
use std::time::{Duration, Instant};

const GB: u64 = 1024 * 1024 * 1024;

// --- Device ---

/// A scripted device. Only used for the `weak` and `strong` kinds.
pub struct SimulatedDevice {
    kind: DeviceKind,
}

impl SimulatedDevice {
    pub fn new(kind: DeviceKind) -> Self {
        Self { kind }
    }

    fn strong(&self) -> bool {
        self.kind != DeviceKind::Weak
    }
}

#[async_trait]
impl DeviceProbe for SimulatedDevice {
    fn logical_cores(&self) -> ProbeResult<u32> {
        Ok(if self.strong() { 8 } else { 2 })
    }

    fn memory_gb(&self) -> ProbeResult<f32> {
        Ok(if self.strong() { 16.0 } else { 2.0 })
    }

    fn network(&self) -> ProbeResult<NetworkInfo> {
        Ok(if self.strong() {
            NetworkInfo {
                effective_type: EffectiveConnectionType::FourG,
                downlink_mbps: 20.0,
                rtt_ms: 40,
            }
        } else {
            NetworkInfo {
                effective_type: EffectiveConnectionType::TwoG,
                downlink_mbps: 0.2,
                rtt_ms: 900,
            }
        })
    }

    fn gpu_renderer(&self) -> ProbeResult<Option<String>> {
        Ok(self.strong().then(|| "NVIDIA GeForce RTX 4070".to_string()))
    }

    fn screen(&self) -> ProbeResult<ScreenInfo> {
        Ok(if self.strong() {
            ScreenInfo::default()
        } else {
            ScreenInfo {
                width: 390,
                height: 844,
                pixel_ratio: 3.0,
                touch: true,
            }
        })
    }

    fn features(&self) -> ProbeResult<FeatureFlags> {
        Ok(FeatureFlags {
            workers: true,
            offscreen_canvas: self.strong(),
            webgl: self.strong(),
        })
    }

    async fn battery(&self) -> ProbeResult<BatteryStatus> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(if self.strong() {
            BatteryStatus::default()
        } else {
            BatteryStatus {
                level: 0.15,
                charging: false,
                discharging_time_secs: Some(1800.0),
            }
        })
    }
}

// --- Runtime signals ---

/// Memory and network readings that worsen over time under stress.
pub struct SimulatedRuntime {
    started: Instant,
    stress: bool,
}

impl SimulatedRuntime {
    pub fn new(stress: bool) -> Self {
        Self {
            started: Instant::now(),
            stress,
        }
    }

    fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl RuntimeProbe for SimulatedRuntime {
    fn memory(&self) -> Option<MemoryReading> {
        let fraction = if self.stress {
            (0.40 + 0.03 * self.elapsed_secs()).min(0.95)
        } else {
            0.40
        };
        Some(MemoryReading {
            used_bytes: (GB as f64 * fraction as f64) as u64,
            limit_bytes: GB,
        })
    }

    fn network(&self) -> Option<NetworkReading> {
        Some(NetworkReading {
            latency_ms: 120.0,
            bandwidth_mbps: 10.0,
        })
    }
}

/// Frame rate the simulated page reaches `elapsed` into the run.
pub fn simulated_fps(elapsed: Duration, stress: bool) -> f32 {
    if stress {
        (60.0 - 4.0 * elapsed.as_secs_f32()).max(8.0)
    } else {
        60.0
    }
}

// --- Network ---

/// Serves every key after a short delay, except keys naming a missing asset.
pub struct SimulatedFetcher;

#[async_trait]
impl ResourceFetcher for SimulatedFetcher {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        if key.contains("missing") {
            bail!("404 for '{}'", key);
        }
        Ok(vec![0u8; 16 * 1024])
    }
}

// --- Native effects ---

/// A native effect that only logs what it is told.
struct LoggingDriver {
    id: String,
}

impl<S: std::fmt::Debug> EffectDriver<S> for LoggingDriver {
    fn start(&mut self, settings: &S) -> EffectResult<()> {
        log::debug!("Page: start {} with {:?}", self.id, settings);
        Ok(())
    }

    fn pause(&mut self) -> EffectResult<()> {
        log::debug!("Page: pause {}", self.id);
        Ok(())
    }

    fn teardown(&mut self) {
        log::debug!("Page: teardown {}", self.id);
    }
}

/// Creates logging sliders.
pub struct PageSliders;

impl SliderFactory for PageSliders {
    fn create(
        &mut self,
        id: &str,
        _element: &ElementRef,
        _settings: &SliderSettings,
    ) -> EffectResult<Box<dyn EffectDriver<SliderSettings>>> {
        Ok(Box::new(LoggingDriver { id: id.to_string() }))
    }
}

/// Creates logging animations.
pub struct PageAnimations;

impl AnimationFactory for PageAnimations {
    fn create(
        &mut self,
        id: &str,
        _request: &AnimationRequest,
        _settings: &AnimationSettings,
    ) -> EffectResult<Box<dyn EffectDriver<AnimationSettings>>> {
        Ok(Box::new(LoggingDriver { id: id.to_string() }))
    }
}
