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

//! Device capability profile and the performance tier derived from it.

use serde::{Deserialize, Serialize};

/// Score at or above which a device is classified as [`PerformanceTier::High`].
pub const HIGH_TIER_SCORE: f32 = 80.0;
/// Score at or above which a device is classified as [`PerformanceTier::Medium`].
pub const MEDIUM_TIER_SCORE: f32 = 50.0;
/// Viewport width below which a screen counts as small.
pub const SMALL_SCREEN_WIDTH: u32 = 768;

/// Coarse device-class bucket driving which adaptive configuration is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    /// Weak device: most decorative effects are disabled.
    Low,
    /// Average device.
    #[default]
    Medium,
    /// Capable device: every effect is enabled.
    High,
}

impl PerformanceTier {
    /// Maps a capability score to a tier.
    pub fn from_score(score: f32) -> Self {
        if score >= HIGH_TIER_SCORE {
            PerformanceTier::High
        } else if score >= MEDIUM_TIER_SCORE {
            PerformanceTier::Medium
        } else {
            PerformanceTier::Low
        }
    }

    /// Returns the lowercase name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "low",
            PerformanceTier::Medium => "medium",
            PerformanceTier::High => "high",
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective connection type reported by the network information probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectiveConnectionType {
    /// Very slow 2G.
    Slow2g,
    /// 2G.
    TwoG,
    /// 3G.
    ThreeG,
    /// 4G or better.
    FourG,
    /// The platform does not expose the connection type.
    #[default]
    Unknown,
}

impl EffectiveConnectionType {
    /// Parses the conventional names (`"slow-2g"`, `"2g"`, `"3g"`, `"4g"`).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => EffectiveConnectionType::Slow2g,
            "2g" => EffectiveConnectionType::TwoG,
            "3g" => EffectiveConnectionType::ThreeG,
            "4g" => EffectiveConnectionType::FourG,
            _ => EffectiveConnectionType::Unknown,
        }
    }
}

/// Network characteristics observed at profiling time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Effective connection type.
    pub effective_type: EffectiveConnectionType,
    /// Estimated downlink bandwidth in Mbps.
    pub downlink_mbps: f32,
    /// Estimated round-trip time in milliseconds.
    pub rtt_ms: u32,
}

impl Default for NetworkInfo {
    fn default() -> Self {
        Self {
            effective_type: EffectiveConnectionType::Unknown,
            downlink_mbps: 10.0,
            rtt_ms: 100,
        }
    }
}

/// Battery state. The default is the neutral value used when the probe is
/// unavailable or never answers: full and charging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level from 0.0 to 1.0.
    pub level: f32,
    /// Whether the device is connected to a power source.
    pub charging: bool,
    /// Remaining discharge time in seconds, if known.
    pub discharging_time_secs: Option<f32>,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            level: 1.0,
            charging: true,
            discharging_time_secs: None,
        }
    }
}

/// Screen geometry and pointer capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Device pixel ratio.
    pub pixel_ratio: f32,
    /// Whether the primary pointer is touch based.
    pub touch: bool,
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            pixel_ratio: 1.0,
            touch: false,
        }
    }
}

/// Optional platform features detected at profiling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Background workers are available.
    pub workers: bool,
    /// Off-screen canvas rendering is available.
    pub offscreen_canvas: bool,
    /// A hardware accelerated graphics context can be created.
    pub webgl: bool,
}

/// Snapshot of the device signals captured once at startup.
///
/// Immutable once captured; getting fresh values requires running the
/// profiler again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// Number of logical cores.
    pub logical_cores: u32,
    /// Device memory estimate in gigabytes.
    pub memory_gb: f32,
    /// Network characteristics.
    pub network: NetworkInfo,
    /// GPU tier from 0 (software) to 3 (discrete).
    pub gpu_tier: u8,
    /// Battery state.
    pub battery: BatteryStatus,
    /// Screen geometry.
    pub screen: ScreenInfo,
    /// Feature flags.
    pub features: FeatureFlags,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self {
            logical_cores: 4,
            memory_gb: 4.0,
            network: NetworkInfo::default(),
            gpu_tier: 1,
            battery: BatteryStatus::default(),
            screen: ScreenInfo::default(),
            features: FeatureFlags::default(),
        }
    }
}

impl CapabilityProfile {
    /// Computes the weighted capability score (0 to 95 before penalties).
    ///
    /// | Signal | Max points |
    /// |---|---|
    /// | CPU cores | 30 |
    /// | Memory | 25 |
    /// | GPU tier | 20 |
    /// | Network | 10 |
    /// | Battery | 10 |
    ///
    /// Small screens (×0.9) and touch screens (×0.95) apply a multiplicative penalty.
    pub fn score(&self) -> f32 {
        let cpu = match self.logical_cores {
            c if c >= 8 => 30.0,
            c if c >= 4 => 20.0,
            c if c >= 2 => 10.0,
            _ => 5.0,
        };

        let memory = if self.memory_gb >= 8.0 {
            25.0
        } else if self.memory_gb >= 4.0 {
            18.0
        } else if self.memory_gb >= 2.0 {
            10.0
        } else {
            5.0
        };

        let gpu = match self.gpu_tier {
            0 => 0.0,
            1 => 7.0,
            2 => 14.0,
            _ => 20.0,
        };

        let network = match self.network.effective_type {
            EffectiveConnectionType::FourG => 10.0,
            EffectiveConnectionType::ThreeG => 6.0,
            EffectiveConnectionType::TwoG => 3.0,
            EffectiveConnectionType::Slow2g => 1.0,
            EffectiveConnectionType::Unknown => 5.0,
        };

        let battery = if self.battery.charging {
            10.0
        } else if self.battery.level > 0.5 {
            8.0
        } else if self.battery.level > 0.2 {
            5.0
        } else {
            2.0
        };

        let mut penalty = 1.0;
        if self.screen.width < SMALL_SCREEN_WIDTH {
            penalty *= 0.9;
        }
        if self.screen.touch {
            penalty *= 0.95;
        }

        (cpu + memory + gpu + network + battery) * penalty
    }

    /// Classifies the profile into a performance tier.
    pub fn tier(&self) -> PerformanceTier {
        classify(self)
    }
}

/// Classifies a capability profile. Pure and deterministic.
pub fn classify(profile: &CapabilityProfile) -> PerformanceTier {
    PerformanceTier::from_score(profile.score())
}

/// Estimates a GPU tier from the renderer string reported by the graphics
/// context. `None` means no accelerated context could be created.
pub fn gpu_tier_from_renderer(renderer: Option<&str>) -> u8 {
    let Some(renderer) = renderer else {
        return 0;
    };
    let renderer = renderer.to_ascii_lowercase();

    const SOFTWARE: [&str; 3] = ["swiftshader", "llvmpipe", "software"];
    const DISCRETE: [&str; 5] = ["nvidia", "geforce", "rtx", "radeon", "amd"];
    const INTEGRATED: [&str; 5] = ["intel", "mali", "adreno", "powervr", "apple"];

    if SOFTWARE.iter().any(|s| renderer.contains(s)) {
        0
    } else if DISCRETE.iter().any(|s| renderer.contains(s)) {
        3
    } else if renderer.contains("intel") && renderer.contains("hd graphics") {
        1
    } else if INTEGRATED.iter().any(|s| renderer.contains(s)) {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_profile() -> CapabilityProfile {
        CapabilityProfile {
            logical_cores: 8,
            memory_gb: 16.0,
            network: NetworkInfo {
                effective_type: EffectiveConnectionType::FourG,
                downlink_mbps: 20.0,
                rtt_ms: 50,
            },
            gpu_tier: 3,
            battery: BatteryStatus {
                level: 1.0,
                charging: true,
                discharging_time_secs: None,
            },
            ..Default::default()
        }
    }

    fn weak_profile() -> CapabilityProfile {
        CapabilityProfile {
            logical_cores: 2,
            memory_gb: 2.0,
            network: NetworkInfo {
                effective_type: EffectiveConnectionType::TwoG,
                downlink_mbps: 0.25,
                rtt_ms: 1800,
            },
            gpu_tier: 0,
            battery: BatteryStatus {
                level: 0.15,
                charging: false,
                discharging_time_secs: Some(1200.0),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_strong_device_is_high_tier() {
        let profile = strong_profile();
        assert!(profile.score() >= HIGH_TIER_SCORE);
        assert_eq!(classify(&profile), PerformanceTier::High);
    }

    #[test]
    fn test_weak_device_is_low_tier() {
        let profile = weak_profile();
        assert!(profile.score() < MEDIUM_TIER_SCORE);
        assert_eq!(profile.tier(), PerformanceTier::Low);
    }

    #[test]
    fn test_default_profile_is_medium() {
        // 20 + 18 + 7 + 5 + 10 = 60
        let profile = CapabilityProfile::default();
        assert!((profile.score() - 60.0).abs() < 0.001);
        assert_eq!(profile.tier(), PerformanceTier::Medium);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let profile = weak_profile();
        let first = classify(&profile);
        for _ in 0..10 {
            assert_eq!(classify(&profile.clone()), first);
        }
    }

    #[test]
    fn test_small_touch_screen_penalty() {
        let mut profile = strong_profile();
        let desktop = profile.score();
        profile.screen = ScreenInfo {
            width: 390,
            height: 844,
            pixel_ratio: 3.0,
            touch: true,
        };
        let mobile = profile.score();
        assert!((mobile - desktop * 0.9 * 0.95).abs() < 0.001);
        // 95 * 0.855 = 81.2, still high
        assert_eq!(profile.tier(), PerformanceTier::High);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(PerformanceTier::from_score(80.0), PerformanceTier::High);
        assert_eq!(PerformanceTier::from_score(79.9), PerformanceTier::Medium);
        assert_eq!(PerformanceTier::from_score(50.0), PerformanceTier::Medium);
        assert_eq!(PerformanceTier::from_score(49.9), PerformanceTier::Low);
    }

    #[test]
    fn test_connection_type_parsing() {
        assert_eq!(EffectiveConnectionType::from_name("4g"), EffectiveConnectionType::FourG);
        assert_eq!(EffectiveConnectionType::from_name(" Slow-2G "), EffectiveConnectionType::Slow2g);
        assert_eq!(EffectiveConnectionType::from_name("wifi"), EffectiveConnectionType::Unknown);
    }

    #[test]
    fn test_gpu_tier_heuristic() {
        assert_eq!(gpu_tier_from_renderer(None), 0);
        assert_eq!(gpu_tier_from_renderer(Some("Google SwiftShader")), 0);
        assert_eq!(gpu_tier_from_renderer(Some("NVIDIA GeForce RTX 3080")), 3);
        assert_eq!(gpu_tier_from_renderer(Some("Intel(R) HD Graphics 620")), 1);
        assert_eq!(gpu_tier_from_renderer(Some("Intel(R) Iris(R) Xe Graphics")), 2);
        assert_eq!(gpu_tier_from_renderer(Some("Adreno (TM) 650")), 2);
        assert_eq!(gpu_tier_from_renderer(Some("Mystery GPU")), 1);
    }
}
