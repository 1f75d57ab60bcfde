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

//! The tier-indexed adaptive effect configuration and its live handle.
//!
//! Exactly one [`AdaptiveConfig`] is live at any time. It is held by a
//! [`LiveConfig`] and is only ever replaced as a whole, so every effector
//! that reads it observes either the state before or after an adaptation,
//! never a partially applied one.

use crate::profile::PerformanceTier;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Timeline/tween settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Default tween duration in milliseconds.
    pub duration_ms: u32,
    /// Easing curve name passed to the animation driver.
    pub easing: String,
    /// Delay between staggered children in milliseconds.
    pub stagger_ms: u32,
    /// Maximum number of animations allowed to run at the same time.
    pub max_concurrent: usize,
}

/// Carousel settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderSettings {
    /// Whether sliders advance on their own.
    pub autoplay: bool,
    /// Delay between two automatic slide changes in milliseconds.
    pub autoplay_interval_ms: u32,
    /// Slide transition duration in milliseconds.
    pub transition_ms: u32,
}

/// Background particle field settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleSettings {
    /// Whether the particle field runs at all.
    pub enabled: bool,
    /// Number of particles.
    pub count: u32,
}

/// Pointer tilt effect settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltSettings {
    /// Whether tilt reacts to the pointer.
    pub enabled: bool,
    /// Maximum tilt angle in degrees.
    pub max_degrees: f32,
    /// Transition speed in milliseconds.
    pub speed_ms: u32,
    /// Whether the glare overlay is rendered.
    pub glare: bool,
}

/// Custom cursor effect settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSettings {
    /// Whether the custom cursor is rendered.
    pub enabled: bool,
    /// Minimum delay between two pointer updates in milliseconds.
    pub throttle_ms: u32,
}

/// Encoded image format requested from the asset pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// AVIF.
    Avif,
    /// WebP.
    Webp,
    /// JPEG.
    Jpeg,
}

/// Image delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Encoding quality from 0.0 to 1.0.
    pub quality: f32,
    /// Preferred format.
    pub format: ImageFormat,
}

/// Auxiliary resource loading settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Fraction of a section's resources preloaded, taken from the front of the list.
    pub preload_ratio: f32,
    /// Number of resources requested per batch.
    pub batch_size: usize,
}

/// Boolean switches for whole effect families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    /// Parallax scrolling.
    pub parallax: bool,
    /// Scroll-triggered animations.
    pub scroll_trigger: bool,
    /// Fade-in reveals.
    pub fade: bool,
    /// Per-character text splitting.
    pub split_text: bool,
    /// Loading placeholders/preloaders.
    pub preloaders: bool,
}

/// The bundle of per-effect-category settings applied to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// The tier these settings were derived from.
    pub tier: PerformanceTier,
    /// Animation settings.
    pub animation: AnimationSettings,
    /// Slider settings.
    pub slider: SliderSettings,
    /// Particle settings.
    pub particles: ParticleSettings,
    /// Tilt settings.
    pub tilt: TiltSettings,
    /// Cursor settings.
    pub cursor: CursorSettings,
    /// Image settings.
    pub images: ImageSettings,
    /// Resource loading settings.
    pub resources: ResourceSettings,
    /// Feature toggles.
    pub features: FeatureToggles,
}

impl AdaptiveConfig {
    /// Returns the baseline settings for a tier.
    pub fn for_tier(tier: PerformanceTier) -> Self {
        match tier {
            PerformanceTier::High => Self {
                tier,
                animation: AnimationSettings {
                    duration_ms: 800,
                    easing: "power2.out".to_string(),
                    stagger_ms: 100,
                    max_concurrent: 12,
                },
                slider: SliderSettings {
                    autoplay: true,
                    autoplay_interval_ms: 4000,
                    transition_ms: 600,
                },
                particles: ParticleSettings {
                    enabled: true,
                    count: 80,
                },
                tilt: TiltSettings {
                    enabled: true,
                    max_degrees: 15.0,
                    speed_ms: 400,
                    glare: true,
                },
                cursor: CursorSettings {
                    enabled: true,
                    throttle_ms: 16,
                },
                images: ImageSettings {
                    quality: 0.9,
                    format: ImageFormat::Webp,
                },
                resources: ResourceSettings {
                    preload_ratio: 1.0,
                    batch_size: 6,
                },
                features: FeatureToggles {
                    parallax: true,
                    scroll_trigger: true,
                    fade: true,
                    split_text: true,
                    preloaders: true,
                },
            },
            PerformanceTier::Medium => Self {
                tier,
                animation: AnimationSettings {
                    duration_ms: 600,
                    easing: "power1.out".to_string(),
                    stagger_ms: 60,
                    max_concurrent: 8,
                },
                slider: SliderSettings {
                    autoplay: true,
                    autoplay_interval_ms: 5000,
                    transition_ms: 500,
                },
                particles: ParticleSettings {
                    enabled: true,
                    count: 40,
                },
                tilt: TiltSettings {
                    enabled: true,
                    max_degrees: 10.0,
                    speed_ms: 300,
                    glare: false,
                },
                cursor: CursorSettings {
                    enabled: true,
                    throttle_ms: 33,
                },
                images: ImageSettings {
                    quality: 0.75,
                    format: ImageFormat::Webp,
                },
                resources: ResourceSettings {
                    preload_ratio: 0.7,
                    batch_size: 4,
                },
                features: FeatureToggles {
                    parallax: true,
                    scroll_trigger: true,
                    fade: true,
                    split_text: false,
                    preloaders: true,
                },
            },
            PerformanceTier::Low => Self {
                tier,
                animation: AnimationSettings {
                    duration_ms: 300,
                    easing: "linear".to_string(),
                    stagger_ms: 0,
                    max_concurrent: 4,
                },
                slider: SliderSettings {
                    autoplay: false,
                    autoplay_interval_ms: 6000,
                    transition_ms: 300,
                },
                particles: ParticleSettings {
                    enabled: false,
                    count: 0,
                },
                tilt: TiltSettings {
                    enabled: false,
                    max_degrees: 0.0,
                    speed_ms: 0,
                    glare: false,
                },
                cursor: CursorSettings {
                    enabled: false,
                    throttle_ms: 100,
                },
                images: ImageSettings {
                    quality: 0.6,
                    format: ImageFormat::Jpeg,
                },
                resources: ResourceSettings {
                    preload_ratio: 0.3,
                    batch_size: 2,
                },
                features: FeatureToggles {
                    parallax: false,
                    scroll_trigger: false,
                    fade: true,
                    split_text: false,
                    preloaders: false,
                },
            },
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self::for_tier(PerformanceTier::default())
    }
}

/// Shared handle to the single live [`AdaptiveConfig`].
///
/// Cloning the handle shares the same underlying configuration. Every
/// replacement bumps a generation counter so readers can cheaply detect change.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    inner: Arc<RwLock<AdaptiveConfig>>,
    generation: Arc<AtomicU64>,
}

impl LiveConfig {
    /// Creates a live handle holding `config`.
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a live handle holding the baseline of `tier`.
    pub fn for_tier(tier: PerformanceTier) -> Self {
        Self::new(AdaptiveConfig::for_tier(tier))
    }

    /// Returns a copy of the current configuration.
    pub fn snapshot(&self) -> AdaptiveConfig {
        match self.inner.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Reads a single value without cloning the whole configuration.
    pub fn read<R>(&self, f: impl FnOnce(&AdaptiveConfig) -> R) -> R {
        match self.inner.read() {
            Ok(config) => f(&config),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Replaces the live configuration in one write.
    pub fn replace(&self, config: AdaptiveConfig) {
        match self.inner.write() {
            Ok(mut live) => *live = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the number of replacements performed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}
