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

//! Execution of adaptation actions.
//!
//! Every action runs on its own and reports an [`ActionOutcome`]; a failing
//! action never prevents its siblings from running.

use crate::registry::EffectorRegistry;
use lumen_core::config::AdaptiveConfig;
use lumen_core::control::{ActionOutcome, AdaptationAction};
use lumen_core::effector::PauseSource;
use lumen_core::resource::CacheControl;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Shortest tween duration reachable by `reduce_animations`.
const MIN_DURATION_MS: u32 = 150;
/// Bounds of the cursor throttle interval.
const CURSOR_THROTTLE_RANGE_MS: (u32, u32) = (33, 200);
/// Longest slider autoplay interval reachable by `reduce_slider_speed`.
const MAX_SLIDER_INTERVAL_MS: u32 = 12_000;
/// Smallest preload ratio reachable by `reduce_preload`.
const MIN_PRELOAD_RATIO: f32 = 0.1;
/// Quality removed by one `reduce_image_quality`.
const IMAGE_QUALITY_STEP: f32 = 0.15;
/// Lowest image quality reachable by `reduce_image_quality`.
const MIN_IMAGE_QUALITY: f32 = 0.4;

/// Why a single action could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The action needs the resource cache but none is attached.
    #[error("{action}: no resource cache attached")]
    CacheUnavailable {
        /// The action that failed.
        action: AdaptationAction,
    },
    /// The action needs effectors but none are registered.
    #[error("{action}: no effectors registered")]
    NoEffectors {
        /// The action that failed.
        action: AdaptationAction,
    },
}

/// Applies adaptation actions to a working configuration, the effectors and
/// the resource cache.
#[derive(Clone)]
pub struct ActionExecutor {
    effectors: EffectorRegistry,
    cache: Option<Arc<dyn CacheControl>>,
}

impl ActionExecutor {
    /// Creates an executor acting on `effectors` and, optionally, `cache`.
    pub fn new(effectors: EffectorRegistry, cache: Option<Arc<dyn CacheControl>>) -> Self {
        Self { effectors, cache }
    }

    /// Returns the attached cache, if any.
    pub fn cache(&self) -> Option<&Arc<dyn CacheControl>> {
        self.cache.as_ref()
    }

    /// Runs every action against `config` and returns one outcome per action,
    /// in order.
    pub fn execute(
        &self,
        actions: &[AdaptationAction],
        config: &mut AdaptiveConfig,
        now: Instant,
    ) -> Vec<ActionOutcome> {
        actions
            .iter()
            .map(|&action| match self.apply(action, config, now) {
                Ok(detail) => {
                    log::debug!("Actions: {} -> {}", action, detail);
                    ActionOutcome {
                        action,
                        succeeded: true,
                        detail,
                    }
                }
                Err(e) => {
                    log::warn!("Actions: {}", e);
                    ActionOutcome {
                        action,
                        succeeded: false,
                        detail: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Applies a single action.
    pub fn apply(
        &self,
        action: AdaptationAction,
        config: &mut AdaptiveConfig,
        now: Instant,
    ) -> Result<String, ActionError> {
        use AdaptationAction::*;

        let detail = match action {
            ReduceAnimations => {
                let animation = &mut config.animation;
                animation.duration_ms =
                    ((animation.duration_ms as f32 * 0.6) as u32).max(MIN_DURATION_MS);
                animation.stagger_ms /= 2;
                animation.max_concurrent = (animation.max_concurrent / 2).max(1);
                config.features.split_text = false;
                format!(
                    "duration {} ms, stagger {} ms, max {} concurrent",
                    animation.duration_ms, animation.stagger_ms, animation.max_concurrent
                )
            }
            DisableParticles => disable(&mut config.particles.enabled, "particles"),
            ThrottleCursor => {
                let (min, max) = CURSOR_THROTTLE_RANGE_MS;
                let cursor = &mut config.cursor;
                cursor.throttle_ms = cursor.throttle_ms.saturating_mul(2).clamp(min, max);
                format!("cursor throttle {} ms", cursor.throttle_ms)
            }
            ReduceSliderSpeed => {
                let slider = &mut config.slider;
                slider.autoplay_interval_ms = ((slider.autoplay_interval_ms as f32 * 1.5) as u32)
                    .min(MAX_SLIDER_INTERVAL_MS);
                format!("autoplay every {} ms", slider.autoplay_interval_ms)
            }
            ClearCache => {
                let cache = self
                    .cache
                    .as_ref()
                    .ok_or(ActionError::CacheUnavailable { action })?;
                let evicted = cache.cleanup_cache();
                format!("evicted {} resources, {} left", evicted, cache.cached_count())
            }
            ReducePreload => {
                let resources = &mut config.resources;
                resources.preload_ratio = (resources.preload_ratio * 0.5).max(MIN_PRELOAD_RATIO);
                format!("preload ratio {:.2}", resources.preload_ratio)
            }
            DisableTilt => disable(&mut config.tilt.enabled, "tilt"),
            ReduceBatchSize => {
                config.resources.batch_size = (config.resources.batch_size / 2).max(1);
                format!("batch size {}", config.resources.batch_size)
            }
            DisableAutoplay => disable(&mut config.slider.autoplay, "autoplay"),
            DisableParallax => disable(&mut config.features.parallax, "parallax"),
            ReduceImageQuality => {
                let images = &mut config.images;
                images.quality = (images.quality - IMAGE_QUALITY_STEP).max(MIN_IMAGE_QUALITY);
                format!("image quality {:.2}", images.quality)
            }
            DisablePreloaders => disable(&mut config.features.preloaders, "preloaders"),
            PauseAllEffects => {
                if self.effectors.is_empty() {
                    return Err(ActionError::NoEffectors { action });
                }
                self.effectors.pause_all(PauseSource::Controller, now);
                format!("paused {} effectors", self.effectors.len())
            }
        };
        Ok(detail)
    }
}

fn disable(flag: &mut bool, what: &str) -> String {
    if *flag {
        *flag = false;
        format!("{} disabled", what)
    } else {
        format!("{} already disabled", what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::CountingEffector;
    use lumen_core::profile::PerformanceTier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeCache {
        cached: AtomicUsize,
    }

    impl CacheControl for FakeCache {
        fn cleanup_cache(&self) -> usize {
            let cached = self.cached.load(Ordering::SeqCst);
            let evicted = cached.div_ceil(2);
            self.cached.store(cached - evicted, Ordering::SeqCst);
            evicted
        }
        fn clear_failed_cache(&self) -> usize {
            0
        }
        fn cached_count(&self) -> usize {
            self.cached.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_reduce_animations() {
        let executor = ActionExecutor::new(EffectorRegistry::new(), None);
        let mut config = AdaptiveConfig::for_tier(PerformanceTier::High);
        executor
            .apply(AdaptationAction::ReduceAnimations, &mut config, Instant::now())
            .unwrap();
        assert_eq!(config.animation.duration_ms, 480);
        assert_eq!(config.animation.stagger_ms, 50);
        assert_eq!(config.animation.max_concurrent, 6);
        assert!(!config.features.split_text);
    }

    #[test]
    fn test_reductions_hit_their_floors() {
        let executor = ActionExecutor::new(EffectorRegistry::new(), None);
        let mut config = AdaptiveConfig::for_tier(PerformanceTier::Low);
        let now = Instant::now();
        for _ in 0..10 {
            for action in [
                AdaptationAction::ReduceAnimations,
                AdaptationAction::ThrottleCursor,
                AdaptationAction::ReduceSliderSpeed,
                AdaptationAction::ReducePreload,
                AdaptationAction::ReduceBatchSize,
                AdaptationAction::ReduceImageQuality,
            ] {
                executor.apply(action, &mut config, now).unwrap();
            }
        }
        assert_eq!(config.animation.duration_ms, MIN_DURATION_MS);
        assert_eq!(config.animation.max_concurrent, 1);
        assert_eq!(config.cursor.throttle_ms, 200);
        assert_eq!(config.slider.autoplay_interval_ms, MAX_SLIDER_INTERVAL_MS);
        assert_eq!(config.resources.preload_ratio, MIN_PRELOAD_RATIO);
        assert_eq!(config.resources.batch_size, 1);
        assert_eq!(config.images.quality, MIN_IMAGE_QUALITY);
    }

    #[test]
    fn test_missing_cache_fails_only_its_action() {
        let executor = ActionExecutor::new(EffectorRegistry::new(), None);
        let mut config = AdaptiveConfig::for_tier(PerformanceTier::High);
        let outcomes = executor.execute(
            lumen_core::AdaptationReason::MemoryPressure.actions(),
            &mut config,
            Instant::now(),
        );

        assert_eq!(outcomes.len(), 4);
        assert!(!outcomes[0].succeeded);
        assert!(outcomes[1..].iter().all(|o| o.succeeded));
        assert!(!config.tilt.enabled);
        assert_eq!(config.resources.batch_size, 3);
    }

    #[test]
    fn test_clear_cache_evicts() {
        let cache = Arc::new(FakeCache {
            cached: AtomicUsize::new(10),
        });
        let executor = ActionExecutor::new(EffectorRegistry::new(), Some(cache.clone()));
        let mut config = AdaptiveConfig::default();
        let detail = executor
            .apply(AdaptationAction::ClearCache, &mut config, Instant::now())
            .unwrap();
        assert_eq!(cache.cached_count(), 5);
        assert_eq!(detail, "evicted 5 resources, 5 left");
    }

    #[test]
    fn test_pause_all_effects() {
        let effectors = EffectorRegistry::new();
        let effector = Arc::new(Mutex::new(CountingEffector::with_effects(4)));
        effectors.register(effector.clone());
        let executor = ActionExecutor::new(effectors, None);

        let mut config = AdaptiveConfig::default();
        executor
            .apply(AdaptationAction::PauseAllEffects, &mut config, Instant::now())
            .unwrap();
        assert_eq!(effector.lock().unwrap().active, 0);
    }

    #[test]
    fn test_pause_without_effectors_fails() {
        let executor = ActionExecutor::new(EffectorRegistry::new(), None);
        let mut config = AdaptiveConfig::default();
        assert_eq!(
            executor.apply(AdaptationAction::PauseAllEffects, &mut config, Instant::now()),
            Err(ActionError::NoEffectors {
                action: AdaptationAction::PauseAllEffects
            })
        );
    }
}
