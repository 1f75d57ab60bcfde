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

//! The animation registry.

use crate::driver::{AnimationFactory, AnimationRequest, TweenProperties};
use crate::error::EffectError;
use crate::table::{EffectHandle, EffectTable, TableTiming};
use lumen_core::config::{AdaptiveConfig, AnimationSettings, LiveConfig};
use lumen_core::effector::{Effector, ElementRef, PauseSource};
use std::collections::HashMap;
use std::time::Instant;

/// Per-animation tweaks requested by the caller.
///
/// Durations and staggers are capped by the live settings, so an override
/// can shorten an animation but never make it more expensive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationOverrides {
    /// Requested duration in milliseconds.
    pub duration_ms: Option<u32>,
    /// Requested easing curve.
    pub easing: Option<String>,
    /// Requested stagger in milliseconds.
    pub stagger_ms: Option<u32>,
}

fn effective_settings(
    base: &AnimationSettings,
    overrides: &AnimationOverrides,
) -> AnimationSettings {
    AnimationSettings {
        duration_ms: overrides
            .duration_ms
            .map_or(base.duration_ms, |d| d.min(base.duration_ms)),
        easing: overrides
            .easing
            .clone()
            .unwrap_or_else(|| base.easing.clone()),
        stagger_ms: overrides
            .stagger_ms
            .map_or(base.stagger_ms, |s| s.min(base.stagger_ms)),
        max_concurrent: base.max_concurrent,
    }
}

/// Owns every timeline, tween and scroll trigger of the page.
pub struct AnimationRegistry {
    table: EffectTable<AnimationSettings>,
    requests: HashMap<String, (AnimationRequest, AnimationOverrides)>,
    factory: Box<dyn AnimationFactory>,
    live: LiveConfig,
    next_id: u64,
}

impl AnimationRegistry {
    /// Creates an empty registry.
    pub fn new(factory: Box<dyn AnimationFactory>, live: LiveConfig, timing: TableTiming) -> Self {
        Self {
            table: EffectTable::new("AnimationRegistry", timing),
            requests: HashMap::new(),
            factory,
            live,
            next_id: 0,
        }
    }

    /// Returns `true` if a new animation on `element` may run now: nothing
    /// is globally paused, the element is visible (or was never reported)
    /// and the concurrency budget of the live config is not exhausted.
    pub fn should_animate(&self, element: &ElementRef) -> bool {
        let budget = self.live.read(|config| config.animation.max_concurrent);
        !self.table.is_paused_globally()
            && self.table.is_visible_or_unknown(element)
            && self.table.active_count() < budget
    }

    /// Creates and plays a timeline owned by `trigger`.
    ///
    /// Returns `None` when the animation should not run; the host then
    /// applies the end state directly.
    pub fn create_optimized_timeline(
        &mut self,
        trigger: ElementRef,
        overrides: AnimationOverrides,
        now: Instant,
    ) -> Option<String> {
        if !self.should_animate(&trigger) {
            log::trace!("AnimationRegistry: skipping timeline on {}", trigger);
            return None;
        }
        let id = self.create(AnimationRequest::Timeline { trigger }, overrides)?;
        self.table.start(&id, now);
        Some(id)
    }

    /// Tweens `target` towards `properties`.
    ///
    /// Returns `None` when the animation should not run.
    pub fn animate(
        &mut self,
        target: ElementRef,
        properties: TweenProperties,
        overrides: AnimationOverrides,
        now: Instant,
    ) -> Option<String> {
        if !self.should_animate(&target) {
            log::trace!("AnimationRegistry: skipping tween on {}", target);
            return None;
        }
        let id = self.create(AnimationRequest::Tween { target, properties }, overrides)?;
        self.table.start(&id, now);
        Some(id)
    }

    /// Binds a scroll-driven reveal to `element`. It plays once the element
    /// is reported visible.
    ///
    /// Returns `None` when scroll triggers are disabled by the live config.
    pub fn set_scroll_trigger(
        &mut self,
        element: ElementRef,
        overrides: AnimationOverrides,
        now: Instant,
    ) -> Option<String> {
        if !self.live.read(|config| config.features.scroll_trigger) {
            log::debug!("AnimationRegistry: scroll triggers disabled, skipping {}", element);
            return None;
        }
        let visible = self.table.visibility(&element) == Some(true);
        let id = self.create(AnimationRequest::ScrollTrigger { element }, overrides)?;
        if visible && !self.table.is_paused_globally() {
            self.table.start(&id, now);
        }
        Some(id)
    }

    fn create(
        &mut self,
        request: AnimationRequest,
        overrides: AnimationOverrides,
    ) -> Option<String> {
        self.next_id += 1;
        let id = format!("{}-{}", request.kind(), self.next_id);
        let settings = self
            .live
            .read(|config| effective_settings(&config.animation, &overrides));

        let driver = match self.factory.create(&id, &request, &settings) {
            Ok(driver) => driver,
            Err(e) => {
                log::error!("AnimationRegistry: {}", e);
                return None;
            }
        };
        self.table
            .insert(&id, request.element().clone(), settings, driver);
        self.requests.insert(id.clone(), (request, overrides));
        Some(id)
    }

    /// Reports that an animation completed; it is torn down and forgotten.
    pub fn finish(&mut self, id: &str) -> bool {
        self.requests.remove(id);
        self.table.remove(id)
    }

    /// Reports an element entering or leaving the viewport.
    pub fn set_element_visibility(&mut self, element: &ElementRef, visible: bool, now: Instant) {
        self.table.set_visibility(element, visible, now);
    }

    /// Looks up an animation.
    pub fn animation(&self, id: &str) -> Option<&EffectHandle<AnimationSettings>> {
        self.table.get(id)
    }

    /// Number of registered animations.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no animation is registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Effector for AnimationRegistry {
    fn name(&self) -> &str {
        "animations"
    }

    fn pause_all(&mut self, source: PauseSource, now: Instant) {
        self.table.pause_all(source, now);
    }

    fn resume_visible(&mut self, source: PauseSource, now: Instant) {
        self.table.resume_visible(source, now);
    }

    fn update_performance_config(&mut self, config: &AdaptiveConfig, now: Instant) {
        if !config.features.scroll_trigger {
            let requests = &self.requests;
            let removed = self.table.remove_where(|handle| {
                matches!(
                    requests.get(handle.id()),
                    Some((AnimationRequest::ScrollTrigger { .. }, _))
                )
            });
            self.requests
                .retain(|_, (request, _)| !matches!(request, AnimationRequest::ScrollTrigger { .. }));
            if removed > 0 {
                log::debug!("AnimationRegistry: removed {} scroll triggers", removed);
            }
        }

        let requests = &self.requests;
        self.table.reconfigure(now, |id, old| match requests.get(id) {
            Some((_, overrides)) => effective_settings(&config.animation, overrides),
            None => old.clone(),
        });
    }

    fn poll(&mut self, now: Instant) {
        let factory = &mut self.factory;
        let requests = &self.requests;
        self.table.poll(now, |handle| match requests.get(handle.id()) {
            Some((request, _)) => factory.create(handle.id(), request, handle.settings()),
            None => Err(EffectError::Create {
                id: handle.id().to_string(),
                reason: "unknown animation request".to_string(),
            }),
        });
    }

    fn active_count(&self) -> usize {
        self.table.active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::EffectDriver;
    use crate::error::EffectResult;
    use crate::table::test_support::Script;
    use lumen_core::profile::PerformanceTier;
    use std::time::Duration;

    struct ScriptedAnimations(Script);

    impl AnimationFactory for ScriptedAnimations {
        fn create(
            &mut self,
            id: &str,
            _request: &AnimationRequest,
            settings: &AnimationSettings,
        ) -> EffectResult<Box<dyn EffectDriver<AnimationSettings>>> {
            self.0
                .log(format!("create {} duration={}", id, settings.duration_ms));
            Ok(self.0.driver(id))
        }
    }

    fn registry(tier: PerformanceTier) -> (AnimationRegistry, Script) {
        let script = Script::default();
        let registry = AnimationRegistry::new(
            Box::new(ScriptedAnimations(script.clone())),
            LiveConfig::for_tier(tier),
            TableTiming::default(),
        );
        (registry, script)
    }

    #[test]
    fn test_concurrency_budget_limits_new_animations() {
        let (mut animations, _) = registry(PerformanceTier::Low);
        let now = Instant::now();
        let budget = AdaptiveConfig::for_tier(PerformanceTier::Low)
            .animation
            .max_concurrent;

        for i in 0..budget {
            let trigger = ElementRef::new(format!("#card-{i}"));
            assert!(animations
                .create_optimized_timeline(trigger, AnimationOverrides::default(), now)
                .is_some());
        }
        let extra = ElementRef::new("#card-extra");
        assert!(!animations.should_animate(&extra));
        assert!(animations
            .create_optimized_timeline(extra, AnimationOverrides::default(), now)
            .is_none());
    }

    #[test]
    fn test_hidden_target_is_not_animated() {
        let (mut animations, _) = registry(PerformanceTier::High);
        let now = Instant::now();
        let target = ElementRef::new("#footer");
        animations.set_element_visibility(&target, false, now);

        let properties = TweenProperties::from([("opacity".to_string(), 1.0)]);
        assert!(animations
            .animate(target, properties, AnimationOverrides::default(), now)
            .is_none());
    }

    #[test]
    fn test_overrides_cannot_exceed_live_duration() {
        let (mut animations, script) = registry(PerformanceTier::High);
        let now = Instant::now();
        let id = animations
            .create_optimized_timeline(
                ElementRef::new("#hero"),
                AnimationOverrides {
                    duration_ms: Some(5000),
                    ..AnimationOverrides::default()
                },
                now,
            )
            .unwrap();

        let live = AdaptiveConfig::for_tier(PerformanceTier::High).animation;
        assert_eq!(
            animations.animation(&id).unwrap().settings().duration_ms,
            live.duration_ms
        );
        assert_eq!(script.count("start timeline-1"), 1);
    }

    #[test]
    fn test_scroll_triggers_follow_feature_toggle() {
        let (mut low, _) = registry(PerformanceTier::Low);
        let now = Instant::now();
        assert!(low
            .set_scroll_trigger(ElementRef::new("#about"), AnimationOverrides::default(), now)
            .is_none());

        let (mut high, _) = registry(PerformanceTier::High);
        let element = ElementRef::new("#about");
        let id = high
            .set_scroll_trigger(element.clone(), AnimationOverrides::default(), now)
            .unwrap();
        assert!(!high.animation(&id).unwrap().is_active());

        high.set_element_visibility(&element, true, now);
        assert!(high.animation(&id).unwrap().is_active());

        let mut config = AdaptiveConfig::for_tier(PerformanceTier::High);
        config.features.scroll_trigger = false;
        high.update_performance_config(&config, now);
        assert!(high.animation(&id).is_none());
    }

    #[test]
    fn test_reduced_animations_restart_with_new_duration() {
        let (mut animations, _) = registry(PerformanceTier::High);
        let now = Instant::now();
        let id = animations
            .create_optimized_timeline(ElementRef::new("#hero"), AnimationOverrides::default(), now)
            .unwrap();

        let mut config = AdaptiveConfig::for_tier(PerformanceTier::High);
        config.animation.duration_ms = 300;
        animations.update_performance_config(&config, now);
        assert!(!animations.animation(&id).unwrap().is_active());

        animations.poll(now + Duration::from_millis(150));
        let handle = animations.animation(&id).unwrap();
        assert!(handle.is_active());
        assert_eq!(handle.settings().duration_ms, 300);
    }

    #[test]
    fn test_finish_forgets_the_animation() {
        let (mut animations, script) = registry(PerformanceTier::High);
        let now = Instant::now();
        let id = animations
            .create_optimized_timeline(ElementRef::new("#hero"), AnimationOverrides::default(), now)
            .unwrap();
        assert!(animations.finish(&id));
        assert!(animations.is_empty());
        assert_eq!(script.count("teardown"), 1);
    }
}
