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

//! The slider registry.

use crate::driver::SliderFactory;
use crate::table::{EffectHandle, EffectTable, TableTiming};
use lumen_core::config::{AdaptiveConfig, LiveConfig, SliderSettings};
use lumen_core::effector::{Effector, ElementRef, PauseSource};
use std::collections::HashMap;
use std::time::Instant;

/// Per-slider options given at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderOptions {
    /// Whether this slider wants autoplay. The live config can still veto it.
    pub autoplay: bool,
}

impl Default for SliderOptions {
    fn default() -> Self {
        Self { autoplay: true }
    }
}

fn effective_settings(base: &SliderSettings, options: Option<&SliderOptions>) -> SliderSettings {
    let wants_autoplay = options.map_or(true, |o| o.autoplay);
    SliderSettings {
        autoplay: base.autoplay && wants_autoplay,
        ..*base
    }
}

/// Owns every slider instance of the page.
pub struct SliderRegistry {
    table: EffectTable<SliderSettings>,
    options: HashMap<String, SliderOptions>,
    factory: Box<dyn SliderFactory>,
    live: LiveConfig,
}

impl SliderRegistry {
    /// Creates an empty registry.
    pub fn new(factory: Box<dyn SliderFactory>, live: LiveConfig, timing: TableTiming) -> Self {
        Self {
            table: EffectTable::new("SliderRegistry", timing),
            options: HashMap::new(),
            factory,
            live,
        }
    }

    /// Creates and registers a slider. Returns `false` on a duplicate id or
    /// if the native slider could not be created.
    pub fn register_slider(
        &mut self,
        id: &str,
        element: ElementRef,
        options: SliderOptions,
    ) -> bool {
        if self.table.contains(id) {
            log::warn!("SliderRegistry: slider '{}' is already registered", id);
            return false;
        }

        let settings = self
            .live
            .read(|config| effective_settings(&config.slider, Some(&options)));
        let driver = match self.factory.create(id, &element, &settings) {
            Ok(driver) => driver,
            Err(e) => {
                log::error!("SliderRegistry: {}", e);
                return false;
            }
        };

        log::debug!("SliderRegistry: registered '{}' on {}", id, element);
        self.options.insert(id.to_string(), options);
        self.table.insert(id, element, settings, driver)
    }

    /// Tears down and forgets a slider.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.options.remove(id);
        self.table.remove(id)
    }

    /// Starts one slider.
    pub fn start_slider(&mut self, id: &str, now: Instant) -> bool {
        self.table.start(id, now)
    }

    /// Pauses one slider.
    pub fn pause_slider(&mut self, id: &str, now: Instant) -> bool {
        self.table.pause(id, now)
    }

    /// Pauses every slider.
    pub fn pause_all_sliders(&mut self, now: Instant) {
        self.table.pause_all(PauseSource::Host, now);
    }

    /// Starts every slider whose element is visible or unknown, unless the
    /// controller holds a pause.
    pub fn start_visible_sliders(&mut self, now: Instant) {
        self.table.resume_visible(PauseSource::Host, now);
    }

    /// Reports an element entering or leaving the viewport.
    pub fn set_element_visibility(&mut self, element: &ElementRef, visible: bool, now: Instant) {
        self.table.set_visibility(element, visible, now);
    }

    /// Counts a user interaction with a slider.
    pub fn record_interaction(&mut self, id: &str, now: Instant) -> bool {
        self.table.record_interaction(id, now)
    }

    /// Looks up a slider.
    pub fn slider(&self, id: &str) -> Option<&EffectHandle<SliderSettings>> {
        self.table.get(id)
    }

    /// Number of registered sliders.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no slider is registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Effector for SliderRegistry {
    fn name(&self) -> &str {
        "sliders"
    }

    fn pause_all(&mut self, source: PauseSource, now: Instant) {
        self.table.pause_all(source, now);
    }

    fn resume_visible(&mut self, source: PauseSource, now: Instant) {
        self.table.resume_visible(source, now);
    }

    fn update_performance_config(&mut self, config: &AdaptiveConfig, now: Instant) {
        let options = &self.options;
        self.table.reconfigure(now, |id, _| {
            effective_settings(&config.slider, options.get(id))
        });
    }

    fn poll(&mut self, now: Instant) {
        let factory = &mut self.factory;
        self.table.poll(now, |handle| {
            factory.create(handle.id(), handle.element(), handle.settings())
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
    use crate::error::{EffectError, EffectResult};
    use crate::table::test_support::Script;
    use lumen_core::profile::PerformanceTier;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct ScriptedSliders(Script);

    impl SliderFactory for ScriptedSliders {
        fn create(
            &mut self,
            id: &str,
            _element: &ElementRef,
            settings: &SliderSettings,
        ) -> EffectResult<Box<dyn EffectDriver<SliderSettings>>> {
            if self.0.fail_create.load(Ordering::SeqCst) {
                return Err(EffectError::Create {
                    id: id.to_string(),
                    reason: "no such element".to_string(),
                });
            }
            self.0.log(format!("create {} autoplay={}", id, settings.autoplay));
            Ok(self.0.driver(id))
        }
    }

    fn opts() -> SliderOptions {
        SliderOptions::default()
    }

    fn registry(tier: PerformanceTier) -> (SliderRegistry, Script, LiveConfig) {
        let script = Script::default();
        let live = LiveConfig::for_tier(tier);
        let registry = SliderRegistry::new(
            Box::new(ScriptedSliders(script.clone())),
            live.clone(),
            TableTiming::default(),
        );
        (registry, script, live)
    }

    #[test]
    fn test_register_rejects_duplicates_and_factory_failures() {
        let (mut sliders, script, _) = registry(PerformanceTier::High);

        assert!(sliders.register_slider("hero", ElementRef::new("#hero"), opts()));
        assert!(!sliders.register_slider("hero", ElementRef::new("#hero"), opts()));

        script.set_fail_create(true);
        assert!(!sliders.register_slider("team", ElementRef::new("#team"), opts()));
        assert_eq!(sliders.len(), 1);
    }

    #[test]
    fn test_low_tier_vetoes_autoplay() {
        let (mut sliders, script, _) = registry(PerformanceTier::Low);
        sliders.register_slider("hero", ElementRef::new("#hero"), SliderOptions::default());

        assert!(!sliders.slider("hero").unwrap().settings().autoplay);
        assert_eq!(script.count("create hero autoplay=false"), 1);
    }

    #[test]
    fn test_start_pause_and_interactions() {
        let (mut sliders, _, _) = registry(PerformanceTier::High);
        let now = Instant::now();
        sliders.register_slider("hero", ElementRef::new("#hero"), SliderOptions::default());

        assert!(sliders.start_slider("hero", now));
        assert_eq!(Effector::active_count(&sliders), 1);
        assert!(sliders.pause_slider("hero", now));
        assert_eq!(Effector::active_count(&sliders), 0);

        sliders.record_interaction("hero", now);
        sliders.record_interaction("hero", now + Duration::from_secs(1));
        let hero = sliders.slider("hero").unwrap();
        assert_eq!(hero.interactions(), 2);
        assert_eq!(hero.last_interaction(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_config_change_restarts_after_grace() {
        let (mut sliders, script, _) = registry(PerformanceTier::High);
        let now = Instant::now();
        sliders.register_slider("hero", ElementRef::new("#hero"), SliderOptions::default());
        sliders.register_slider(
            "logos",
            ElementRef::new("#logos"),
            SliderOptions { autoplay: false },
        );
        sliders.start_slider("hero", now);
        sliders.start_slider("logos", now);

        let mut config = AdaptiveConfig::for_tier(PerformanceTier::High);
        config.slider.autoplay = false;
        sliders.update_performance_config(&config, now);

        // "logos" never autoplayed, so its settings did not change.
        assert!(!sliders.slider("hero").unwrap().is_active());
        assert!(sliders.slider("logos").unwrap().is_active());

        sliders.poll(now + Duration::from_millis(150));
        assert!(sliders.slider("hero").unwrap().is_active());
        assert!(!sliders.slider("hero").unwrap().settings().autoplay);
        assert_eq!(script.count("start hero"), 2);
    }

    #[test]
    fn test_visibility_path() {
        let (mut sliders, _, _) = registry(PerformanceTier::High);
        let now = Instant::now();
        sliders.register_slider("hero", ElementRef::new("#hero"), SliderOptions::default());
        sliders.start_slider("hero", now);

        sliders.set_element_visibility(&ElementRef::new("#hero"), false, now);
        assert!(!sliders.slider("hero").unwrap().is_active());
        sliders.start_visible_sliders(now);
        assert!(!sliders.slider("hero").unwrap().is_active());

        sliders.set_element_visibility(&ElementRef::new("#hero"), true, now);
        assert!(sliders.slider("hero").unwrap().is_active());
    }
}
