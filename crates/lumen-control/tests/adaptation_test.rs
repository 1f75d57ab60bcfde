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

use anyhow::Result;
use async_trait::async_trait;
use lumen_cache::{CacheConfig, LoadPriority, ResourceCache, ResourceFetcher};
use lumen_control::{AdaptiveController, ControllerConfig, ControllerState, EffectorRegistry};
use lumen_core::config::{LiveConfig, SliderSettings};
use lumen_core::control::{
    AdaptationAction, AdaptationReason, AdaptationSeverity, AdaptationTrigger,
};
use lumen_core::effector::{ElementRef, HostEvent};
use lumen_core::platform::NullRuntimeProbe;
use lumen_core::profile::PerformanceTier;
use lumen_core::resource::CacheControl;
use lumen_core::telemetry::{
    Alert, AlertKind, AlertSeverity, MetricStatus, TelemetryEvent, TelemetrySnapshot,
};
use lumen_effects::{
    EffectDriver, EffectResult, SliderFactory, SliderOptions, SliderRegistry, TableTiming,
};
use lumen_telemetry::{SamplerConfig, TelemetrySampler};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// --- Test Setup ---

fn controller_with(cache: Option<Arc<dyn CacheControl>>) -> (AdaptiveController, Instant) {
    let mut controller = AdaptiveController::new(
        ControllerConfig::default(),
        LiveConfig::default(),
        EffectorRegistry::new(),
        cache,
    );
    let start = Instant::now();
    controller.init(PerformanceTier::High, start);
    (controller, start)
}

fn snapshot(at: Instant, fps: MetricStatus, memory: MetricStatus) -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::empty(at);
    snapshot.status.fps = fps;
    snapshot.status.memory = memory;
    snapshot
}

fn critical_alert(kind: AlertKind, at: Instant) -> Alert {
    Alert {
        kind,
        severity: AlertSeverity::Critical,
        value: 0.0,
        timestamp: at,
    }
}

struct EchoFetcher;

#[async_trait]
impl ResourceFetcher for EchoFetcher {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }
}

struct NoopSlider;

impl EffectDriver<SliderSettings> for NoopSlider {
    fn start(&mut self, _settings: &SliderSettings) -> EffectResult<()> {
        Ok(())
    }
    fn pause(&mut self) -> EffectResult<()> {
        Ok(())
    }
    fn teardown(&mut self) {}
}

struct NoopSliderFactory;

impl SliderFactory for NoopSliderFactory {
    fn create(
        &mut self,
        _id: &str,
        _element: &ElementRef,
        _settings: &SliderSettings,
    ) -> EffectResult<Box<dyn EffectDriver<SliderSettings>>> {
        Ok(Box::new(NoopSlider))
    }
}

// --- End-to-end scenarios ---

#[test]
fn test_critical_fps_adapts_immediately() {
    let (mut controller, _) = controller_with(None);
    let sampler = TelemetrySampler::new(SamplerConfig::default(), Arc::new(NullRuntimeProbe));
    let events = sampler.subscribe();

    // Ten frames in one second: far below the critical threshold of 15.
    sampler.frame_counter().record_frames(10);
    let at = Instant::now() + Duration::from_secs(1);
    sampler.sample(at);

    let mut records = Vec::new();
    for event in events.try_iter() {
        let record = match event {
            TelemetryEvent::Sample(snapshot) => controller.on_sample(&snapshot, at),
            TelemetryEvent::Alert(alert) => controller.on_alert(&alert, at),
        };
        records.extend(record);
    }

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.reason, AdaptationReason::FpsDrop);
    assert_eq!(record.severity, AdaptationSeverity::High);
    assert_eq!(record.trigger, AdaptationTrigger::Alert);
    let actions: Vec<_> = record.actions.iter().map(|a| a.action).collect();
    assert_eq!(
        actions,
        vec![
            AdaptationAction::ReduceAnimations,
            AdaptationAction::DisableParticles,
            AdaptationAction::ThrottleCursor,
            AdaptationAction::ReduceSliderSpeed,
        ]
    );
    assert_eq!(controller.state(), ControllerState::CoolingDown);
    assert_eq!(controller.cooldown_remaining(at), Duration::from_secs(15));
}

#[tokio::test]
async fn test_memory_pressure_clears_cache() {
    let cache = ResourceCache::new(
        CacheConfig::default(),
        Arc::new(EchoFetcher),
        LiveConfig::for_tier(PerformanceTier::High),
    );
    for i in 0..6 {
        cache
            .load(&format!("img-{}", i), LoadPriority::Normal)
            .await
            .unwrap();
    }
    assert_eq!(cache.cached_count(), 6);

    let (mut controller, start) = controller_with(Some(Arc::new(cache.clone())));
    controller.on_sample(
        &snapshot(start, MetricStatus::Good, MetricStatus::Critical),
        start,
    );
    let record = controller
        .tick(start + Duration::from_secs(5))
        .expect("memory critical should adapt");

    assert_eq!(record.reason, AdaptationReason::MemoryPressure);
    let clear = &record.actions[0];
    assert_eq!(clear.action, AdaptationAction::ClearCache);
    assert!(clear.succeeded);
    assert_eq!(cache.cached_count(), 3);
    assert_eq!(record.before.cached_resources, 6);
    assert_eq!(record.after.cached_resources, 3);
}

// --- Gating ---

#[test]
fn test_fps_warning_needs_three_samples() {
    let (mut controller, start) = controller_with(None);
    let warning = |at| snapshot(at, MetricStatus::Warning, MetricStatus::Good);

    controller.on_sample(&warning(start), start);
    assert!(controller.tick(start + Duration::from_secs(5)).is_none());

    controller.on_sample(&warning(start), start + Duration::from_secs(6));
    controller.on_sample(&warning(start), start + Duration::from_secs(7));
    let record = controller.tick(start + Duration::from_secs(10)).unwrap();
    assert_eq!(record.reason, AdaptationReason::FpsDrop);
    assert_eq!(record.severity, AdaptationSeverity::Medium);
    assert_eq!(
        controller.cooldown_remaining(start + Duration::from_secs(10)),
        Duration::from_secs(10)
    );
}

#[test]
fn test_rate_limit_caps_adaptations() {
    let (mut controller, start) = controller_with(None);
    for i in 0..3 {
        let at = start + Duration::from_secs(i);
        assert!(controller
            .manual_adaptation(AdaptationReason::NetworkSlow, AdaptationSeverity::Medium, at)
            .is_some());
    }
    assert!(controller
        .manual_adaptation(
            AdaptationReason::NetworkSlow,
            AdaptationSeverity::Medium,
            start + Duration::from_secs(30),
        )
        .is_none());

    // The first adaptation leaves the trailing window after 60 s.
    assert!(controller
        .manual_adaptation(
            AdaptationReason::NetworkSlow,
            AdaptationSeverity::Medium,
            start + Duration::from_secs(60),
        )
        .is_some());
    assert_eq!(controller.statistics(start + Duration::from_secs(60)).total, 4);
}

#[test]
fn test_critical_alert_during_cooldown_is_deferred_once() {
    let (mut controller, start) = controller_with(None);
    let first = controller
        .on_alert(&critical_alert(AlertKind::LowFps, start), start)
        .unwrap();
    assert_eq!(first.trigger, AdaptationTrigger::Alert);

    let later = start + Duration::from_secs(2);
    assert!(controller
        .on_alert(&critical_alert(AlertKind::HighMemory, later), later)
        .is_none());
    assert!(controller
        .on_alert(&critical_alert(AlertKind::HighMemory, later), later)
        .is_none());
    assert_eq!(
        controller.deferred().map(|f| f.reason),
        Some(AdaptationReason::MemoryPressure)
    );
    assert!(controller.tick(start + Duration::from_secs(14)).is_none());

    let deferred = controller.tick(start + Duration::from_secs(15)).unwrap();
    assert_eq!(deferred.trigger, AdaptationTrigger::Deferred);
    assert_eq!(deferred.reason, AdaptationReason::MemoryPressure);
    assert!(controller.deferred().is_none());
    assert_eq!(controller.history().count(), 2);
}

#[test]
fn test_alert_after_cooldown_deadline_runs_deferred_first() {
    let (mut controller, start) = controller_with(None);
    controller.on_alert(&critical_alert(AlertKind::LowFps, start), start);
    let later = start + Duration::from_secs(2);
    controller.on_alert(&critical_alert(AlertKind::HighMemory, later), later);

    // The cooldown ended at 15 s but no tick ran since.
    let at = start + Duration::from_secs(16);
    let record = controller
        .on_alert(&critical_alert(AlertKind::SlowNetwork, at), at)
        .unwrap();
    assert_eq!(record.trigger, AdaptationTrigger::Deferred);
    assert_eq!(record.reason, AdaptationReason::MemoryPressure);
    assert_eq!(
        controller.deferred().map(|f| f.reason),
        Some(AdaptationReason::NetworkSlow)
    );
    assert!(controller.tick(at).is_none());

    let next = controller.tick(start + Duration::from_secs(31)).unwrap();
    assert_eq!(next.trigger, AdaptationTrigger::Deferred);
    assert_eq!(next.reason, AdaptationReason::NetworkSlow);
    assert_eq!(controller.history().count(), 3);
}

#[test]
fn test_sample_after_cooldown_deadline_runs_deferred() {
    let (mut controller, start) = controller_with(None);
    controller.on_alert(&critical_alert(AlertKind::LowFps, start), start);
    let later = start + Duration::from_secs(2);
    controller.on_alert(&critical_alert(AlertKind::LowBattery, later), later);

    let at = start + Duration::from_secs(15);
    let record = controller
        .on_sample(&TelemetrySnapshot::empty(at), at)
        .unwrap();
    assert_eq!(record.trigger, AdaptationTrigger::Deferred);
    assert_eq!(record.reason, AdaptationReason::BatteryLow);
    assert!(controller.deferred().is_none());
}

#[test]
fn test_rate_limited_deferred_adaptation_is_kept() {
    let (mut controller, start) = controller_with(None);
    for i in 0..3 {
        controller.manual_adaptation(
            AdaptationReason::NetworkSlow,
            AdaptationSeverity::Medium,
            start + Duration::from_secs(i),
        );
    }
    let at = start + Duration::from_secs(5);
    assert!(controller
        .on_alert(&critical_alert(AlertKind::HighMemory, at), at)
        .is_none());

    // Cooldown over, but the window still holds three adaptations.
    assert!(controller.tick(start + Duration::from_secs(12)).is_none());
    assert_eq!(
        controller.deferred().map(|f| f.reason),
        Some(AdaptationReason::MemoryPressure)
    );
    assert!(controller.tick(start + Duration::from_secs(30)).is_none());
    assert!(controller.deferred().is_some());

    let record = controller.tick(start + Duration::from_secs(60)).unwrap();
    assert_eq!(record.trigger, AdaptationTrigger::Deferred);
    assert_eq!(record.reason, AdaptationReason::MemoryPressure);
    assert!(controller.deferred().is_none());
    assert_eq!(controller.statistics(start + Duration::from_secs(60)).total, 4);
}

#[test]
fn test_declining_fps_triggers_proactive_adaptation() {
    let (mut controller, start) = controller_with(None);
    let mut records = Vec::new();
    for (i, fps) in [60.0, 60.0, 60.0, 60.0, 60.0, 50.0, 50.0, 50.0, 50.0, 50.0]
        .into_iter()
        .enumerate()
    {
        let at = start + Duration::from_secs(i as u64);
        let mut sample = TelemetrySnapshot::empty(at);
        sample.fps.current = fps;
        records.extend(controller.on_sample(&sample, at));
    }

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trigger, AdaptationTrigger::Proactive);
    assert_eq!(records[0].reason, AdaptationReason::FpsDrop);
    assert_eq!(records[0].severity, AdaptationSeverity::Medium);
}

// --- Effects ---

#[test]
fn test_system_overload_pauses_and_later_resumes_sliders() {
    let live = LiveConfig::for_tier(PerformanceTier::High);
    let mut sliders = SliderRegistry::new(
        Box::new(NoopSliderFactory),
        live.clone(),
        TableTiming::default(),
    );
    assert!(sliders.register_slider(
        "hero",
        ElementRef::new("#hero"),
        SliderOptions::default()
    ));
    let start = Instant::now();
    sliders.start_slider("hero", start);
    let sliders = Arc::new(Mutex::new(sliders));

    let effectors = EffectorRegistry::new();
    effectors.register(sliders.clone());
    let mut controller =
        AdaptiveController::new(ControllerConfig::default(), live, effectors.clone(), None);
    controller.init(PerformanceTier::High, start);
    assert_eq!(effectors.active_count(), 1);

    let record = controller
        .manual_adaptation(
            AdaptationReason::SystemOverload,
            AdaptationSeverity::Critical,
            start,
        )
        .unwrap();
    assert!(record.actions[0].succeeded);
    assert_eq!(effectors.active_count(), 0);

    controller.tick(start + Duration::from_secs(20));
    assert_eq!(effectors.active_count(), 1);
}

#[test]
fn test_hidden_page_stays_paused_after_overload_cooldown() {
    let live = LiveConfig::for_tier(PerformanceTier::High);
    let mut sliders = SliderRegistry::new(
        Box::new(NoopSliderFactory),
        live.clone(),
        TableTiming::default(),
    );
    sliders.register_slider("hero", ElementRef::new("#hero"), SliderOptions::default());
    let start = Instant::now();
    sliders.start_slider("hero", start);

    let effectors = EffectorRegistry::new();
    effectors.register(Arc::new(Mutex::new(sliders)));
    let mut controller =
        AdaptiveController::new(ControllerConfig::default(), live, effectors.clone(), None);
    controller.init(PerformanceTier::High, start);

    controller.manual_adaptation(
        AdaptationReason::SystemOverload,
        AdaptationSeverity::Critical,
        start,
    );
    effectors.dispatch_host_event(HostEvent::Hidden, start + Duration::from_secs(1));

    controller.tick(start + Duration::from_secs(20));
    assert!(!controller.is_cooling_down(start + Duration::from_secs(20)));
    assert_eq!(effectors.active_count(), 0);

    effectors.dispatch_host_event(HostEvent::Visible, start + Duration::from_secs(21));
    assert_eq!(effectors.active_count(), 1);
}

#[test]
fn test_statistics_serialize() {
    let (mut controller, start) = controller_with(None);
    controller.manual_adaptation(AdaptationReason::BatteryLow, AdaptationSeverity::High, start);

    let json = serde_json::to_value(controller.statistics(start)).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["state"], "cooling_down");
    assert_eq!(json["tier"], "high");
    assert_eq!(json["by_reason"]["battery_low"], 1);
    assert_eq!(json["cooldown_remaining_ms"], 15_000);
}
