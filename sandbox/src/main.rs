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

// Lumen Sandbox
// Runs the adaptive quality loop against a simulated page

mod config;
mod sim;

use anyhow::Result;
use clap::Parser;
use config::{Cli, DeviceKind};
use lumen_cache::ResourceCache;
use lumen_control::{AdaptiveService, EffectorRegistry};
use lumen_core::config::LiveConfig;
use lumen_core::effector::{ElementRef, HostEvent};
use lumen_core::platform::{DeviceProbe, RuntimeProbe};
use lumen_effects::{
    AnimationOverrides, AnimationRegistry, SliderOptions, SliderRegistry, TableTiming,
};
use lumen_infra::{SysinfoDeviceProbe, SysinfoRuntimeProbe};
use lumen_telemetry::{CapabilityProfiler, TelemetrySampler};
use sim::{PageAnimations, PageSliders, SimulatedDevice, SimulatedFetcher, SimulatedRuntime};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Period of the simulated render loop.
const FRAME_BATCH: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    // ── 1. Profile the device ────────────────────────────────────────────
    let (device, runtime) = match cli.device {
        DeviceKind::Host => (
            Arc::new(SysinfoDeviceProbe::new()) as Arc<dyn DeviceProbe>,
            Arc::new(SysinfoRuntimeProbe::new()) as Arc<dyn RuntimeProbe>,
        ),
        kind => (
            Arc::new(SimulatedDevice::new(kind)) as Arc<dyn DeviceProbe>,
            Arc::new(SimulatedRuntime::new(cli.stress)) as Arc<dyn RuntimeProbe>,
        ),
    };
    let profile = CapabilityProfiler::new(device, config.profiler.clone())
        .profile()
        .await;
    let tier = profile.tier();
    let live = LiveConfig::for_tier(tier);

    // ── 2. Build the page ────────────────────────────────────────────────
    let cache = ResourceCache::new(
        config.cache.clone(),
        Arc::new(SimulatedFetcher),
        live.clone(),
    );
    let gallery: Vec<String> = (1..=20)
        .map(|i| format!("gallery/photo-{:02}.webp", i))
        .chain(std::iter::once("gallery/missing.webp".to_string()))
        .collect();
    let preload = cache.preload_section("gallery", gallery);

    let timing = TableTiming::default();
    let now = Instant::now();
    let mut sliders = SliderRegistry::new(Box::new(PageSliders), live.clone(), timing);
    for (id, selector) in [("hero", "#hero"), ("testimonials", ".testimonials")] {
        sliders.register_slider(id, ElementRef::new(selector), SliderOptions::default());
    }
    sliders.set_element_visibility(&ElementRef::new(".testimonials"), false, now);
    sliders.start_visible_sliders(now);

    let mut animations = AnimationRegistry::new(Box::new(PageAnimations), live.clone(), timing);
    animations.create_optimized_timeline(
        ElementRef::new("#intro"),
        AnimationOverrides::default(),
        now,
    );
    animations.set_scroll_trigger(
        ElementRef::new(".features"),
        AnimationOverrides {
            duration_ms: Some(400),
            ..AnimationOverrides::default()
        },
        now,
    );

    let effectors = EffectorRegistry::new();
    effectors.register(Arc::new(Mutex::new(sliders)));
    effectors.register(Arc::new(Mutex::new(animations)));

    // ── 3. Close the loop ────────────────────────────────────────────────
    let mut sampler = TelemetrySampler::new(config.sampler.clone(), runtime);
    let mut service = AdaptiveService::new(
        config.service.clone(),
        live.clone(),
        effectors,
        Some(Arc::new(cache.clone())),
    );
    service.init(tier);
    service.start(sampler.subscribe());
    sampler.start();

    // ── 4. Render ────────────────────────────────────────────────────────
    let frames = sampler.frame_counter();
    let started = Instant::now();
    let run_for = Duration::from_secs(cli.seconds);
    let mut ticker = tokio::time::interval(FRAME_BATCH);
    let mut carry = 0.0f32;
    let mut blurred = false;

    while started.elapsed() < run_for {
        ticker.tick().await;
        let elapsed = started.elapsed();
        carry += sim::simulated_fps(elapsed, cli.stress) * FRAME_BATCH.as_secs_f32();
        let whole = carry.floor();
        frames.record_frames(whole as u64);
        carry -= whole;

        // The user briefly switches tabs halfway through.
        if !blurred && elapsed >= run_for / 2 {
            blurred = true;
            service.dispatch_host_event(HostEvent::Hidden);
            service.dispatch_host_event(HostEvent::Visible);
        }
    }

    sampler.stop();
    service.stop();

    // ── 5. Report ────────────────────────────────────────────────────────
    match preload.await {
        Ok(summary) => log::info!("Sandbox: preload {}", serde_json::to_string(&summary)?),
        Err(e) => log::warn!("Sandbox: preload task failed: {}", e),
    }
    println!("profile score: {:.1} ({} tier)", profile.score(), tier);
    println!("cache: {}", serde_json::to_string_pretty(&cache.stats())?);
    if let Some(stats) = service.statistics() {
        println!("adaptations: {}", serde_json::to_string_pretty(&stats)?);
    }
    for record in service.history() {
        println!(
            "  {} ({}, {:?}): {} actions, {} failed",
            record.reason,
            record.severity,
            record.trigger,
            record.actions.len(),
            record.failed_actions()
        );
    }
    println!("live config: {}", serde_json::to_string_pretty(&live.snapshot())?);
    Ok(())
}
