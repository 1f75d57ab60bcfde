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

//! Threaded driver of the adaptive controller.

use crate::controller::{
    AdaptationStatistics, AdaptiveController, ControllerConfig, ControllerState,
};
use crate::registry::EffectorRegistry;
use crossbeam_channel::Receiver;
use lumen_core::config::LiveConfig;
use lumen_core::control::{AdaptationReason, AdaptationRecord, AdaptationSeverity};
use lumen_core::effector::HostEvent;
use lumen_core::profile::PerformanceTier;
use lumen_core::resource::CacheControl;
use lumen_core::telemetry::TelemetryEvent;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for the adaptive service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Period of the service loop. Bounds how late alerts, ticks and effector
    /// deadlines are handled.
    pub loop_interval_ms: u64,
    /// Controller settings.
    pub controller: ControllerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 50,
            controller: ControllerConfig::default(),
        }
    }
}

/// Runs the controller on its own thread, fed by a telemetry subscription.
///
/// Host events skip the controller and go straight to the effectors.
pub struct AdaptiveService {
    config: ServiceConfig,
    controller: Arc<Mutex<AdaptiveController>>,
    effectors: EffectorRegistry,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AdaptiveService {
    /// Creates a new service. The controller starts idle.
    pub fn new(
        config: ServiceConfig,
        live: LiveConfig,
        effectors: EffectorRegistry,
        cache: Option<Arc<dyn CacheControl>>,
    ) -> Self {
        let controller =
            AdaptiveController::new(config.controller.clone(), live, effectors.clone(), cache);
        Self {
            config,
            controller: Arc::new(Mutex::new(controller)),
            effectors,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the effector registry.
    pub fn effectors(&self) -> &EffectorRegistry {
        &self.effectors
    }

    fn with_controller<R>(&self, f: impl FnOnce(&mut AdaptiveController) -> R) -> Option<R> {
        match self.controller.lock() {
            Ok(mut controller) => Some(f(&mut controller)),
            Err(_) => {
                log::error!("AdaptiveService: controller poisoned");
                None
            }
        }
    }

    /// Installs the baseline of `tier` and schedules the first evaluation.
    pub fn init(&self, tier: PerformanceTier) {
        self.with_controller(|c| c.init(tier, Instant::now()));
    }

    /// Returns `true` while the service thread runs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the service thread, consuming `events`. Does nothing if it
    /// already runs.
    pub fn start(&mut self, events: Receiver<TelemetryEvent>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = Arc::clone(&self.running);
        let controller = Arc::clone(&self.controller);
        let effectors = self.effectors.clone();
        let loop_interval = Duration::from_millis(self.config.loop_interval_ms.max(1));

        let handle = thread::spawn(move || {
            log::info!("Adaptive service thread started.");

            while running.load(Ordering::Relaxed) {
                let start_time = Instant::now();

                // 1. Ingest all pending events, then tick
                match controller.lock() {
                    Ok(mut controller) => {
                        while let Ok(event) = events.try_recv() {
                            let now = Instant::now();
                            match event {
                                TelemetryEvent::Sample(snapshot) => {
                                    controller.on_sample(&snapshot, now);
                                }
                                TelemetryEvent::Alert(alert) => {
                                    controller.on_alert(&alert, now);
                                }
                            }
                        }
                        controller.tick(Instant::now());
                    }
                    Err(_) => log::error!("AdaptiveService: controller poisoned, skipping tick"),
                }

                // 2. Effector deadlines (grace restarts, recovery)
                effectors.poll_all(Instant::now());

                // 3. Sleep until next iteration
                let elapsed = start_time.elapsed();
                if elapsed < loop_interval {
                    thread::sleep(loop_interval - elapsed);
                }
            }
            log::info!("Adaptive service thread stopped.");
        });

        self.handle = Some(handle);
    }

    /// Stops and joins the service thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Forwards a host event to every effector.
    pub fn dispatch_host_event(&self, event: HostEvent) {
        self.effectors.dispatch_host_event(event, Instant::now());
    }

    /// Forces an adaptation. Bypasses the cooldown, not the rate limit.
    pub fn manual_adaptation(
        &self,
        reason: AdaptationReason,
        severity: AdaptationSeverity,
    ) -> Option<AdaptationRecord> {
        self.with_controller(|c| c.manual_adaptation(reason, severity, Instant::now()))
            .flatten()
    }

    /// Clears every adaptation and restores the tier baseline.
    pub fn reset_adaptations(&self) {
        self.with_controller(|c| c.reset_adaptations(Instant::now()));
    }

    /// Switches to the baseline of another tier.
    pub fn set_tier(&self, tier: PerformanceTier) {
        self.with_controller(|c| c.set_tier(tier, Instant::now()));
    }

    /// Aggregated adaptation statistics.
    pub fn statistics(&self) -> Option<AdaptationStatistics> {
        self.with_controller(|c| c.statistics(Instant::now()))
    }

    /// Copy of the adaptation history, oldest first.
    pub fn history(&self) -> Vec<AdaptationRecord> {
        self.with_controller(|c| c.history().cloned().collect())
            .unwrap_or_default()
    }

    /// Current controller state.
    pub fn state(&self) -> Option<ControllerState> {
        self.with_controller(|c| c.state())
    }

    /// Returns the live configuration handle.
    pub fn live_config(&self) -> Option<LiveConfig> {
        self.with_controller(|c| c.live_config().clone())
    }
}

impl Drop for AdaptiveService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::CountingEffector;
    use lumen_core::telemetry::{Alert, AlertKind, AlertSeverity, TelemetrySnapshot};

    fn service() -> (AdaptiveService, Arc<Mutex<CountingEffector>>) {
        let effectors = EffectorRegistry::new();
        let effector = Arc::new(Mutex::new(CountingEffector::with_effects(2)));
        effectors.register(effector.clone());
        let service = AdaptiveService::new(
            ServiceConfig {
                loop_interval_ms: 5,
                ..ServiceConfig::default()
            },
            LiveConfig::default(),
            effectors,
            None,
        );
        service.init(PerformanceTier::High);
        (service, effector)
    }

    #[test]
    fn test_service_lifecycle() {
        let (mut service, effector) = service();
        let (_tx, rx) = crossbeam_channel::unbounded();
        service.start(rx);
        assert!(service.is_running());
        thread::sleep(Duration::from_millis(50));
        service.stop();
        assert!(!service.is_running());
        assert!(effector.lock().unwrap().polls > 0);
    }

    #[test]
    fn test_critical_alert_adapts_from_thread() {
        let (mut service, _) = service();
        let (tx, rx) = crossbeam_channel::unbounded();
        service.start(rx);

        tx.send(TelemetryEvent::Sample(Arc::new(TelemetrySnapshot::empty(
            Instant::now(),
        ))))
        .unwrap();
        tx.send(TelemetryEvent::Alert(Alert {
            kind: AlertKind::LowFps,
            severity: AlertSeverity::Critical,
            value: 10.0,
            timestamp: Instant::now(),
        }))
        .unwrap();
        thread::sleep(Duration::from_millis(100));
        service.stop();

        let history = service.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, AdaptationReason::FpsDrop);
        assert_eq!(service.state(), Some(ControllerState::CoolingDown));
        let live = service.live_config().unwrap();
        assert!(!live.read(|c| c.particles.enabled));
    }

    #[test]
    fn test_host_events_bypass_controller() {
        let (service, effector) = service();
        service.dispatch_host_event(HostEvent::Blur);
        assert_eq!(effector.lock().unwrap().active, 0);
        service.dispatch_host_event(HostEvent::Focus);
        assert_eq!(effector.lock().unwrap().active, 2);
        assert_eq!(service.statistics().map(|s| s.total), Some(0));
    }
}
