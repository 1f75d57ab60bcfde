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

//! Threaded telemetry sampler publishing snapshots and alerts to subscribers.

use crate::sampler::{SamplerConfig, SamplerCore};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use lumen_core::platform::RuntimeProbe;
use lumen_core::telemetry::{Alert, TelemetryEvent, TelemetrySnapshot};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep of the sampling thread, so `stop` stays responsive.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// A cloneable handle used by the host to count rendered frames.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frames: Arc<AtomicU64>,
}

impl FrameCounter {
    /// Records one rendered frame.
    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Records several rendered frames at once.
    pub fn record_frames(&self, count: u64) {
        self.frames.fetch_add(count, Ordering::Relaxed);
    }

    fn take(&self) -> u64 {
        self.frames.swap(0, Ordering::AcqRel)
    }
}

/// State shared between the sampler handle and its thread.
struct Shared {
    core: Mutex<SamplerCore>,
    probe: Arc<dyn RuntimeProbe>,
    frames: FrameCounter,
    subscribers: Mutex<Vec<Sender<TelemetryEvent>>>,
    channel_capacity: usize,
}

impl Shared {
    fn sample(&self, now: Instant) -> Option<Arc<TelemetrySnapshot>> {
        let (snapshot, alert) = {
            let Ok(mut core) = self.core.lock() else {
                log::error!("Telemetry: sampler state poisoned, skipping tick");
                return None;
            };
            // Frame count and window start are swapped under the same lock.
            let frames = self.frames.take();
            core.tick(frames, now, self.probe.as_ref())
        };

        let snapshot = Arc::new(snapshot);
        log::trace!(
            "Telemetry: sample #{} fps={:.1} memory={:.2}",
            snapshot.sequence,
            snapshot.fps.current,
            snapshot.memory.used_fraction
        );
        self.publish(TelemetryEvent::Sample(Arc::clone(&snapshot)));
        if let Some(alert) = alert {
            self.publish(TelemetryEvent::Alert(alert));
        }
        Some(snapshot)
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut SamplerCore) -> R) -> Option<R> {
        match self.core.lock() {
            Ok(mut core) => Some(f(&mut core)),
            Err(_) => {
                log::error!("Telemetry: sampler state poisoned");
                None
            }
        }
    }

    fn publish(&self, event: TelemetryEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            log::error!("Telemetry: subscriber list poisoned, event dropped");
            return;
        };
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Telemetry: subscriber lagging, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Telemetry: pruning disconnected subscriber");
                false
            }
        });
    }

    fn publish_alert(&self, alert: Option<Alert>) -> Option<Alert> {
        let alert = alert?;
        self.publish(TelemetryEvent::Alert(alert.clone()));
        Some(alert)
    }
}

/// The runtime telemetry sampler.
///
/// Samples at a fixed interval on its own thread once started; `sample` can
/// also be driven manually with an explicit timestamp.
pub struct TelemetrySampler {
    config: SamplerConfig,
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TelemetrySampler {
    /// Creates a new sampler reading runtime signals from `probe`.
    pub fn new(config: SamplerConfig, probe: Arc<dyn RuntimeProbe>) -> Self {
        let shared = Shared {
            core: Mutex::new(SamplerCore::new(&config, Instant::now())),
            probe,
            frames: FrameCounter::default(),
            subscribers: Mutex::new(Vec::new()),
            channel_capacity: config.channel_capacity.max(1),
        };
        Self {
            config,
            shared: Arc::new(shared),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Returns the sampler configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<TelemetryEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.shared.channel_capacity);
        match self.shared.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(_) => log::error!("Telemetry: subscriber list poisoned, subscription is inert"),
        }
        rx
    }

    /// Number of live subscribers (as of the last publication).
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Returns the handle the host uses to report rendered frames.
    pub fn frame_counter(&self) -> FrameCounter {
        self.shared.frames.clone()
    }

    /// Returns `true` while the sampling thread runs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the sampling thread. Does nothing if it already runs.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = Arc::clone(&self.running);
        let shared = Arc::clone(&self.shared);
        let interval = Duration::from_millis(self.config.interval_ms.max(1));
        shared.with_core(|core| core.reset_window(Instant::now()));

        let handle = thread::spawn(move || {
            log::info!("Telemetry sampler thread started.");
            let mut next_tick = Instant::now() + interval;

            while running.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= next_tick {
                    shared.sample(now);
                    next_tick += interval;
                    // Do not try to catch up after a long suspension.
                    if next_tick < now {
                        next_tick = now + interval;
                    }
                    continue;
                }
                thread::sleep((next_tick - now).min(SLEEP_SLICE));
            }
            log::info!("Telemetry sampler thread stopped.");
        });

        self.handle = Some(handle);
    }

    /// Stops and joins the sampling thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Runs one tick at `now` and publishes the result.
    pub fn sample(&self, now: Instant) -> Option<Arc<TelemetrySnapshot>> {
        self.shared.sample(now)
    }

    /// Reports a long main-loop task. Emits an alert between ticks if due.
    pub fn report_long_task(&self, duration_ms: f32, now: Instant) -> Option<Alert> {
        let alert = self
            .shared
            .with_core(|core| core.long_task(duration_ms, now))
            .flatten();
        self.shared.publish_alert(alert)
    }

    /// Reports a layout shift. Emits an alert between ticks if due.
    pub fn report_layout_shift(&self, score: f32, now: Instant) -> Option<Alert> {
        let alert = self
            .shared
            .with_core(|core| core.layout_shift(score, now))
            .flatten();
        self.shared.publish_alert(alert)
    }

    /// Reports a completed network request.
    pub fn report_request(&self, latency_ms: f32, success: bool) {
        self.shared
            .with_core(|core| core.record_request(latency_ms, success));
    }

    /// Returns the most recent snapshot, if any tick ran.
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.shared
            .with_core(|core| core.latest().cloned())
            .flatten()
    }
}

impl Drop for TelemetrySampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::platform::{MemoryReading, NullRuntimeProbe};
    use lumen_core::telemetry::{AlertKind, AlertSeverity};

    struct HighMemory;

    impl RuntimeProbe for HighMemory {
        fn memory(&self) -> Option<MemoryReading> {
            Some(MemoryReading {
                used_bytes: 90,
                limit_bytes: 100,
            })
        }
    }

    #[test]
    fn test_sample_publishes_to_every_subscriber() {
        let sampler = TelemetrySampler::new(SamplerConfig::default(), Arc::new(NullRuntimeProbe));
        let a = sampler.subscribe();
        let b = sampler.subscribe();

        sampler.frame_counter().record_frames(60);
        let snapshot = sampler.sample(Instant::now() + Duration::from_secs(1)).unwrap();

        for rx in [&a, &b] {
            match rx.try_recv() {
                Ok(TelemetryEvent::Sample(s)) => assert_eq!(s.sequence, snapshot.sequence),
                other => panic!("expected a sample, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_disconnected_subscribers_are_pruned() {
        let sampler = TelemetrySampler::new(SamplerConfig::default(), Arc::new(NullRuntimeProbe));
        let keep = sampler.subscribe();
        drop(sampler.subscribe());
        assert_eq!(sampler.subscriber_count(), 2);

        sampler.sample(Instant::now());
        assert_eq!(sampler.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn test_alert_follows_sample() {
        let sampler = TelemetrySampler::new(SamplerConfig::default(), Arc::new(HighMemory));
        let rx = sampler.subscribe();
        sampler.frame_counter().record_frames(60);
        sampler.sample(Instant::now() + Duration::from_secs(1));

        assert!(matches!(rx.try_recv(), Ok(TelemetryEvent::Sample(_))));
        match rx.try_recv() {
            Ok(TelemetryEvent::Alert(alert)) => {
                assert_eq!(alert.kind, AlertKind::HighMemory);
                assert_eq!(alert.severity, AlertSeverity::Critical);
            }
            other => panic!("expected an alert, got {:?}", other),
        }
    }

    #[test]
    fn test_long_task_alert_is_published() {
        let sampler = TelemetrySampler::new(SamplerConfig::default(), Arc::new(NullRuntimeProbe));
        let rx = sampler.subscribe();

        assert!(sampler.report_long_task(300.0, Instant::now()).is_some());
        assert!(matches!(rx.try_recv(), Ok(TelemetryEvent::Alert(_))));
    }

    #[test]
    fn test_start_and_stop() {
        let config = SamplerConfig {
            interval_ms: 10,
            ..SamplerConfig::default()
        };
        let mut sampler = TelemetrySampler::new(config, Arc::new(NullRuntimeProbe));
        let rx = sampler.subscribe();
        let frames = sampler.frame_counter();

        sampler.start();
        assert!(sampler.is_running());
        for _ in 0..5 {
            frames.record_frame();
            thread::sleep(Duration::from_millis(10));
        }
        sampler.stop();
        assert!(!sampler.is_running());

        let samples = rx
            .try_iter()
            .filter(|e| matches!(e, TelemetryEvent::Sample(_)))
            .count();
        assert!(samples >= 1);
        assert!(sampler.latest().is_some());
    }
}
