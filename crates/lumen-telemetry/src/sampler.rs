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

//! The per-tick sampling logic, free of threads and timers.

use crate::alerts::AlertLimiter;
use crate::metrics::RingBuffer;
use lumen_core::platform::RuntimeProbe;
use lumen_core::telemetry::{
    Alert, AlertKind, AlertSeverity, BatteryMetrics, FpsMetrics, HealthStatus, MemoryMetrics,
    NetworkMetrics, RenderTiming, TelemetrySnapshot, ThresholdConfig,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Frame rate assumed before the first frame window is measured.
const NOMINAL_FPS: f32 = 60.0;

/// Share of a frame attributed to layout, paint and animation work.
const LAYOUT_SHARE: f32 = 0.2;
const PAINT_SHARE: f32 = 0.3;
const ANIMATION_SHARE: f32 = 0.5;

/// Configuration of the telemetry sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Sampling period in milliseconds.
    pub interval_ms: u64,
    /// Number of samples kept in each metric history.
    pub history_capacity: usize,
    /// Minimum spacing between two alerts of any kind.
    pub alert_window_ms: u64,
    /// Capacity of each subscriber channel. Events are dropped when full.
    pub channel_capacity: usize,
    /// Warning and critical thresholds.
    pub thresholds: ThresholdConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            history_capacity: 60,
            alert_window_ms: 5000,
            channel_capacity: 256,
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Mutable sampler state. Every transition takes an explicit timestamp.
#[derive(Debug)]
pub struct SamplerCore {
    thresholds: ThresholdConfig,
    limiter: AlertLimiter,
    last_tick: Instant,
    sequence: u64,

    fps: f32,
    fps_history: RingBuffer,
    memory: MemoryMetrics,
    memory_history: RingBuffer,
    network: NetworkMetrics,
    pending_latency_ms: f32,
    pending_requests: u32,
    battery: BatteryMetrics,
    last_battery: Option<(Instant, f32)>,

    latest: Option<TelemetrySnapshot>,
}

impl SamplerCore {
    /// Creates a fresh sampler state starting its first window at `now`.
    pub fn new(config: &SamplerConfig, now: Instant) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            limiter: AlertLimiter::new(Duration::from_millis(config.alert_window_ms)),
            last_tick: now,
            sequence: 0,
            fps: NOMINAL_FPS,
            fps_history: RingBuffer::new(config.history_capacity),
            memory: MemoryMetrics::default(),
            memory_history: RingBuffer::new(config.history_capacity),
            network: NetworkMetrics::default(),
            pending_latency_ms: 0.0,
            pending_requests: 0,
            battery: BatteryMetrics::default(),
            last_battery: None,
            latest: None,
        }
    }

    /// Returns the thresholds in use.
    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Restarts the frame window at `now` without producing a sample.
    pub fn reset_window(&mut self, now: Instant) {
        self.last_tick = now;
    }

    /// Runs one sampling tick.
    ///
    /// `frames` is the number of frames counted since the previous tick. A
    /// window without frames carries no frame-rate information (the host was
    /// suspended) and leaves the frame rate unchanged.
    pub fn tick(
        &mut self,
        frames: u64,
        now: Instant,
        probe: &dyn RuntimeProbe,
    ) -> (TelemetrySnapshot, Option<Alert>) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.sequence += 1;

        // ── 1. Frame rate ──
        if frames > 0 && !elapsed.is_zero() {
            self.fps = frames as f32 / elapsed.as_secs_f32();
            self.fps_history.push(self.fps);
        } else {
            log::trace!("Telemetry: no frames in window, frame rate unchanged");
        }

        // ── 2. Memory ──
        if let Some(reading) = probe.memory() {
            self.memory.used_bytes = reading.used_bytes;
            self.memory.limit_bytes = reading.limit_bytes;
            self.memory.used_fraction = reading.fraction();
            self.memory_history.push(self.memory.used_fraction);
        }

        // ── 3. Network ──
        if self.pending_requests > 0 {
            self.network.latency_ms = self.pending_latency_ms / self.pending_requests as f32;
            self.pending_latency_ms = 0.0;
            self.pending_requests = 0;
        } else if let Some(reading) = probe.network() {
            self.network.latency_ms = reading.latency_ms;
        }
        if let Some(reading) = probe.network() {
            self.network.bandwidth_mbps = reading.bandwidth_mbps;
        }

        // ── 4. Battery ──
        if let Some(status) = probe.battery() {
            self.update_battery(status.level, status.charging, now);
        }

        let snapshot = self.build_snapshot(now);
        let alert = self.select_alert(&snapshot, now);
        self.latest = Some(snapshot.clone());
        (snapshot, alert)
    }

    fn update_battery(&mut self, level: f32, charging: bool, now: Instant) {
        if charging {
            self.battery.discharge_rate_per_hour = 0.0;
            self.last_battery = None;
        } else {
            match self.last_battery {
                Some((at, previous)) if level < previous => {
                    let hours = now.saturating_duration_since(at).as_secs_f32() / 3600.0;
                    if hours > 0.0 {
                        self.battery.discharge_rate_per_hour = (previous - level) / hours;
                    }
                    self.last_battery = Some((now, level));
                }
                Some((_, previous)) if level == previous => {}
                _ => self.last_battery = Some((now, level)),
            }
        }
        self.battery.level = level.clamp(0.0, 1.0);
        self.battery.charging = charging;
    }

    fn build_snapshot(&self, now: Instant) -> TelemetrySnapshot {
        let fps = FpsMetrics {
            current: self.fps,
            average: self.fps_history.average(),
            min: self.fps_history.min(),
            max: self.fps_history.max(),
            history: self.fps_history.to_vec(),
        };
        let memory = MemoryMetrics {
            history: self.memory_history.to_vec(),
            ..self.memory.clone()
        };

        let frame_ms = if self.fps > 0.0 { 1000.0 / self.fps } else { 0.0 };
        let timing = RenderTiming {
            layout_ms: frame_ms * LAYOUT_SHARE,
            paint_ms: frame_ms * PAINT_SHARE,
            animation_ms: frame_ms * ANIMATION_SHARE,
        };

        let fps_deficit = (1.0 - self.fps / NOMINAL_FPS).clamp(0.0, 1.0);
        let system_load = (0.6 * fps_deficit + 0.4 * self.memory.used_fraction).clamp(0.0, 1.0);

        let status = HealthStatus {
            fps: self.thresholds.fps_status(self.fps),
            memory: self.thresholds.memory_status(self.memory.used_fraction),
            network: self.thresholds.network_status(self.network.latency_ms),
            battery: self
                .thresholds
                .battery_status(self.battery.level, self.battery.charging),
        };

        TelemetrySnapshot {
            timestamp: now,
            sequence: self.sequence,
            fps,
            memory,
            timing,
            network: self.network,
            battery: self.battery,
            system_load,
            status,
        }
    }

    /// Picks the single most severe degraded metric, then asks the limiter.
    fn select_alert(&mut self, snapshot: &TelemetrySnapshot, now: Instant) -> Option<Alert> {
        let candidates = [
            (AlertKind::LowFps, snapshot.status.fps, snapshot.fps.current as f64),
            (
                AlertKind::HighMemory,
                snapshot.status.memory,
                snapshot.memory.used_fraction as f64,
            ),
            (
                AlertKind::SlowNetwork,
                snapshot.status.network,
                snapshot.network.latency_ms as f64,
            ),
            (
                AlertKind::LowBattery,
                snapshot.status.battery,
                snapshot.battery.level as f64,
            ),
        ];

        let mut chosen: Option<(AlertKind, AlertSeverity, f64)> = None;
        for (kind, status, value) in candidates {
            let Some(severity) = status.alert_severity() else {
                continue;
            };
            if chosen.map_or(true, |(_, best, _)| severity > best) {
                chosen = Some((kind, severity, value));
            }
        }

        let (kind, severity, value) = chosen?;
        self.admit(Alert {
            kind,
            severity,
            value,
            timestamp: now,
        })
    }

    fn admit(&mut self, alert: Alert) -> Option<Alert> {
        if self.limiter.admit(alert.timestamp) {
            log::warn!("Telemetry: {}", alert);
            Some(alert)
        } else {
            log::debug!("Telemetry: alert suppressed by rate limit: {}", alert);
            None
        }
    }

    /// Classifies a long main-loop task and returns an alert if one is due.
    pub fn long_task(&mut self, duration_ms: f32, now: Instant) -> Option<Alert> {
        let severity = self.thresholds.long_task_severity(duration_ms)?;
        self.admit(Alert {
            kind: AlertKind::LongTask,
            severity,
            value: duration_ms as f64,
            timestamp: now,
        })
    }

    /// Classifies a layout shift score and returns an alert if one is due.
    pub fn layout_shift(&mut self, score: f32, now: Instant) -> Option<Alert> {
        let severity = self.thresholds.layout_shift_severity(score)?;
        self.admit(Alert {
            kind: AlertKind::LayoutShift,
            severity,
            value: score as f64,
            timestamp: now,
        })
    }

    /// Accounts for a completed network request.
    pub fn record_request(&mut self, latency_ms: f32, success: bool) {
        self.network.requests_total += 1;
        if !success {
            self.network.requests_failed += 1;
        }
        self.pending_latency_ms += latency_ms.max(0.0);
        self.pending_requests += 1;
    }

    /// Returns the most recent snapshot.
    pub fn latest(&self) -> Option<&TelemetrySnapshot> {
        self.latest.as_ref()
    }
}
