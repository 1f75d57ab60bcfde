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

//! The adaptive controller state machine.
//!
//! `idle → evaluating → adapting → cooling_down → idle`. Every entry point
//! takes an explicit timestamp so gating is re-checked on each call.

use crate::actions::ActionExecutor;
use crate::analysis::{AnalysisConfig, Finding, HealthAnalyzer};
use crate::registry::EffectorRegistry;
use lumen_core::config::{AdaptiveConfig, LiveConfig};
use lumen_core::control::{
    AdaptationAction, AdaptationReason, AdaptationRecord, AdaptationSeverity, AdaptationTrigger,
    StateSnapshot,
};
use lumen_core::effector::PauseSource;
use lumen_core::profile::PerformanceTier;
use lumen_core::resource::CacheControl;
use lumen_core::telemetry::{Alert, AlertKind, TelemetrySnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

const ONE_HOUR: Duration = Duration::from_secs(3600);

/// Where the controller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Waiting for the next evaluation.
    Idle,
    /// Reading the latest health analysis.
    Evaluating,
    /// Running the actions of an adaptation.
    Adapting,
    /// Ignoring scheduled evaluations until the cooldown ends.
    CoolingDown,
}

/// Configuration of the adaptive controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Interval between scheduled evaluations.
    pub adaptation_interval_ms: u64,
    /// Cooldown after a medium adaptation; scaled by severity.
    pub base_cooldown_ms: u64,
    /// Most adaptations allowed within `rate_window_ms`.
    pub max_adaptations: usize,
    /// Trailing window of the rate limit.
    pub rate_window_ms: u64,
    /// Health analysis settings.
    pub analysis: AnalysisConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            adaptation_interval_ms: 5000,
            base_cooldown_ms: 10_000,
            max_adaptations: 3,
            rate_window_ms: 60_000,
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Aggregated view of past adaptations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationStatistics {
    /// Adaptations since start or the last reset.
    pub total: usize,
    /// Adaptations in the last hour.
    pub last_hour: usize,
    /// Count per reason.
    pub by_reason: BTreeMap<String, usize>,
    /// Count per severity.
    pub by_severity: BTreeMap<String, usize>,
    /// Actions that failed across all adaptations.
    pub failed_actions: usize,
    /// Current state.
    pub state: ControllerState,
    /// Time left in the current cooldown.
    pub cooldown_remaining_ms: u64,
    /// Reason waiting for the cooldown to end, if any.
    pub deferred: Option<AdaptationReason>,
    /// Latest health score.
    pub health_score: f32,
    /// Active tier.
    pub tier: PerformanceTier,
}

/// Decides when and how hard to degrade, then applies the decision.
pub struct AdaptiveController {
    config: ControllerConfig,
    live: LiveConfig,
    effectors: EffectorRegistry,
    executor: ActionExecutor,
    analyzer: HealthAnalyzer,
    state: ControllerState,
    tier: PerformanceTier,
    next_evaluation: Option<Instant>,
    cooldown_until: Option<Instant>,
    deferred: Option<Finding>,
    recent: VecDeque<Instant>,
    history: Vec<AdaptationRecord>,
    failed_actions: usize,
    by_reason: BTreeMap<String, usize>,
    by_severity: BTreeMap<String, usize>,
    effects_paused: bool,
}

impl AdaptiveController {
    /// Creates a controller over the live configuration, the effectors and,
    /// optionally, the resource cache.
    pub fn new(
        config: ControllerConfig,
        live: LiveConfig,
        effectors: EffectorRegistry,
        cache: Option<Arc<dyn CacheControl>>,
    ) -> Self {
        let tier = live.read(|c| c.tier);
        Self {
            analyzer: HealthAnalyzer::new(config.analysis.clone()),
            executor: ActionExecutor::new(effectors.clone(), cache),
            config,
            live,
            effectors,
            state: ControllerState::Idle,
            tier,
            next_evaluation: None,
            cooldown_until: None,
            deferred: None,
            recent: VecDeque::new(),
            history: Vec::new(),
            failed_actions: 0,
            by_reason: BTreeMap::new(),
            by_severity: BTreeMap::new(),
            effects_paused: false,
        }
    }

    /// Installs the baseline of `tier` and schedules the first evaluation.
    pub fn init(&mut self, tier: PerformanceTier, now: Instant) {
        self.set_tier(tier, now);
        self.next_evaluation = Some(now + self.interval());
        log::info!(
            "Controller: initialised for {} tier, evaluating every {:?}",
            tier,
            self.interval()
        );
    }

    /// Returns the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the live configuration handle.
    pub fn live_config(&self) -> &LiveConfig {
        &self.live
    }

    /// Returns the effector registry.
    pub fn effectors(&self) -> &EffectorRegistry {
        &self.effectors
    }

    /// Returns the health analysis.
    pub fn analyzer(&self) -> &HealthAnalyzer {
        &self.analyzer
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Active tier.
    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Adaptation records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &AdaptationRecord> {
        self.history.iter()
    }

    /// The adaptation waiting for the cooldown to end, if any.
    pub fn deferred(&self) -> Option<Finding> {
        self.deferred
    }

    /// Returns `true` while a cooldown runs at `now`.
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Time left in the current cooldown.
    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.adaptation_interval_ms)
    }

    // ── Inputs ───────────────────────────────────────────────────────────

    /// Folds a telemetry sample and runs the proactive trend check.
    pub fn on_sample(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: Instant,
    ) -> Option<AdaptationRecord> {
        self.analyzer.observe(snapshot);
        if let Some(record) = self.expire_cooldown(now) {
            return Some(record);
        }
        if self.is_cooling_down(now) || self.deferred.is_some() {
            return None;
        }
        let finding = self.analyzer.trend()?;
        self.adapt(finding, AdaptationTrigger::Proactive, now)
    }

    /// Reacts to a telemetry alert.
    ///
    /// Critical alerts adapt at once, or wait in the single deferred slot
    /// while a cooldown runs. Warnings are left to the scheduled evaluation.
    pub fn on_alert(&mut self, alert: &Alert, now: Instant) -> Option<AdaptationRecord> {
        if !alert.is_critical() {
            log::debug!("Controller: ignoring non-critical alert {}", alert);
            return None;
        }
        let finding = Finding {
            reason: reason_for_alert(alert.kind),
            severity: AdaptationSeverity::High,
        };

        let applied = self.expire_cooldown(now);
        if self.is_cooling_down(now) || self.deferred.is_some() {
            self.defer(finding, now);
            return applied;
        }
        self.adapt(finding, AdaptationTrigger::Alert, now)
    }

    /// Advances the state machine.
    ///
    /// A no-op while cooling down. Once the cooldown has ended, a deferred
    /// adaptation takes precedence over the scheduled evaluation.
    pub fn tick(&mut self, now: Instant) -> Option<AdaptationRecord> {
        if let Some(record) = self.expire_cooldown(now) {
            return Some(record);
        }
        if self.is_cooling_down(now) || self.deferred.is_some() {
            return None;
        }

        if self.next_evaluation.is_some_and(|next| now < next) {
            return None;
        }
        self.next_evaluation = Some(now + self.interval());

        self.state = ControllerState::Evaluating;
        match self.analyzer.evaluate() {
            Some(finding) => self.adapt(finding, AdaptationTrigger::Scheduled, now),
            None => {
                self.state = ControllerState::Idle;
                None
            }
        }
    }

    /// Forces an adaptation. Bypasses the cooldown, not the rate limit.
    ///
    /// A deferred adaptation whose cooldown already ended runs first.
    pub fn manual_adaptation(
        &mut self,
        reason: AdaptationReason,
        severity: AdaptationSeverity,
        now: Instant,
    ) -> Option<AdaptationRecord> {
        self.expire_cooldown(now);
        log::info!("Controller: manual {} ({}) requested", reason, severity);
        self.adapt(Finding { reason, severity }, AdaptationTrigger::Manual, now)
    }

    // ── Configuration ────────────────────────────────────────────────────

    /// Replaces the live configuration with the baseline of `tier`.
    pub fn set_tier(&mut self, tier: PerformanceTier, now: Instant) {
        self.tier = tier;
        self.install(AdaptiveConfig::for_tier(tier), now);
        log::info!("Controller: switched to {} tier", tier);
    }

    /// Clears history, counters, deferred work, rate limit and cooldown, and
    /// restores the tier baseline.
    pub fn reset_adaptations(&mut self, now: Instant) {
        self.history.clear();
        self.recent.clear();
        self.failed_actions = 0;
        self.by_reason.clear();
        self.by_severity.clear();
        self.deferred = None;
        self.cooldown_until = None;
        self.analyzer.reset();
        self.install(AdaptiveConfig::for_tier(self.tier), now);
        if std::mem::take(&mut self.effects_paused) {
            self.effectors.resume_visible(PauseSource::Controller, now);
        }
        self.state = ControllerState::Idle;
        self.next_evaluation = Some(now + self.interval());
        log::info!("Controller: adaptations reset to {} tier defaults", self.tier);
    }

    fn install(&self, config: AdaptiveConfig, now: Instant) {
        self.live.replace(config.clone());
        self.effectors.reconfigure_all(&config, now);
    }

    // ── Reporting ────────────────────────────────────────────────────────

    /// Latest health score (100 before any sample).
    pub fn health_score(&self) -> f32 {
        self.analyzer.health_score()
    }

    /// Aggregates the adaptation history.
    pub fn statistics(&self, now: Instant) -> AdaptationStatistics {
        AdaptationStatistics {
            total: self.history.len(),
            last_hour: self
                .history
                .iter()
                .filter(|r| now.saturating_duration_since(r.timestamp) <= ONE_HOUR)
                .count(),
            by_reason: self.by_reason.clone(),
            by_severity: self.by_severity.clone(),
            failed_actions: self.failed_actions,
            state: self.state,
            cooldown_remaining_ms: self.cooldown_remaining(now).as_millis() as u64,
            deferred: self.deferred.map(|f| f.reason),
            health_score: self.health_score(),
            tier: self.tier,
        }
    }

    fn state_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            config: self.live.snapshot(),
            health_score: self.health_score(),
            cached_resources: self.executor.cache().map(|c| c.cached_count()).unwrap_or(0),
        }
    }

    // ── Adaptation ───────────────────────────────────────────────────────

    /// Ends a cooldown whose deadline has passed, then applies the deferred
    /// adaptation, if any. Every entry point runs this first.
    fn expire_cooldown(&mut self, now: Instant) -> Option<AdaptationRecord> {
        match self.cooldown_until {
            Some(until) if now < until => return None,
            Some(_) => self.end_cooldown(now),
            None => {}
        }
        let finding = self.deferred.take()?;
        self.adapt(finding, AdaptationTrigger::Deferred, now)
    }

    fn end_cooldown(&mut self, now: Instant) {
        self.cooldown_until = None;
        self.state = ControllerState::Idle;
        log::debug!("Controller: cooldown over");
        if std::mem::take(&mut self.effects_paused) {
            log::info!("Controller: lifting the effect pause");
            self.effectors.resume_visible(PauseSource::Controller, now);
        }
    }

    /// Holds `finding` in the single deferred slot. A held finding of higher
    /// severity is kept.
    fn defer(&mut self, finding: Finding, now: Instant) {
        match self.deferred {
            Some(pending) if pending.severity > finding.severity => {}
            _ => {
                log::info!(
                    "Controller: deferring {} (cooldown {:?} left)",
                    finding.reason,
                    self.cooldown_remaining(now)
                );
                self.deferred = Some(finding);
            }
        }
    }

    fn rate_limited(&mut self, now: Instant) -> bool {
        let window = Duration::from_millis(self.config.rate_window_ms);
        while self
            .recent
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= window)
        {
            self.recent.pop_front();
        }
        self.recent.len() >= self.config.max_adaptations
    }

    fn adapt(
        &mut self,
        finding: Finding,
        trigger: AdaptationTrigger,
        now: Instant,
    ) -> Option<AdaptationRecord> {
        if self.rate_limited(now) {
            log::warn!(
                "Controller: rate limit reached ({} in {} ms), skipping {}",
                self.recent.len(),
                self.config.rate_window_ms,
                finding.reason
            );
            if trigger == AdaptationTrigger::Deferred {
                self.defer(finding, now);
            }
            self.state = if self.is_cooling_down(now) {
                ControllerState::CoolingDown
            } else {
                ControllerState::Idle
            };
            return None;
        }

        // ── 1. Run Actions ───────────────────────────────────────────────
        self.state = ControllerState::Adapting;
        let before = self.state_snapshot();
        let mut working = before.config.clone();
        let actions = self
            .executor
            .execute(finding.reason.actions(), &mut working, now);
        self.install(working, now);

        if actions
            .iter()
            .any(|a| a.action == AdaptationAction::PauseAllEffects && a.succeeded)
        {
            self.effects_paused = true;
        }

        // ── 2. Record ────────────────────────────────────────────────────
        let record = AdaptationRecord {
            timestamp: now,
            reason: finding.reason,
            severity: finding.severity,
            trigger,
            actions,
            before,
            after: self.state_snapshot(),
        };
        self.failed_actions += record.failed_actions();
        *self
            .by_reason
            .entry(finding.reason.as_str().to_string())
            .or_default() += 1;
        *self
            .by_severity
            .entry(finding.severity.as_str().to_string())
            .or_default() += 1;
        self.recent.push_back(now);
        self.history.push(record.clone());

        // ── 3. Cool Down ─────────────────────────────────────────────────
        let cooldown = Duration::from_millis(self.config.base_cooldown_ms)
            .mul_f32(finding.severity.cooldown_multiplier());
        self.cooldown_until = Some(now + cooldown);
        self.state = ControllerState::CoolingDown;

        log::info!(
            "Controller: adapted for {} ({}, {:?}): {} actions, {} failed, cooling down {:?}",
            finding.reason,
            finding.severity,
            trigger,
            record.actions.len(),
            record.failed_actions(),
            cooldown
        );
        Some(record)
    }
}

/// Maps an alert to the reason it adapts for.
fn reason_for_alert(kind: AlertKind) -> AdaptationReason {
    match kind {
        AlertKind::LowFps | AlertKind::LongTask | AlertKind::LayoutShift => {
            AdaptationReason::FpsDrop
        }
        AlertKind::HighMemory => AdaptationReason::MemoryPressure,
        AlertKind::SlowNetwork => AdaptationReason::NetworkSlow,
        AlertKind::LowBattery => AdaptationReason::BatteryLow,
    }
}
