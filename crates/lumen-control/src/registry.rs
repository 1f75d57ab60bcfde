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

//! Effector registry shared by the controller, its actions and the host.

use lumen_core::config::AdaptiveConfig;
use lumen_core::effector::{Effector, HostEvent, PauseSource};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Shared handle to one registered effector.
pub type SharedEffector = Arc<Mutex<dyn Effector>>;

/// Every registered effect registry, in registration order.
///
/// Cloning the registry shares the same list. An effector whose lock is
/// poisoned is skipped with a log line.
#[derive(Clone, Default)]
pub struct EffectorRegistry {
    entries: Arc<Mutex<Vec<SharedEffector>>>,
}

impl EffectorRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an effector.
    pub fn register(&self, effector: SharedEffector) {
        let name = effector
            .lock()
            .map(|e| e.name().to_string())
            .unwrap_or_else(|_| "<poisoned>".to_string());
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.push(effector);
                log::info!("EffectorRegistry: Registered '{}'", name);
            }
            Err(_) => log::error!("EffectorRegistry: list poisoned, '{}' not registered", name),
        }
    }

    /// Returns the number of registered effectors.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if no effectors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn for_each(&self, mut f: impl FnMut(&mut dyn Effector)) {
        // Clone the list so effectors never run under the registry lock.
        let entries: Vec<SharedEffector> = match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => {
                log::error!("EffectorRegistry: list poisoned");
                return;
            }
        };
        for entry in entries {
            match entry.lock() {
                Ok(mut effector) => f(&mut *effector),
                Err(_) => log::error!("EffectorRegistry: skipping poisoned effector"),
            }
        }
    }

    /// Forwards a host event to every effector.
    pub fn dispatch_host_event(&self, event: HostEvent, now: Instant) {
        log::debug!("EffectorRegistry: host event {:?}", event);
        self.for_each(|e| e.handle_host_event(event, now));
    }

    /// Pushes a new live configuration to every effector.
    pub fn reconfigure_all(&self, config: &AdaptiveConfig, now: Instant) {
        self.for_each(|e| e.update_performance_config(config, now));
    }

    /// Pauses every effect on behalf of `source`.
    pub fn pause_all(&self, source: PauseSource, now: Instant) {
        self.for_each(|e| e.pause_all(source, now));
    }

    /// Lifts the pause held by `source` and resumes every visible effect
    /// no other source keeps paused.
    pub fn resume_visible(&self, source: PauseSource, now: Instant) {
        self.for_each(|e| e.resume_visible(source, now));
    }

    /// Runs deferred effector work.
    pub fn poll_all(&self, now: Instant) {
        self.for_each(|e| e.poll(now));
    }

    /// Total number of running effects.
    pub fn active_count(&self) -> usize {
        let mut total = 0;
        self.for_each(|e| total += e.active_count());
        total
    }
}
