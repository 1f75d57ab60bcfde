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

//! The capability interface implemented by every effect registry.

use crate::config::AdaptiveConfig;
use std::fmt;
use std::time::Instant;

/// Opaque reference to a visual element owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub String);

impl ElementRef {
    /// Creates a new element reference from a host selector or id.
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Returns the underlying selector.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A global host-level event delivered straight to the effectors.
///
/// These bypass the adaptive controller entirely; they are the immediate
/// safety path for focus, visibility and power changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// The window lost focus.
    Blur,
    /// The window regained focus.
    Focus,
    /// The page became hidden.
    Hidden,
    /// The page became visible again.
    Visible,
    /// The battery reached a critical level.
    BatteryCritical,
    /// The viewport was resized.
    Resize,
    /// The user started scrolling.
    ScrollStart,
    /// Scrolling settled.
    ScrollEnd,
}

impl HostEvent {
    /// Returns `true` if the event should pause every effect.
    pub fn pauses(&self) -> bool {
        matches!(
            self,
            HostEvent::Blur | HostEvent::Hidden | HostEvent::BatteryCritical | HostEvent::ScrollStart
        )
    }
}

/// Who asked for a global pause.
///
/// Registries track each source separately: effects run again only once
/// every source that paused them has resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseSource {
    /// Host events and direct registry calls (focus, visibility, power).
    Host,
    /// The adaptive controller (`pause_all_effects`).
    Controller,
}

/// An effect registry: performs visual effects, makes no adaptation decisions.
///
/// Every method is infallible from the caller's point of view. Failures of the
/// underlying native effect are handled inside the registry (logged, then
/// healed on a later [`poll`](Effector::poll)).
pub trait Effector: Send {
    /// Returns a human-readable name for logging.
    fn name(&self) -> &str;

    /// Pauses every running effect immediately on behalf of `source`.
    fn pause_all(&mut self, source: PauseSource, now: Instant);

    /// Lifts the pause held by `source`. Effects whose element is visible
    /// start again unless another source still holds a pause.
    fn resume_visible(&mut self, source: PauseSource, now: Instant);

    /// Re-reads the live configuration. Effects whose relevant settings
    /// changed are paused and restarted after a short grace delay.
    fn update_performance_config(&mut self, config: &AdaptiveConfig, now: Instant);

    /// Runs deferred work whose deadline has passed (grace restarts, recovery).
    fn poll(&mut self, now: Instant);

    /// Number of effects currently running.
    fn active_count(&self) -> usize;

    /// Reacts to a host-level event. The default maps pausing events to
    /// [`pause_all`](Effector::pause_all) and the rest to
    /// [`resume_visible`](Effector::resume_visible).
    fn handle_host_event(&mut self, event: HostEvent, now: Instant) {
        if event.pauses() {
            self.pause_all(PauseSource::Host, now);
        } else {
            self.resume_visible(PauseSource::Host, now);
        }
    }
}
