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

//! Bookkeeping shared by the slider and animation registries.

use crate::driver::EffectDriver;
use crate::error::{EffectError, EffectResult};
use lumen_core::effector::{ElementRef, PauseSource};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Recovery attempts made for a failing effect before it is left alone.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Timing of deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableTiming {
    /// Delay before an effect paused by reconfiguration is restarted.
    pub grace: Duration,
    /// Delay before a failed effect is torn down and recreated.
    pub recovery: Duration,
}

impl Default for TableTiming {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(150),
            recovery: Duration::from_secs(2),
        }
    }
}

/// One registered effect.
pub struct EffectHandle<S> {
    id: String,
    element: ElementRef,
    settings: S,
    driver: Option<Box<dyn EffectDriver<S>>>,
    active: bool,
    last_interaction: Option<Instant>,
    interactions: u64,
    restart_at: Option<Instant>,
    recover_at: Option<Instant>,
    recovery_attempts: u32,
}

impl<S> EffectHandle<S> {
    /// The effect id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The element the effect is bound to.
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// The settings the effect runs with.
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Whether the effect is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// When the user last interacted with the effect.
    pub fn last_interaction(&self) -> Option<Instant> {
        self.last_interaction
    }

    /// How many interactions were recorded.
    pub fn interactions(&self) -> u64 {
        self.interactions
    }

    /// Whether a grace restart is scheduled.
    pub fn restart_pending(&self) -> bool {
        self.restart_at.is_some()
    }

    /// Whether a recovery is scheduled.
    pub fn recovery_pending(&self) -> bool {
        self.recover_at.is_some()
    }
}

/// The handles of one registry, keyed by id, plus element visibility.
pub struct EffectTable<S> {
    name: &'static str,
    timing: TableTiming,
    handles: BTreeMap<String, EffectHandle<S>>,
    visibility: HashMap<ElementRef, bool>,
    paused_by: HashSet<PauseSource>,
}

impl<S: Clone + PartialEq> EffectTable<S> {
    /// Creates an empty table. `name` prefixes log lines.
    pub fn new(name: &'static str, timing: TableTiming) -> Self {
        Self {
            name,
            timing,
            handles: BTreeMap::new(),
            visibility: HashMap::new(),
            paused_by: HashSet::new(),
        }
    }

    /// Number of registered effects.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no effect is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns `true` if the id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Looks up a handle.
    pub fn get(&self, id: &str) -> Option<&EffectHandle<S>> {
        self.handles.get(id)
    }

    /// Iterates over the handles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectHandle<S>> {
        self.handles.values()
    }

    /// Number of running effects.
    pub fn active_count(&self) -> usize {
        self.handles.values().filter(|h| h.active).count()
    }

    /// Returns `true` while any source holds a global pause.
    pub fn is_paused_globally(&self) -> bool {
        !self.paused_by.is_empty()
    }

    /// Returns `true` while `source` holds a global pause.
    pub fn is_paused_by(&self, source: PauseSource) -> bool {
        self.paused_by.contains(&source)
    }

    /// Known visibility of an element. `None` means never reported.
    pub fn visibility(&self, element: &ElementRef) -> Option<bool> {
        self.visibility.get(element).copied()
    }

    /// Whether an element is visible or has never reported otherwise.
    pub fn is_visible_or_unknown(&self, element: &ElementRef) -> bool {
        self.visibility(element).unwrap_or(true)
    }

    /// Adds a handle. Returns `false` if the id is already taken.
    pub fn insert(
        &mut self,
        id: &str,
        element: ElementRef,
        settings: S,
        driver: Box<dyn EffectDriver<S>>,
    ) -> bool {
        if self.handles.contains_key(id) {
            return false;
        }
        self.handles.insert(
            id.to_string(),
            EffectHandle {
                id: id.to_string(),
                element,
                settings,
                driver: Some(driver),
                active: false,
                last_interaction: None,
                interactions: 0,
                restart_at: None,
                recover_at: None,
                recovery_attempts: 0,
            },
        );
        true
    }

    /// Tears down and removes a handle.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.handles.remove(id) {
            Some(mut handle) => {
                if let Some(mut driver) = handle.driver.take() {
                    driver.teardown();
                }
                true
            }
            None => false,
        }
    }

    /// Starts one effect now. Returns `true` if it is running afterwards.
    pub fn start(&mut self, id: &str, now: Instant) -> bool {
        let name = self.name;
        let recovery = self.timing.recovery;
        match self.handles.get_mut(id) {
            Some(handle) => start_handle(name, recovery, handle, now),
            None => false,
        }
    }

    /// Pauses one effect. Returns `false` if the id is unknown.
    pub fn pause(&mut self, id: &str, now: Instant) -> bool {
        let name = self.name;
        let recovery = self.timing.recovery;
        match self.handles.get_mut(id) {
            Some(handle) => {
                pause_handle(name, recovery, handle, now);
                handle.restart_at = None;
                true
            }
            None => false,
        }
    }

    /// Pauses every effect on behalf of `source` and cancels pending restarts.
    pub fn pause_all(&mut self, source: PauseSource, now: Instant) {
        self.paused_by.insert(source);
        for handle in self.handles.values_mut() {
            pause_handle(self.name, self.timing.recovery, handle, now);
            handle.restart_at = None;
        }
    }

    /// Lifts the pause held by `source`. Once no pause remains, starts every
    /// effect whose element is visible or unknown.
    pub fn resume_visible(&mut self, source: PauseSource, now: Instant) {
        self.paused_by.remove(&source);
        if self.is_paused_globally() {
            log::debug!(
                "{}: {:?} pause lifted, still paused by {:?}",
                self.name,
                source,
                self.paused_by
            );
            return;
        }
        for handle in self.handles.values_mut() {
            if handle.active || handle.recover_at.is_some() {
                continue;
            }
            if self.visibility.get(&handle.element).copied().unwrap_or(true) {
                start_handle(self.name, self.timing.recovery, handle, now);
            }
        }
    }

    /// Records the visibility of an element and pauses or starts the
    /// effects bound to it.
    pub fn set_visibility(&mut self, element: &ElementRef, visible: bool, now: Instant) {
        self.visibility.insert(element.clone(), visible);
        for handle in self.handles.values_mut() {
            if &handle.element != element {
                continue;
            }
            if !visible {
                pause_handle(self.name, self.timing.recovery, handle, now);
            } else if self.paused_by.is_empty() && !handle.active && handle.recover_at.is_none() {
                start_handle(self.name, self.timing.recovery, handle, now);
            }
        }
    }

    /// Counts a user interaction with an effect.
    pub fn record_interaction(&mut self, id: &str, now: Instant) -> bool {
        match self.handles.get_mut(id) {
            Some(handle) => {
                handle.interactions += 1;
                handle.last_interaction = Some(now);
                true
            }
            None => false,
        }
    }

    /// Applies new settings. Running effects whose settings changed are
    /// paused and scheduled for a restart after the grace delay. Returns the
    /// number of effects scheduled.
    pub fn reconfigure(
        &mut self,
        now: Instant,
        mut settings_for: impl FnMut(&str, &S) -> S,
    ) -> usize {
        let mut scheduled = 0;
        for handle in self.handles.values_mut() {
            let next = settings_for(&handle.id, &handle.settings);
            if next == handle.settings {
                continue;
            }
            handle.settings = next;
            if handle.active {
                pause_handle(self.name, self.timing.recovery, handle, now);
                if handle.recover_at.is_none() {
                    handle.restart_at = Some(now + self.timing.grace);
                    scheduled += 1;
                }
            }
        }
        if scheduled > 0 {
            log::debug!(
                "{}: {} effects restarting in {:?}",
                self.name,
                scheduled,
                self.timing.grace
            );
        }
        scheduled
    }

    /// Runs due grace restarts and recoveries.
    ///
    /// `recreate` builds a fresh driver for a handle under recovery.
    pub fn poll(
        &mut self,
        now: Instant,
        mut recreate: impl FnMut(&EffectHandle<S>) -> EffectResult<Box<dyn EffectDriver<S>>>,
    ) {
        for handle in self.handles.values_mut() {
            let visible = self.visibility.get(&handle.element).copied().unwrap_or(true);

            if handle.restart_at.is_some_and(|at| at <= now) {
                handle.restart_at = None;
                if visible && self.paused_by.is_empty() {
                    start_handle(self.name, self.timing.recovery, handle, now);
                }
            }

            if handle.recover_at.is_some_and(|at| at <= now) {
                handle.recover_at = None;
                handle.recovery_attempts += 1;
                if let Some(mut old) = handle.driver.take() {
                    old.teardown();
                }
                match recreate(handle) {
                    Ok(driver) => {
                        log::info!("{}: recovered '{}'", self.name, handle.id);
                        handle.driver = Some(driver);
                        if visible && self.paused_by.is_empty() {
                            start_handle(self.name, self.timing.recovery, handle, now);
                        }
                    }
                    Err(e) => schedule_recovery(self.name, self.timing.recovery, handle, now, e),
                }
            }
        }
    }

    /// Tears down and removes every handle matching `predicate`.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&EffectHandle<S>) -> bool) -> usize {
        let ids: Vec<String> = self
            .handles
            .values()
            .filter(|h| predicate(h))
            .map(|h| h.id.clone())
            .collect();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }
}

fn start_handle<S>(
    name: &str,
    recovery: Duration,
    handle: &mut EffectHandle<S>,
    now: Instant,
) -> bool {
    if handle.active {
        return true;
    }
    let Some(driver) = handle.driver.as_mut() else {
        return false;
    };
    match driver.start(&handle.settings) {
        Ok(()) => {
            handle.active = true;
            handle.restart_at = None;
            handle.recovery_attempts = 0;
            true
        }
        Err(e) => {
            schedule_recovery(name, recovery, handle, now, e);
            false
        }
    }
}

fn pause_handle<S>(name: &str, recovery: Duration, handle: &mut EffectHandle<S>, now: Instant) {
    if !handle.active {
        return;
    }
    handle.active = false;
    if let Some(Err(e)) = handle.driver.as_mut().map(|driver| driver.pause()) {
        schedule_recovery(name, recovery, handle, now, e);
    }
}

fn schedule_recovery<S>(
    name: &str,
    recovery: Duration,
    handle: &mut EffectHandle<S>,
    now: Instant,
    error: EffectError,
) {
    handle.active = false;
    if handle.recovery_attempts >= MAX_RECOVERY_ATTEMPTS {
        log::error!(
            "{}: {} (giving up after {} recovery attempts)",
            name,
            error,
            handle.recovery_attempts
        );
        handle.recover_at = None;
        return;
    }
    log::warn!("{}: {}, recovering in {:?}", name, error, recovery);
    if handle.recover_at.is_none() {
        handle.recover_at = Some(now + recovery);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Script;
    use super::*;

    fn table_with(script: &Script, ids: &[&str]) -> EffectTable<u32> {
        let mut table = EffectTable::new("Test", TableTiming::default());
        for id in ids {
            assert!(table.insert(id, ElementRef::new(format!("#{id}")), 1, script.driver(id)));
        }
        table
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let script = Script::default();
        let mut table = table_with(&script, &["a"]);
        assert!(!table.insert("a", ElementRef::new("#other"), 1, script.driver("a")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reconfigure_restarts_only_changed_active_effects() {
        let script = Script::default();
        let now = Instant::now();
        let mut table = table_with(&script, &["a", "b", "c"]);
        table.start("a", now);
        table.start("b", now);

        // "b" keeps its settings, "c" changes but is not running.
        let scheduled = table.reconfigure(now, |id, old| if id == "b" { *old } else { 2 });
        assert_eq!(scheduled, 1);
        assert!(!table.get("a").unwrap().is_active());
        assert!(table.get("b").unwrap().is_active());
        assert!(!table.get("c").unwrap().restart_pending());

        table.poll(now + Duration::from_millis(100), |h| Ok(script.driver(h.id())));
        assert!(!table.get("a").unwrap().is_active());

        table.poll(now + Duration::from_millis(150), |h| Ok(script.driver(h.id())));
        assert!(table.get("a").unwrap().is_active());
        assert_eq!(*table.get("a").unwrap().settings(), 2);
    }

    #[test]
    fn test_failed_start_recovers_after_delay() {
        let script = Script::default();
        let now = Instant::now();
        let mut table = table_with(&script, &["a"]);

        script.set_fail_start(true);
        assert!(!table.start("a", now));
        assert!(table.get("a").unwrap().recovery_pending());

        script.set_fail_start(false);
        table.poll(now + Duration::from_secs(1), |h| Ok(script.driver(h.id())));
        assert!(!table.get("a").unwrap().is_active());

        table.poll(now + Duration::from_secs(2), |h| Ok(script.driver(h.id())));
        assert!(table.get("a").unwrap().is_active());
        assert_eq!(script.count("teardown a"), 1);
    }

    #[test]
    fn test_recovery_gives_up_eventually() {
        let script = Script::default();
        let mut now = Instant::now();
        let mut table = table_with(&script, &["a"]);
        script.set_fail_start(true);
        table.start("a", now);

        for _ in 0..10 {
            now += Duration::from_secs(2);
            table.poll(now, |h| Ok(script.driver(h.id())));
        }
        assert!(!table.get("a").unwrap().recovery_pending());
        assert_eq!(script.count("teardown a"), MAX_RECOVERY_ATTEMPTS as usize);
    }

    #[test]
    fn test_hidden_elements_stay_paused_on_resume() {
        let script = Script::default();
        let now = Instant::now();
        let mut table = table_with(&script, &["a", "b"]);

        table.set_visibility(&ElementRef::new("#b"), false, now);
        table.pause_all(PauseSource::Host, now);
        table.resume_visible(PauseSource::Host, now);

        assert!(table.get("a").unwrap().is_active());
        assert!(!table.get("b").unwrap().is_active());

        table.set_visibility(&ElementRef::new("#b"), true, now);
        assert!(table.get("b").unwrap().is_active());
    }

    #[test]
    fn test_global_pause_blocks_visibility_starts() {
        let script = Script::default();
        let now = Instant::now();
        let mut table = table_with(&script, &["a"]);

        table.pause_all(PauseSource::Host, now);
        table.set_visibility(&ElementRef::new("#a"), true, now);
        assert!(!table.get("a").unwrap().is_active());
        assert!(table.is_paused_globally());
    }

    #[test]
    fn test_resume_waits_for_every_pause_source() {
        let script = Script::default();
        let now = Instant::now();
        let mut table = table_with(&script, &["a"]);
        table.start("a", now);

        table.pause_all(PauseSource::Controller, now);
        table.pause_all(PauseSource::Host, now);
        table.resume_visible(PauseSource::Controller, now);
        assert!(!table.get("a").unwrap().is_active());
        assert!(table.is_paused_by(PauseSource::Host));
        assert!(!table.is_paused_by(PauseSource::Controller));

        table.resume_visible(PauseSource::Host, now);
        assert!(table.get("a").unwrap().is_active());
        assert!(!table.is_paused_globally());
    }
}
