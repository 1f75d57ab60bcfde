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

//! The seams between the registries and the native effect implementation.

use crate::error::EffectResult;
use lumen_core::config::{AnimationSettings, SliderSettings};
use lumen_core::effector::ElementRef;
use std::collections::BTreeMap;

/// A native effect instance owned by a registry.
///
/// `S` is the settings bundle the effect runs with. `start` always receives
/// the current settings so a restart after reconfiguration picks them up.
pub trait EffectDriver<S>: Send {
    /// Starts (or resumes) the effect.
    fn start(&mut self, settings: &S) -> EffectResult<()>;

    /// Pauses the effect, keeping its state.
    fn pause(&mut self) -> EffectResult<()>;

    /// Releases every native resource. The driver is dropped afterwards.
    fn teardown(&mut self);
}

/// Creates native slider instances.
pub trait SliderFactory: Send {
    /// Creates the slider bound to `element`.
    fn create(
        &mut self,
        id: &str,
        element: &ElementRef,
        settings: &SliderSettings,
    ) -> EffectResult<Box<dyn EffectDriver<SliderSettings>>>;
}

/// Animated property targets of a tween, by property name.
pub type TweenProperties = BTreeMap<String, f32>;

/// What an animation effect animates.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationRequest {
    /// A sequenced timeline started by `trigger`.
    Timeline {
        /// The element that owns the timeline.
        trigger: ElementRef,
    },
    /// A single tween of `target` towards `properties`.
    Tween {
        /// The animated element.
        target: ElementRef,
        /// Target property values.
        properties: TweenProperties,
    },
    /// A scroll-driven reveal of `element`.
    ScrollTrigger {
        /// The revealed element.
        element: ElementRef,
    },
}

impl AnimationRequest {
    /// The element the animation is bound to.
    pub fn element(&self) -> &ElementRef {
        match self {
            AnimationRequest::Timeline { trigger } => trigger,
            AnimationRequest::Tween { target, .. } => target,
            AnimationRequest::ScrollTrigger { element } => element,
        }
    }

    /// Short name of the request kind, used to build ids.
    pub fn kind(&self) -> &'static str {
        match self {
            AnimationRequest::Timeline { .. } => "timeline",
            AnimationRequest::Tween { .. } => "tween",
            AnimationRequest::ScrollTrigger { .. } => "scroll",
        }
    }
}

/// Creates native animation instances.
pub trait AnimationFactory: Send {
    /// Creates the animation described by `request`.
    fn create(
        &mut self,
        id: &str,
        request: &AnimationRequest,
        settings: &AnimationSettings,
    ) -> EffectResult<Box<dyn EffectDriver<AnimationSettings>>>;
}
