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

//! Effect registries: they perform visual effects and make no decisions.
//!
//! The [`SliderRegistry`] and [`AnimationRegistry`] implement
//! [`Effector`](lumen_core::Effector) so the adaptive controller can pause,
//! resume and reconfigure them. Native effects are reached through the
//! [`EffectDriver`] and factory traits; their failures are logged and healed
//! locally.

#![warn(missing_docs)]

pub mod animation;
pub mod driver;
pub mod error;
pub mod slider;
pub mod table;

pub use animation::{AnimationOverrides, AnimationRegistry};
pub use driver::{AnimationFactory, AnimationRequest, EffectDriver, SliderFactory, TweenProperties};
pub use error::{EffectError, EffectResult};
pub use slider::{SliderOptions, SliderRegistry};
pub use table::{EffectHandle, EffectTable, TableTiming};
