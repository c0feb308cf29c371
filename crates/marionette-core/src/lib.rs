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

//! # Marionette Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! shared by the animation lanes, the scene orchestrator, and GPU backends.
//!
//! Nothing in this crate talks to a real graphics API. It defines:
//! - the [`GpuBackend`](renderer::GpuBackend) contract consumed by the orchestrator,
//! - the role-tagged [`BindGroupProvider`](renderer::BindGroupProvider) model,
//! - byte-exact encoders for every GPU-facing record,
//! - the [`AnimationBackend`](animation::AnimationBackend) contract implemented by lanes.

#![warn(missing_docs)]

pub mod animation;
pub mod camera;
pub mod error;
pub mod frustum;
pub mod ids;
pub mod math;
pub mod renderer;
pub mod settings;

pub use camera::Camera;
pub use error::{AnimationError, ConfigError, RenderError, ResourceError};
pub use frustum::{Frustum, Plane};
pub use ids::{IdGenerator, LightId, ObjectId};
pub use settings::SceneSettings;
