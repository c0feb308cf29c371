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

//! # Marionette Agents
//!
//! Orchestration layer. The [`Scene`] owns the animators of every model,
//! the scene-wide GPU resources (camera, lights, shadow map, Forward+ tiles)
//! and drives them through a [`GpuBackend`](marionette_core::renderer::GpuBackend)
//! in a fixed per-frame phase order. [`FrameLoop`] runs those phases behind a
//! recovery boundary.

#![warn(missing_docs)]

pub mod scene_agent;

pub use scene_agent::*;
