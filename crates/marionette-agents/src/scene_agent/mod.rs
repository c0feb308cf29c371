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

//! The scene agent: object registry, frame phases and the frame loop.
//!
//! A frame is driven by calling, in order,
//! [`Scene::prepare_compute`], [`Scene::prepare_shadows`],
//! [`Scene::prepare_light_culling`] and [`Scene::draw_calls`].
//! [`FrameLoop::tick`] does exactly that.

mod builder;
mod draw;
mod error;
mod frame_loop;
mod handle;
pub mod layouts;
mod light_culling;
mod lighting;
mod resources;
mod scene;
mod shadow;
mod stats;
mod worker_pool;

pub use builder::SceneBuilder;
pub use error::{DrawFailure, SceneError};
pub use frame_loop::{FrameLoop, FrameOutcome};
pub use handle::ObjectHandle;
pub use scene::{ObjectDesc, ObjectInfo, Scene, LIGHT_CULL_PIPELINE, SHADOW_PIPELINE};
pub use stats::FrameStats;
pub use worker_pool::WorkerPool;
