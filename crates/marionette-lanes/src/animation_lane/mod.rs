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

//! Animation lane - per-instance animation state and GPU staging.
//!
//! Two backends share the [`AnimationBackend`](marionette_core::animation::AnimationBackend)
//! contract: [`SimpleBackend`] for rigid transform-driven instances and
//! [`SkeletalBackend`] for clip-driven skinned instances. [`Backend`] closes
//! over both, and [`Animator`] binds one to the [`Model`] its instances draw.

mod animator;
mod backend;
pub mod dirty;
mod model;
pub mod simple;
pub mod skeletal;

pub use animator::*;
pub use backend::*;
pub use dirty::{DirtyRange, DirtySet};
pub use model::*;
pub use simple::{InstanceData, SimpleBackend, SimpleFrameUniform};
pub use skeletal::{
    Bone, Channel, Clip, PlaybackPhase, PlaybackState, SkeletalBackend, SkeletalFrameUniform,
    SkeletalInstance,
};
