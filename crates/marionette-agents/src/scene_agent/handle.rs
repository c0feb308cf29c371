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

use marionette_core::math::{Mat4, Quat, Vec3};
use marionette_core::AnimationError;
use marionette_lanes::{Backend, BackendKind, InstanceData};

/// One object's instance slot, as seen from [`Scene::update`](super::Scene::update).
///
/// Only per-instance state is reachable. Adding or removing instances goes
/// through the scene so swapped slots are re-pointed at their objects.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHandle<'a> {
    backend: &'a Backend,
    index: u32,
}

impl<'a> ObjectHandle<'a> {
    pub(super) fn new(backend: &'a Backend, index: u32) -> Self {
        Self { backend, index }
    }

    /// The instance slot the object currently occupies. Changes when another
    /// object of the same model is removed.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Backend variant of the object's model.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The instance record of a simple object; `None` for skeletal ones.
    pub fn instance_data(&self) -> Option<InstanceData> {
        match self.backend {
            Backend::Simple(simple) => simple.instance(self.index),
            Backend::Skeletal(_) => None,
        }
    }

    /// Sets position, rotation and scale.
    pub fn set_transform(
        &self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), AnimationError> {
        self.backend
            .set_instance_transform(self.index, position, rotation, scale)
    }

    /// Simple only: rotation and angular velocity.
    pub fn set_rotation(&self, rotation: Quat, rotation_speed: Vec3) -> Result<(), AnimationError> {
        self.backend
            .set_instance_rotation(self.index, rotation, rotation_speed)
    }

    /// Simple only: replaces the whole record.
    pub fn set_instance_data(&self, data: InstanceData) -> Result<(), AnimationError> {
        self.backend.set_instance_data(self.index, data)
    }

    /// Skeletal only: starts `clip` from its beginning.
    pub fn play_animation(&self, clip: u32, looping: bool) -> Result<(), AnimationError> {
        self.backend.play_animation(self.index, clip, looping)
    }

    /// Skeletal only: cross-fades into `target` over `duration` seconds.
    pub fn blend_to_animation(&self, target: u32, duration: f32) -> Result<(), AnimationError> {
        self.backend
            .blend_to_animation(self.index, target, duration)
    }

    /// Skeletal only: stays on the current clip.
    pub fn cancel_blend(&self) -> Result<(), AnimationError> {
        self.backend.cancel_blend(self.index)
    }

    /// Skeletal only. Zero pauses playback.
    pub fn set_animation_speed(&self, speed: f32) -> Result<(), AnimationError> {
        self.backend.set_animation_speed(self.index, speed)
    }

    /// Skeletal only: seeks the current clip.
    pub fn set_animation_time(&self, time: f32) -> Result<(), AnimationError> {
        self.backend.set_animation_time(self.index, time)
    }

    /// Skeletal only.
    pub fn current_clip(&self) -> Result<u32, AnimationError> {
        self.backend.current_clip(self.index)
    }

    /// Skeletal only: playback time of the current clip.
    pub fn animation_time(&self) -> Result<f32, AnimationError> {
        self.backend.animation_time(self.index)
    }

    /// Skeletal only.
    pub fn is_blending(&self) -> Result<bool, AnimationError> {
        self.backend.is_blending(self.index)
    }

    /// Skeletal only: fade progress in `[0, 1]`.
    pub fn blend_progress(&self) -> Result<f32, AnimationError> {
        self.backend.blend_progress(self.index)
    }

    /// Skeletal only: sets the model matrix.
    pub fn set_model_matrix(&self, matrix: Mat4) -> Result<(), AnimationError> {
        self.backend.set_model_matrix(self.index, matrix)
    }
}
