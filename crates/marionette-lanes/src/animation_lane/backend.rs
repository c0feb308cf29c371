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

//! The closed set of animation backends.
//!
//! Operations that only one variant supports return
//! [`AnimationError::Unsupported`] on the other, so a caller that targets the
//! wrong backend finds out instead of silently doing nothing.

use super::simple::{InstanceData, SimpleBackend};
use super::skeletal::{Bone, Clip, SkeletalBackend};
use marionette_core::animation::{AnimationBackend, FlushSlots, SwapRemove};
use marionette_core::frustum::Plane;
use marionette_core::math::{Mat4, Quat, Vec3};
use marionette_core::renderer::api::{BindingRole, BufferId, BufferWrite};
use marionette_core::AnimationError;

/// Which backend an animator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// [`SimpleBackend`].
    #[default]
    Simple,
    /// [`SkeletalBackend`].
    Skeletal,
}

/// An animation backend.
#[derive(Debug)]
pub enum Backend {
    /// Transform-driven instances.
    Simple(SimpleBackend),
    /// Clip-driven skinned instances.
    Skeletal(SkeletalBackend),
}

impl Backend {
    /// Creates a backend of `kind` with room for `capacity` instances.
    pub fn new(kind: BackendKind, capacity: u32) -> Self {
        match kind {
            BackendKind::Simple => Backend::Simple(SimpleBackend::with_capacity(capacity)),
            BackendKind::Skeletal => Backend::Skeletal(SkeletalBackend::with_capacity(capacity)),
        }
    }

    /// The variant.
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Simple(_) => BackendKind::Simple,
            Backend::Skeletal(_) => BackendKind::Skeletal,
        }
    }

    fn inner(&self) -> &dyn AnimationBackend {
        match self {
            Backend::Simple(b) => b,
            Backend::Skeletal(b) => b,
        }
    }

    fn unsupported(&self, operation: &'static str) -> AnimationError {
        AnimationError::Unsupported {
            backend: self.strategy_name(),
            operation,
        }
    }

    fn simple(&self, operation: &'static str) -> Result<&SimpleBackend, AnimationError> {
        match self {
            Backend::Simple(b) => Ok(b),
            Backend::Skeletal(_) => Err(self.unsupported(operation)),
        }
    }

    fn skeletal(&self, operation: &'static str) -> Result<&SkeletalBackend, AnimationError> {
        match self {
            Backend::Skeletal(b) => Ok(b),
            Backend::Simple(_) => Err(self.unsupported(operation)),
        }
    }

    /// Sets position, rotation and scale of an instance. Supported by both variants.
    pub fn set_instance_transform(
        &self,
        index: u32,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), AnimationError> {
        match self {
            Backend::Simple(b) => b.set_instance_transform(index, position, rotation, scale),
            Backend::Skeletal(b) => b.set_instance_transform(index, position, rotation, scale),
        }
    }

    /// Simple only: sets rotation and angular velocity.
    pub fn set_instance_rotation(
        &self,
        index: u32,
        rotation: Quat,
        rotation_speed: Vec3,
    ) -> Result<(), AnimationError> {
        self.simple("set_instance_rotation")?
            .set_instance_rotation(index, rotation, rotation_speed)
    }

    /// Simple only: replaces an instance record.
    pub fn set_instance_data(&self, index: u32, data: InstanceData) -> Result<(), AnimationError> {
        self.simple("set_instance_data")?.set_instance_data(index, data)
    }

    /// Skeletal only: resizes the bone array.
    pub fn set_bone_count(&self, count: usize) -> Result<(), AnimationError> {
        self.skeletal("set_bone_count")?.set_bone_count(count);
        Ok(())
    }

    /// Skeletal only: replaces one bone.
    pub fn set_bone(&self, index: usize, bone: Bone) -> Result<(), AnimationError> {
        self.skeletal("set_bone")?.set_bone(index, bone)
    }

    /// Skeletal only: appends a clip.
    pub fn add_clip(&self, clip: &Clip) -> Result<u32, AnimationError> {
        Ok(self.skeletal("add_clip")?.add_clip(clip))
    }

    /// Skeletal only: starts a clip.
    pub fn play_animation(
        &self,
        index: u32,
        clip: u32,
        looping: bool,
    ) -> Result<(), AnimationError> {
        self.skeletal("play_animation")?
            .play_animation(index, clip, looping)
    }

    /// Skeletal only: cross-fades into a clip.
    pub fn blend_to_animation(
        &self,
        index: u32,
        target: u32,
        duration: f32,
    ) -> Result<(), AnimationError> {
        self.skeletal("blend_to_animation")?
            .blend_to_animation(index, target, duration)
    }

    /// Skeletal only: drops a fade.
    pub fn cancel_blend(&self, index: u32) -> Result<(), AnimationError> {
        self.skeletal("cancel_blend")?.cancel_blend(index)
    }

    /// Skeletal only: sets playback speed.
    pub fn set_animation_speed(&self, index: u32, speed: f32) -> Result<(), AnimationError> {
        self.skeletal("set_animation_speed")?
            .set_animation_speed(index, speed)
    }

    /// Skeletal only: seeks the current clip.
    pub fn set_animation_time(&self, index: u32, time: f32) -> Result<(), AnimationError> {
        self.skeletal("set_animation_time")?
            .set_animation_time(index, time)
    }

    /// Skeletal only: current clip.
    pub fn current_clip(&self, index: u32) -> Result<u32, AnimationError> {
        self.skeletal("current_clip")?.current_clip(index)
    }

    /// Skeletal only: playback time.
    pub fn animation_time(&self, index: u32) -> Result<f32, AnimationError> {
        self.skeletal("animation_time")?.animation_time(index)
    }

    /// Skeletal only: whether a fade is running.
    pub fn is_blending(&self, index: u32) -> Result<bool, AnimationError> {
        self.skeletal("is_blending")?.is_blending(index)
    }

    /// Skeletal only: fade progress.
    pub fn blend_progress(&self, index: u32) -> Result<f32, AnimationError> {
        self.skeletal("blend_progress")?.blend_progress(index)
    }

    /// Skeletal only: sets a model matrix.
    pub fn set_model_matrix(&self, index: u32, matrix: Mat4) -> Result<(), AnimationError> {
        self.skeletal("set_model_matrix")?
            .set_model_matrix(index, matrix)
    }
}

impl AnimationBackend for Backend {
    fn strategy_name(&self) -> &'static str {
        self.inner().strategy_name()
    }

    fn add_instance(&self) -> u32 {
        self.inner().add_instance()
    }

    fn remove_instance(&self, index: u32) -> Result<SwapRemove, AnimationError> {
        self.inner().remove_instance(index)
    }

    fn instance_count(&self) -> u32 {
        self.inner().instance_count()
    }

    fn max_instances(&self) -> u32 {
        self.inner().max_instances()
    }

    fn grow(&self, new_max: u32) {
        self.inner().grow(new_max)
    }

    fn needs_rebuild(&self) -> bool {
        self.inner().needs_rebuild()
    }

    fn clear_rebuild(&self) {
        self.inner().clear_rebuild()
    }

    fn prepare_frame(&self, delta_time: f32, uniform: Option<BufferId>) {
        self.inner().prepare_frame(delta_time, uniform)
    }

    fn flush(&self, slots: &FlushSlots) -> usize {
        self.inner().flush(slots)
    }

    fn staged_write_data(&self) -> Vec<BufferWrite> {
        self.inner().staged_write_data()
    }

    fn set_frustum_planes(&self, planes: &[Plane; 6]) {
        self.inner().set_frustum_planes(planes)
    }

    fn set_bounding_radius(&self, radius: f32) {
        self.inner().set_bounding_radius(radius)
    }

    fn culling_enabled(&self) -> bool {
        self.inner().culling_enabled()
    }

    fn reset_indirect_args(&self, index_count: u32, binding: Option<BufferId>) {
        self.inner().reset_indirect_args(index_count, binding)
    }

    fn buffer_size(&self, role: BindingRole) -> Option<u64> {
        self.inner().buffer_size(role)
    }
}
