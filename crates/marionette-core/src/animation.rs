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

//! The contract shared by every animation backend.
//!
//! A backend owns a dense array of instance slots `[0, instance_count)` and the
//! CPU-side source of truth for them. Each frame it stages [`BufferWrite`]s
//! for whatever changed; the orchestrator drains and submits them in one batch.
//!
//! # Capacity
//!
//! Adding past `max_instances` grows the slot arrays (doubling, minimum 8) and
//! raises [`AnimationBackend::needs_rebuild`]. Until the owner recreates the
//! GPU buffers and calls [`AnimationBackend::clear_rebuild`],
//! [`prepare_frame`](AnimationBackend::prepare_frame) and
//! [`flush`](AnimationBackend::flush) do nothing.

use crate::error::AnimationError;
use crate::frustum::Plane;
use crate::renderer::api::{BindGroupProvider, BindingRole, BufferId, BufferWrite};
use std::fmt::Debug;

/// Smallest capacity a backend grows to.
pub const MIN_CAPACITY: u32 = 8;

/// Capacity after growing from `current`.
#[inline]
pub fn grown_capacity(current: u32) -> u32 {
    current.saturating_mul(2).max(MIN_CAPACITY)
}

/// Result of a swap-remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRemove {
    /// The slot whose data moved into the removed slot (the former last slot).
    pub swapped_from: u32,
    /// `false` when the removed slot was the last one and nothing moved.
    pub did_swap: bool,
}

/// Destination buffers for [`AnimationBackend::flush`].
///
/// A `None` slot means the buffer is not bound; the matching dirty state is
/// kept until a later flush can write it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSlots {
    /// Per-instance records.
    pub instance: Option<BufferId>,
    /// Bone array.
    pub bone: Option<BufferId>,
    /// Per-instance model matrices.
    pub model: Option<BufferId>,
    /// Packed clip buffer.
    pub clips: Option<BufferId>,
}

impl FlushSlots {
    /// Resolves the flush destinations from an animator's compute provider.
    pub fn from_provider(provider: &BindGroupProvider) -> Self {
        Self {
            instance: provider.buffer(BindingRole::InstanceData),
            bone: provider.buffer(BindingRole::BoneInfo),
            model: provider.buffer(BindingRole::ModelData),
            clips: provider.buffer(BindingRole::AnimationClips),
        }
    }
}

/// Instance lifecycle, dirty tracking and GPU staging for one batched model.
///
/// All methods take `&self`; each implementation guards its state with one
/// lock held for a single logical operation, so game-logic mutation may
/// interleave with frame preparation.
pub trait AnimationBackend: Send + Sync + Debug {
    /// Name used in logs and [`AnimationError::Unsupported`].
    fn strategy_name(&self) -> &'static str;

    /// Claims the next slot, growing if full. Returns its index.
    fn add_instance(&self) -> u32;

    /// Removes `index` by moving the last active slot into it.
    fn remove_instance(&self, index: u32) -> Result<SwapRemove, AnimationError>;

    /// Number of active slots.
    fn instance_count(&self) -> u32;

    /// Slot capacity.
    fn max_instances(&self) -> u32;

    /// Grows capacity to `new_max`, preserving data. No-op if not larger.
    fn grow(&self, new_max: u32);

    /// Whether GPU buffers must be recreated before the next frame.
    fn needs_rebuild(&self) -> bool;

    /// Acknowledges that GPU buffers match the current capacity.
    fn clear_rebuild(&self);

    /// Advances animation and stages the per-frame uniform.
    fn prepare_frame(&self, delta_time: f32, uniform: Option<BufferId>);

    /// Stages writes for dirty state and clears it. Returns the number of writes staged.
    fn flush(&self, slots: &FlushSlots) -> usize;

    /// Drains every staged write.
    fn staged_write_data(&self) -> Vec<BufferWrite>;

    /// Replaces the frustum planes used by the cull pass. Enables culling.
    fn set_frustum_planes(&self, planes: &[Plane; 6]);

    /// Sets the bounding-sphere radius shared by all instances.
    fn set_bounding_radius(&self, radius: f32);

    /// Whether frustum planes have been supplied at least once.
    fn culling_enabled(&self) -> bool;

    /// The indirect-args buffer to draw from, when culling is enabled.
    fn indirect_buffer(&self, binding: Option<BufferId>) -> Option<BufferId> {
        binding.filter(|_| self.culling_enabled())
    }

    /// Stages a zeroed instance count into the indirect-args buffer.
    /// No-op unless culling is enabled.
    fn reset_indirect_args(&self, index_count: u32, binding: Option<BufferId>);

    /// Required size of the buffer backing `role` at the current capacity.
    fn buffer_size(&self, role: BindingRole) -> Option<u64>;
}
