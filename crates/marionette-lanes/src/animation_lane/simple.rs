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

//! Transform-driven animation backend.
//!
//! Each instance is a 64-byte record (angular velocity, rotation, position,
//! scale). The compute pass integrates the rotation on the GPU; the CPU only
//! uploads records that were explicitly changed, tracked by a sparse
//! [`DirtySet`] and coalesced into runs at flush time.

use super::dirty::DirtySet;
use bytes::BufMut;
use marionette_core::animation::{grown_capacity, AnimationBackend, FlushSlots, SwapRemove};
use marionette_core::frustum::Plane;
use marionette_core::math::{Quat, Vec3, Vec4};
use marionette_core::renderer::api::{BindingRole, BufferId, BufferWrite};
use marionette_core::renderer::layout::{put_padding, put_vec4, GpuRecord, IndirectArgs};
use marionette_core::AnimationError;
use parking_lot::Mutex;

/// One simple-backend instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    /// Angular velocity in radians per second around each axis.
    pub rotation_speed: Vec3,
    /// Current rotation.
    pub rotation: Quat,
    /// World position.
    pub position: Vec3,
    /// Non-uniform scale.
    pub scale: Vec3,
}

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            rotation_speed: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl GpuRecord for InstanceData {
    const SIZE: usize = 64;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_vec4(buf, self.rotation_speed.extend(0.0));
        put_vec4(buf, Vec4::from(self.rotation));
        put_vec4(buf, self.position.extend(1.0));
        put_vec4(buf, self.scale.extend(0.0));
    }
}

/// Per-frame uniform of the simple compute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleFrameUniform {
    /// Active instances.
    pub instance_count: u32,
    /// Frame delta in seconds.
    pub delta_time: f32,
    /// Bounding-sphere radius for culling.
    pub bounding_radius: f32,
    /// Frustum planes as `(normal, distance)`.
    pub planes: [Vec4; 6],
}

impl GpuRecord for SimpleFrameUniform {
    const SIZE: usize = 112;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.instance_count);
        buf.put_f32_le(self.delta_time);
        buf.put_f32_le(self.bounding_radius);
        put_padding(buf, 1);
        for plane in &self.planes {
            put_vec4(buf, *plane);
        }
    }
}

#[derive(Debug)]
struct SimpleState {
    instances: Vec<InstanceData>,
    count: u32,
    dirty: DirtySet,
    needs_rebuild: bool,
    bounding_radius: f32,
    planes: Option<[Plane; 6]>,
    staged: Vec<BufferWrite>,
}

impl SimpleState {
    fn check(&self, index: u32) -> Result<(), AnimationError> {
        if index < self.count {
            Ok(())
        } else {
            Err(AnimationError::InstanceOutOfRange {
                index,
                count: self.count,
            })
        }
    }

    fn grow_to(&mut self, new_max: u32) {
        if new_max as usize <= self.instances.len() {
            return;
        }
        log::info!(
            "SimpleTransform backend growing {} -> {} instances",
            self.instances.len(),
            new_max
        );
        self.instances.resize(new_max as usize, InstanceData::default());
        self.needs_rebuild = true;
        self.dirty.mark_range(0..self.count);
    }
}

/// The simple transform backend.
#[derive(Debug)]
pub struct SimpleBackend {
    state: Mutex<SimpleState>,
}

impl SimpleBackend {
    /// Strategy name reported in logs and errors.
    pub const NAME: &'static str = "SimpleTransform";

    /// Creates a backend with room for `capacity` instances.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            state: Mutex::new(SimpleState {
                instances: vec![InstanceData::default(); capacity as usize],
                count: 0,
                dirty: DirtySet::new(),
                needs_rebuild: false,
                bounding_radius: 1.0,
                planes: None,
                staged: Vec::new(),
            }),
        }
    }

    /// Sets position, rotation and scale of an instance.
    pub fn set_instance_transform(
        &self,
        index: u32,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check(index)?;
        let record = &mut state.instances[index as usize];
        record.position = position;
        record.rotation = rotation;
        record.scale = scale;
        state.dirty.mark(index);
        Ok(())
    }

    /// Sets the rotation and angular velocity of an instance.
    pub fn set_instance_rotation(
        &self,
        index: u32,
        rotation: Quat,
        rotation_speed: Vec3,
    ) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check(index)?;
        let record = &mut state.instances[index as usize];
        record.rotation = rotation;
        record.rotation_speed = rotation_speed;
        state.dirty.mark(index);
        Ok(())
    }

    /// Replaces an instance record.
    pub fn set_instance_data(&self, index: u32, data: InstanceData) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check(index)?;
        state.instances[index as usize] = data;
        state.dirty.mark(index);
        Ok(())
    }

    /// Reads an instance record.
    pub fn instance(&self, index: u32) -> Option<InstanceData> {
        let state = self.state.lock();
        (index < state.count).then(|| state.instances[index as usize])
    }

    /// Number of slots waiting to be flushed.
    pub fn dirty_count(&self) -> usize {
        self.state.lock().dirty.len()
    }
}

impl AnimationBackend for SimpleBackend {
    fn strategy_name(&self) -> &'static str {
        Self::NAME
    }

    fn add_instance(&self) -> u32 {
        let mut state = self.state.lock();
        if state.count as usize >= state.instances.len() {
            let new_max = grown_capacity(state.instances.len() as u32);
            state.grow_to(new_max);
        }
        let index = state.count;
        state.count += 1;
        state.instances[index as usize] = InstanceData::default();
        state.dirty.mark(index);
        index
    }

    fn remove_instance(&self, index: u32) -> Result<SwapRemove, AnimationError> {
        let mut state = self.state.lock();
        state.check(index)?;
        let last = state.count - 1;
        state.count = last;
        if index == last {
            return Ok(SwapRemove {
                swapped_from: last,
                did_swap: false,
            });
        }
        state.instances[index as usize] = state.instances[last as usize];
        state.dirty.mark(index);
        Ok(SwapRemove {
            swapped_from: last,
            did_swap: true,
        })
    }

    fn instance_count(&self) -> u32 {
        self.state.lock().count
    }

    fn max_instances(&self) -> u32 {
        self.state.lock().instances.len() as u32
    }

    fn grow(&self, new_max: u32) {
        self.state.lock().grow_to(new_max);
    }

    fn needs_rebuild(&self) -> bool {
        self.state.lock().needs_rebuild
    }

    fn clear_rebuild(&self) {
        self.state.lock().needs_rebuild = false;
    }

    fn prepare_frame(&self, delta_time: f32, uniform: Option<BufferId>) {
        let mut state = self.state.lock();
        let Some(uniform) = uniform.filter(|_| !state.needs_rebuild) else {
            return;
        };
        let planes = state
            .planes
            .map(|planes| planes.map(|p| p.to_vec4()))
            .unwrap_or([Vec4::ZERO; 6]);
        let record = SimpleFrameUniform {
            instance_count: state.count,
            delta_time,
            bounding_radius: state.bounding_radius,
            planes,
        };
        state.staged.push(BufferWrite::new(uniform, 0, record.to_bytes()));
    }

    fn flush(&self, slots: &FlushSlots) -> usize {
        let mut state = self.state.lock();
        let Some(buffer) = slots.instance.filter(|_| !state.needs_rebuild) else {
            return 0;
        };
        let count = state.count;
        let runs = state.dirty.coalesce(count);
        let mut writes = Vec::with_capacity(runs.len());
        for run in runs {
            let mut data = Vec::with_capacity(run.len() * InstanceData::SIZE);
            for record in &state.instances[run.start as usize..run.end as usize] {
                record.encode(&mut data);
            }
            writes.push(BufferWrite::new(
                buffer,
                run.start as u64 * InstanceData::SIZE as u64,
                data,
            ));
        }
        let emitted = writes.len();
        state.staged.extend(writes);
        emitted
    }

    fn staged_write_data(&self) -> Vec<BufferWrite> {
        std::mem::take(&mut self.state.lock().staged)
    }

    fn set_frustum_planes(&self, planes: &[Plane; 6]) {
        self.state.lock().planes = Some(*planes);
    }

    fn set_bounding_radius(&self, radius: f32) {
        self.state.lock().bounding_radius = radius;
    }

    fn culling_enabled(&self) -> bool {
        self.state.lock().planes.is_some()
    }

    fn reset_indirect_args(&self, index_count: u32, binding: Option<BufferId>) {
        let mut state = self.state.lock();
        if state.planes.is_none() {
            return;
        }
        if let Some(buffer) = binding {
            let args = IndirectArgs::reset(index_count).to_bytes();
            state.staged.push(BufferWrite::new(buffer, 0, args));
        }
    }

    fn buffer_size(&self, role: BindingRole) -> Option<u64> {
        let max = self.state.lock().instances.len() as u64;
        match role {
            BindingRole::AnimatorUniform => Some(SimpleFrameUniform::SIZE as u64),
            BindingRole::InstanceData => Some(max * InstanceData::SIZE as u64),
            BindingRole::AnimatorOutput => Some(max * 64),
            BindingRole::IndirectArgs => Some(IndirectArgs::SIZE as u64),
            _ => None,
        }
    }
}
