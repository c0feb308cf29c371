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

//! Clip-driven skeletal animation backend.
//!
//! Every instance runs its own [`PlaybackState`]. Each frame the backend
//! advances all of them, derives the 32-byte [`SkeletalInstance`] records and
//! marks the touched slots in a contiguous [`DirtyRange`]. Model matrices have
//! their own range. Bones and clips are shared by all instances and are always
//! republished whole.
//!
//! A flush stages up to four writes: instance range, bone array, model-matrix
//! range, clip buffer. Each is tracked and cleared independently.

mod clips;
mod playback;
mod skeleton;

pub use clips::{Channel, Clip, ClipStore, DEFAULT_TICKS_PER_SECOND};
pub use playback::{Blend, PlaybackPhase, PlaybackState, SkeletalInstance};
pub use skeleton::{check_parent, Bone};

use super::dirty::DirtyRange;
use bytes::BufMut;
use marionette_core::animation::{grown_capacity, AnimationBackend, FlushSlots, SwapRemove};
use marionette_core::frustum::Plane;
use marionette_core::math::{Mat4, Quat, Vec3, Vec4};
use marionette_core::renderer::api::{BindingRole, BufferId, BufferWrite};
use marionette_core::renderer::layout::{put_mat4, put_padding, put_vec4, GpuRecord, IndirectArgs};
use marionette_core::AnimationError;
use parking_lot::Mutex;

/// Per-frame uniform of the skeletal compute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletalFrameUniform {
    /// Active instances.
    pub instance_count: u32,
    /// Frame delta in seconds.
    pub delta_time: f32,
    /// Bounding-sphere radius for culling.
    pub bounding_radius: f32,
    /// Bones in the skeleton.
    pub bone_count: u32,
    /// Clips in the clip buffer.
    pub clip_count: u32,
    /// Frustum planes as `(normal, distance)`.
    pub planes: [Vec4; 6],
}

impl GpuRecord for SkeletalFrameUniform {
    const SIZE: usize = 128;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.instance_count);
        buf.put_f32_le(self.delta_time);
        buf.put_f32_le(self.bounding_radius);
        buf.put_u32_le(self.bone_count);
        buf.put_u32_le(self.clip_count);
        put_padding(buf, 3);
        for plane in &self.planes {
            put_vec4(buf, *plane);
        }
    }
}

#[derive(Debug)]
struct SkeletalState {
    playback: Vec<PlaybackState>,
    records: Vec<SkeletalInstance>,
    models: Vec<Mat4>,
    count: u32,
    instance_dirty: DirtyRange,
    model_dirty: DirtyRange,
    bones: Vec<Bone>,
    bones_dirty: bool,
    clips: ClipStore,
    clips_dirty: bool,
    needs_rebuild: bool,
    bone_capacity: usize,
    clip_capacity: usize,
    bounding_radius: f32,
    planes: Option<[Plane; 6]>,
    staged: Vec<BufferWrite>,
}

impl SkeletalState {
    fn capacity(&self) -> u32 {
        self.playback.len() as u32
    }

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

    fn check_clip(&self, clip: u32) -> Result<(), AnimationError> {
        if clip < self.clips.len() {
            Ok(())
        } else {
            Err(AnimationError::UnknownClip {
                clip,
                count: self.clips.len(),
            })
        }
    }

    /// Buffers are about to be recreated; everything must be uploaded again.
    fn mark_rebuild(&mut self) {
        self.needs_rebuild = true;
        self.instance_dirty.mark_range(0..self.count);
        self.model_dirty.mark_range(0..self.count);
        self.bones_dirty = true;
        self.clips_dirty = true;
    }

    fn grow_to(&mut self, new_max: u32) {
        if new_max <= self.capacity() {
            return;
        }
        log::info!(
            "Skeletal backend growing {} -> {} instances",
            self.capacity(),
            new_max
        );
        let len = new_max as usize;
        self.playback.resize(len, PlaybackState::default());
        self.records.resize(len, SkeletalInstance::default());
        self.models.resize(len, Mat4::IDENTITY);
        self.mark_rebuild();
    }

    fn refresh(&mut self, index: u32) {
        let i = index as usize;
        self.records[i] = self.playback[i].gpu_record();
        self.instance_dirty.mark(index);
    }

    fn with_playback<R>(
        &mut self,
        index: u32,
        f: impl FnOnce(&mut PlaybackState) -> R,
    ) -> Result<R, AnimationError> {
        self.check(index)?;
        let result = f(&mut self.playback[index as usize]);
        self.refresh(index);
        Ok(result)
    }
}

/// The skeletal backend.
#[derive(Debug)]
pub struct SkeletalBackend {
    state: Mutex<SkeletalState>,
}

impl SkeletalBackend {
    /// Strategy name reported in logs and errors.
    pub const NAME: &'static str = "Skeletal";

    /// Creates a backend with room for `capacity` instances.
    pub fn with_capacity(capacity: u32) -> Self {
        let len = capacity as usize;
        Self {
            state: Mutex::new(SkeletalState {
                playback: vec![PlaybackState::default(); len],
                records: vec![SkeletalInstance::default(); len],
                models: vec![Mat4::IDENTITY; len],
                count: 0,
                instance_dirty: DirtyRange::new(),
                model_dirty: DirtyRange::new(),
                bones: Vec::new(),
                bones_dirty: false,
                clips: ClipStore::new(),
                clips_dirty: false,
                needs_rebuild: false,
                bone_capacity: 0,
                clip_capacity: 0,
                bounding_radius: 1.0,
                planes: None,
                staged: Vec::new(),
            }),
        }
    }

    /// Resizes the bone array. New bones are identity roots.
    pub fn set_bone_count(&self, count: usize) {
        let mut state = self.state.lock();
        state.bones.resize(count, Bone::default());
        state.bones_dirty = true;
        if count > state.bone_capacity {
            state.mark_rebuild();
        }
    }

    /// Replaces bone `index`. The parent must precede it.
    pub fn set_bone(&self, index: usize, bone: Bone) -> Result<(), AnimationError> {
        check_parent(index, bone.parent)?;
        let mut state = self.state.lock();
        let count = state.bones.len();
        let slot = state
            .bones
            .get_mut(index)
            .ok_or(AnimationError::BoneOutOfRange { index, count })?;
        *slot = bone;
        state.bones_dirty = true;
        Ok(())
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.state.lock().bones.len()
    }

    /// Appends a clip and returns its index.
    pub fn add_clip(&self, clip: &Clip) -> u32 {
        let mut state = self.state.lock();
        let index = state.clips.add(clip);
        state.clips_dirty = true;
        if state.clips.byte_len() > state.clip_capacity {
            state.mark_rebuild();
        }
        log::debug!("Skeletal backend stored clip '{}' as #{index}", clip.name);
        index
    }

    /// Number of stored clips.
    pub fn clip_count(&self) -> u32 {
        self.state.lock().clips.len()
    }

    /// Starts `clip` on an instance from time zero.
    pub fn play_animation(
        &self,
        index: u32,
        clip: u32,
        looping: bool,
    ) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check_clip(clip)?;
        state.with_playback(index, |p| p.play(clip, looping))
    }

    /// Cross-fades an instance into `target` over `duration` seconds.
    pub fn blend_to_animation(
        &self,
        index: u32,
        target: u32,
        duration: f32,
    ) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check_clip(target)?;
        state.with_playback(index, |p| p.blend_to(target, duration))
    }

    /// Drops an instance's fade without committing.
    pub fn cancel_blend(&self, index: u32) -> Result<(), AnimationError> {
        self.state.lock().with_playback(index, |p| p.cancel_blend())
    }

    /// Sets the playback speed of an instance; zero pauses.
    pub fn set_animation_speed(&self, index: u32, speed: f32) -> Result<(), AnimationError> {
        self.state.lock().with_playback(index, |p| p.speed = speed)
    }

    /// Seeks an instance's current clip.
    pub fn set_animation_time(&self, index: u32, time: f32) -> Result<(), AnimationError> {
        self.state.lock().with_playback(index, |p| p.time = time.max(0.0))
    }

    /// The current clip of an instance.
    pub fn current_clip(&self, index: u32) -> Result<u32, AnimationError> {
        let state = self.state.lock();
        state.check(index)?;
        Ok(state.playback[index as usize].clip)
    }

    /// The playback time of an instance's current clip.
    pub fn animation_time(&self, index: u32) -> Result<f32, AnimationError> {
        let state = self.state.lock();
        state.check(index)?;
        Ok(state.playback[index as usize].time)
    }

    /// Whether an instance is fading.
    pub fn is_blending(&self, index: u32) -> Result<bool, AnimationError> {
        let state = self.state.lock();
        state.check(index)?;
        Ok(state.playback[index as usize].blend.is_some())
    }

    /// Fade progress of an instance in `[0, 1]`.
    pub fn blend_progress(&self, index: u32) -> Result<f32, AnimationError> {
        let state = self.state.lock();
        state.check(index)?;
        Ok(state.playback[index as usize].blend_progress())
    }

    /// A copy of an instance's playback state.
    pub fn playback(&self, index: u32) -> Result<PlaybackState, AnimationError> {
        let state = self.state.lock();
        state.check(index)?;
        Ok(state.playback[index as usize])
    }

    /// Sets an instance's model matrix.
    pub fn set_model_matrix(&self, index: u32, matrix: Mat4) -> Result<(), AnimationError> {
        let mut state = self.state.lock();
        state.check(index)?;
        state.models[index as usize] = matrix;
        state.model_dirty.mark(index);
        Ok(())
    }

    /// Sets an instance's model matrix from position, rotation and scale.
    pub fn set_instance_transform(
        &self,
        index: u32,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), AnimationError> {
        self.set_model_matrix(
            index,
            Mat4::from_scale_rotation_translation(scale, rotation, position),
        )
    }

    /// An instance's model matrix.
    pub fn model_matrix(&self, index: u32) -> Option<Mat4> {
        let state = self.state.lock();
        (index < state.count).then(|| state.models[index as usize])
    }
}

impl AnimationBackend for SkeletalBackend {
    fn strategy_name(&self) -> &'static str {
        Self::NAME
    }

    fn add_instance(&self) -> u32 {
        let mut state = self.state.lock();
        if state.count >= state.capacity() {
            let new_max = grown_capacity(state.capacity());
            state.grow_to(new_max);
        }
        let index = state.count;
        state.count += 1;
        let i = index as usize;
        state.playback[i] = PlaybackState::default();
        state.models[i] = Mat4::IDENTITY;
        state.refresh(index);
        state.model_dirty.mark(index);
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
        let (i, l) = (index as usize, last as usize);
        state.playback[i] = state.playback[l];
        state.records[i] = state.records[l];
        state.models[i] = state.models[l];
        state.instance_dirty.mark(index);
        state.model_dirty.mark(index);
        Ok(SwapRemove {
            swapped_from: last,
            did_swap: true,
        })
    }

    fn instance_count(&self) -> u32 {
        self.state.lock().count
    }

    fn max_instances(&self) -> u32 {
        self.state.lock().capacity()
    }

    fn grow(&self, new_max: u32) {
        self.state.lock().grow_to(new_max);
    }

    fn needs_rebuild(&self) -> bool {
        self.state.lock().needs_rebuild
    }

    fn clear_rebuild(&self) {
        let mut state = self.state.lock();
        state.needs_rebuild = false;
        state.bone_capacity = state.bones.len();
        state.clip_capacity = state.clips.byte_len();
    }

    fn prepare_frame(&self, delta_time: f32, uniform: Option<BufferId>) {
        let mut guard = self.state.lock();
        if guard.needs_rebuild {
            return;
        }
        let state = &mut *guard;
        let count = state.count;
        for i in 0..count as usize {
            let clips = &state.clips;
            state.playback[i].advance(delta_time, |clip| clips.duration_seconds(clip));
            state.records[i] = state.playback[i].gpu_record();
        }
        state.instance_dirty.mark_range(0..count);

        if let Some(uniform) = uniform {
            let planes = state
                .planes
                .map(|planes| planes.map(|p| p.to_vec4()))
                .unwrap_or([Vec4::ZERO; 6]);
            let record = SkeletalFrameUniform {
                instance_count: count,
                delta_time,
                bounding_radius: state.bounding_radius,
                bone_count: state.bones.len() as u32,
                clip_count: state.clips.len(),
                planes,
            };
            state.staged.push(BufferWrite::new(uniform, 0, record.to_bytes()));
        }
    }

    fn flush(&self, slots: &FlushSlots) -> usize {
        let mut guard = self.state.lock();
        if guard.needs_rebuild {
            return 0;
        }
        let state = &mut *guard;
        let count = state.count;
        let before = state.staged.len();

        if let Some(buffer) = slots.instance {
            if let Some(range) = state.instance_dirty.take(count) {
                let mut data = Vec::with_capacity(range.len() * SkeletalInstance::SIZE);
                for record in &state.records[range.start as usize..range.end as usize] {
                    record.encode(&mut data);
                }
                let offset = range.start as u64 * SkeletalInstance::SIZE as u64;
                state.staged.push(BufferWrite::new(buffer, offset, data));
            }
        }

        if let Some(buffer) = slots.bone.filter(|_| state.bones_dirty) {
            if !state.bones.is_empty() {
                let mut data = Vec::with_capacity(state.bones.len() * Bone::SIZE);
                for bone in &state.bones {
                    bone.encode(&mut data);
                }
                state.staged.push(BufferWrite::new(buffer, 0, data));
            }
            state.bones_dirty = false;
        }

        if let Some(buffer) = slots.model {
            if let Some(range) = state.model_dirty.take(count) {
                let mut data = Vec::with_capacity(range.len() * 64);
                for matrix in &state.models[range.start as usize..range.end as usize] {
                    put_mat4(&mut data, matrix);
                }
                state
                    .staged
                    .push(BufferWrite::new(buffer, range.start as u64 * 64, data));
            }
        }

        if let Some(buffer) = slots.clips.filter(|_| state.clips_dirty) {
            state.staged.push(BufferWrite::new(buffer, 0, state.clips.encode()));
            state.clips_dirty = false;
        }

        state.staged.len() - before
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
        let state = self.state.lock();
        let max = state.capacity() as u64;
        let bones = state.bones.len().max(1) as u64;
        match role {
            BindingRole::AnimatorUniform => Some(SkeletalFrameUniform::SIZE as u64),
            BindingRole::InstanceData => Some(max * SkeletalInstance::SIZE as u64),
            BindingRole::ModelData => Some(max * 64),
            BindingRole::BoneInfo => Some(bones * Bone::SIZE as u64),
            BindingRole::AnimationClips => Some(state.clips.byte_len() as u64),
            // model matrix followed by one skinning matrix per bone
            BindingRole::AnimatorOutput => Some(max * (1 + bones) * 64),
            BindingRole::IndirectArgs => Some(IndirectArgs::SIZE as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clip(name: &str, seconds: f32) -> Clip {
        Clip {
            name: name.into(),
            duration_ticks: seconds * 25.0,
            ticks_per_second: 25.0,
            channels: vec![Channel {
                bone: 0,
                rotations: vec![(0.0, Quat::IDENTITY)],
                ..Default::default()
            }],
        }
    }

    fn all_slots() -> FlushSlots {
        FlushSlots {
            instance: Some(BufferId(1)),
            bone: Some(BufferId(2)),
            model: Some(BufferId(3)),
            clips: Some(BufferId(4)),
        }
    }

    /// A backend with two clips, two bones and `n` instances, already bound.
    fn bound_backend(n: u32) -> SkeletalBackend {
        let backend = SkeletalBackend::with_capacity(8);
        backend.set_bone_count(2);
        backend.add_clip(&clip("idle", 2.0));
        backend.add_clip(&clip("run", 1.0));
        for _ in 0..n {
            backend.add_instance();
        }
        backend.clear_rebuild();
        backend.flush(&all_slots());
        backend.staged_write_data();
        backend
    }

    #[test]
    fn adding_clips_before_binding_requests_rebuild() {
        let backend = SkeletalBackend::with_capacity(8);
        backend.add_clip(&clip("idle", 1.0));
        assert!(backend.needs_rebuild());
        backend.clear_rebuild();
        assert!(!backend.needs_rebuild());
        assert_eq!(
            backend.buffer_size(BindingRole::AnimationClips),
            Some(16 + 16 + 32 + 48)
        );
    }

    #[test]
    fn flush_stages_instance_bone_model_and_clip_writes() {
        let backend = SkeletalBackend::with_capacity(8);
        backend.set_bone_count(2);
        backend.add_clip(&clip("idle", 2.0));
        backend.add_instance();
        backend.clear_rebuild();

        assert_eq!(backend.flush(&all_slots()), 4);
        let writes = backend.staged_write_data();
        assert_eq!(writes[0].buffer, BufferId(1));
        assert_eq!(writes[0].data.len(), 32);
        assert_eq!(writes[1].data.len(), 2 * 128);
        assert_eq!(writes[2].data.len(), 64);
        assert_eq!(writes[3].buffer, BufferId(4));
        assert_eq!(backend.flush(&all_slots()), 0);
    }

    #[test]
    fn contiguous_range_spans_gaps() {
        let backend = bound_backend(8);
        backend.set_model_matrix(1, Mat4::IDENTITY).unwrap();
        backend.set_model_matrix(6, Mat4::IDENTITY).unwrap();
        backend.flush(&FlushSlots {
            model: Some(BufferId(3)),
            ..Default::default()
        });
        let writes = backend.staged_write_data();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].offset, 64);
        assert_eq!(writes[0].data.len(), 6 * 64);
    }

    #[test]
    fn prepare_advances_and_marks_every_instance() {
        let backend = bound_backend(3);
        backend.set_animation_speed(1, 2.0).unwrap();
        backend.prepare_frame(0.5, Some(BufferId(9)));
        assert_relative_eq!(backend.animation_time(0).unwrap(), 0.5);
        assert_relative_eq!(backend.animation_time(1).unwrap(), 1.0);

        let uniform = backend.staged_write_data();
        assert_eq!(uniform[0].data.len(), 128);
        assert_eq!(u32::from_le_bytes(uniform[0].data[12..16].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(uniform[0].data[16..20].try_into().unwrap()), 2);

        backend.flush(&all_slots());
        let writes = backend.staged_write_data();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].data.len(), 3 * 32);
    }

    #[test]
    fn blend_commits_after_duration() {
        let backend = bound_backend(1);
        backend.blend_to_animation(0, 1, 0.2).unwrap();
        assert!(backend.is_blending(0).unwrap());
        backend.prepare_frame(0.1, None);
        assert_relative_eq!(backend.blend_progress(0).unwrap(), 0.5);
        backend.prepare_frame(0.1, None);
        assert!(!backend.is_blending(0).unwrap());
        assert_eq!(backend.current_clip(0).unwrap(), 1);
    }

    #[test]
    fn playback_rejects_unknown_clip_and_instance() {
        let backend = bound_backend(1);
        assert_eq!(
            backend.play_animation(0, 7, true),
            Err(AnimationError::UnknownClip { clip: 7, count: 2 })
        );
        assert_eq!(
            backend.cancel_blend(3),
            Err(AnimationError::InstanceOutOfRange { index: 3, count: 1 })
        );
    }

    #[test]
    fn set_bone_validates_index_and_order() {
        let backend = bound_backend(0);
        assert!(backend
            .set_bone(1, Bone {
                parent: 0,
                ..Default::default()
            })
            .is_ok());
        assert_eq!(
            backend.set_bone(5, Bone::default()),
            Err(AnimationError::BoneOutOfRange { index: 5, count: 2 })
        );
        assert!(matches!(
            backend.set_bone(0, Bone {
                parent: 1,
                ..Default::default()
            }),
            Err(AnimationError::BoneOrder { .. })
        ));
    }

    #[test]
    fn remove_moves_state_of_last_slot() {
        let backend = bound_backend(3);
        backend.play_animation(2, 1, false).unwrap();
        let translated = Mat4::from_translation(Vec3::Z);
        backend.set_model_matrix(2, translated).unwrap();

        let removed = backend.remove_instance(0).unwrap();
        assert!(removed.did_swap);
        assert_eq!(removed.swapped_from, 2);
        assert_eq!(backend.current_clip(0).unwrap(), 1);
        assert_eq!(backend.model_matrix(0), Some(translated));
        assert_eq!(backend.instance_count(), 2);
    }

    #[test]
    fn growth_reuploads_everything_after_rebuild() {
        let backend = bound_backend(8);
        backend.add_instance();
        assert!(backend.needs_rebuild());
        assert_eq!(backend.max_instances(), 16);
        assert_eq!(backend.flush(&all_slots()), 0);
        backend.clear_rebuild();
        assert_eq!(backend.flush(&all_slots()), 4);
        let writes = backend.staged_write_data();
        assert_eq!(writes[0].data.len(), 9 * 32);
        assert_eq!(writes[2].data.len(), 9 * 64);
    }
}
