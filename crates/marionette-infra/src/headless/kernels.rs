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

//! CPU stand-ins for compute shaders.
//!
//! A kernel receives the provider that was dispatched and reads or writes its
//! buffers by role, exactly like the shader would through its bind group.

use super::backend::HeadlessBuffer;
use bytes::{Buf, BufMut};
use marionette_core::frustum::{Frustum, Plane};
use marionette_core::math::{Mat4, Quat, Vec3, Vec4};
use marionette_core::renderer::api::{BindGroupProvider, BindingRole, BufferId};
use marionette_core::renderer::layout::{get_mat4, put_mat4, put_vec4, IndirectArgs};
use marionette_core::{RenderError, ResourceError};
use std::collections::HashMap;
use std::sync::Arc;

/// A simulated compute program.
pub type ComputeKernel =
    Arc<dyn Fn(&mut KernelContext<'_>) -> Result<(), RenderError> + Send + Sync>;

/// The resources visible to one kernel invocation.
pub struct KernelContext<'a> {
    provider: &'a BindGroupProvider,
    buffers: &'a mut HashMap<BufferId, HeadlessBuffer>,
    workgroups: [u32; 3],
}

impl<'a> KernelContext<'a> {
    pub(crate) fn new(
        provider: &'a BindGroupProvider,
        buffers: &'a mut HashMap<BufferId, HeadlessBuffer>,
        workgroups: [u32; 3],
    ) -> Self {
        Self {
            provider,
            buffers,
            workgroups,
        }
    }

    /// The dispatched provider.
    pub fn provider(&self) -> &BindGroupProvider {
        self.provider
    }

    /// Workgroup counts of the dispatch.
    pub fn workgroups(&self) -> [u32; 3] {
        self.workgroups
    }

    fn missing(role: BindingRole) -> RenderError {
        RenderError::ResourceError(ResourceError::MissingBinding(role))
    }

    /// The contents of the buffer bound for `role`, if any.
    pub fn try_read(&self, role: BindingRole) -> Option<&[u8]> {
        let id = self.provider.buffer(role)?;
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    /// The contents of the buffer bound for `role`.
    pub fn read(&self, role: BindingRole) -> Result<&[u8], RenderError> {
        self.try_read(role).ok_or_else(|| Self::missing(role))
    }

    fn buffer_mut(&mut self, role: BindingRole) -> Result<(BufferId, &mut Vec<u8>), RenderError> {
        let id = self.provider.buffer(role).ok_or_else(|| Self::missing(role))?;
        let buffer = self
            .buffers
            .get_mut(&id)
            .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
        Ok((id, &mut buffer.data))
    }

    /// Copies `bytes` into the buffer bound for `role` at `offset`.
    pub fn write(
        &mut self,
        role: BindingRole,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), RenderError> {
        let (id, data) = self.buffer_mut(role)?;
        let end = offset + bytes.len() as u64;
        if end > data.len() as u64 {
            return Err(ResourceError::OutOfBounds {
                buffer: id,
                offset,
                len: bytes.len() as u64,
                size: data.len() as u64,
            }
            .into());
        }
        data[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }

    /// Adds `value` to the little-endian `u32` at `offset`, like `atomicAdd`.
    pub fn atomic_add_u32(
        &mut self,
        role: BindingRole,
        offset: u64,
        value: u32,
    ) -> Result<u32, RenderError> {
        let (id, data) = self.buffer_mut(role)?;
        let start = offset as usize;
        let Some(word) = data.get_mut(start..start + 4) else {
            return Err(ResourceError::OutOfBounds {
                buffer: id,
                offset,
                len: 4,
                size: data.len() as u64,
            }
            .into());
        };
        let previous = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        word.copy_from_slice(&previous.wrapping_add(value).to_le_bytes());
        Ok(previous)
    }
}

fn get_vec4<B: Buf>(buf: &mut B) -> Vec4 {
    Vec4::new(
        buf.get_f32_le(),
        buf.get_f32_le(),
        buf.get_f32_le(),
        buf.get_f32_le(),
    )
}

fn too_short(role: BindingRole, needed: usize, got: usize) -> RenderError {
    RenderError::RenderingFailed(format!(
        "{role:?} holds {got} bytes, the kernel needs {needed}"
    ))
}

/// The animator compute pass: resolves per-instance transforms, culls them
/// against the frustum in the animator uniform and compacts the survivors.
///
/// Reads the simple layout (112-byte uniform, 64-byte instance records) or,
/// when the provider binds [`BindingRole::ModelData`], the skeletal layout
/// (128-byte uniform, model matrices). Simple instances have their rotation
/// integrated by `rotation_speed * delta_time` and written back, the way the
/// shader keeps its own state. Visible model matrices are packed at the front
/// of [`BindingRole::AnimatorOutput`], one stride per instance; skeletal
/// strides reserve room for the bone palette, which this kernel leaves
/// untouched. The visible count is added to the indirect arguments when the
/// provider binds [`BindingRole::IndirectArgs`].
///
/// All-zero planes never reject anything, so a scene without culling draws
/// every instance.
pub fn frustum_cull_kernel() -> ComputeKernel {
    Arc::new(cull_instances)
}

fn cull_instances(ctx: &mut KernelContext<'_>) -> Result<(), RenderError> {
    let skeletal = ctx.provider().has_role(BindingRole::ModelData);
    let planes_offset = if skeletal { 32 } else { 16 };

    let uniform = ctx.read(BindingRole::AnimatorUniform)?;
    if uniform.len() < planes_offset + 96 {
        return Err(too_short(
            BindingRole::AnimatorUniform,
            planes_offset + 96,
            uniform.len(),
        ));
    }
    let mut header = uniform;
    let count = header.get_u32_le() as usize;
    let delta_time = header.get_f32_le();
    let radius = header.get_f32_le();
    let bone_count = if skeletal { header.get_u32_le() } else { 0 };

    let mut plane_bytes = &uniform[planes_offset..planes_offset + 96];
    let planes = std::array::from_fn(|_| {
        let v = get_vec4(&mut plane_bytes);
        Plane {
            normal: v.truncate(),
            distance: v.w,
        }
    });
    let frustum = Frustum::from_planes(planes);

    let transforms = if skeletal {
        model_transforms(ctx, count)?
    } else {
        integrate_instances(ctx, count, delta_time)?
    };

    let stride = (1 + bone_count as u64) * 64;
    let mut visible = 0u32;
    for transform in &transforms {
        let center: Vec3 = transform.w_axis.truncate();
        if !frustum.intersects_sphere(center, radius) {
            continue;
        }
        let mut bytes = Vec::with_capacity(64);
        put_mat4(&mut bytes, transform);
        ctx.write(BindingRole::AnimatorOutput, visible as u64 * stride, &bytes)?;
        visible += 1;
    }

    if ctx.provider().has_role(BindingRole::IndirectArgs) {
        ctx.atomic_add_u32(
            BindingRole::IndirectArgs,
            IndirectArgs::INSTANCE_COUNT_OFFSET as u64,
            visible,
        )?;
    }
    log::trace!("cull kernel: {visible}/{count} instances visible");
    Ok(())
}

fn model_transforms(ctx: &KernelContext<'_>, count: usize) -> Result<Vec<Mat4>, RenderError> {
    let models = ctx.read(BindingRole::ModelData)?;
    if models.len() < count * 64 {
        return Err(too_short(BindingRole::ModelData, count * 64, models.len()));
    }
    let mut cursor = models;
    Ok((0..count).map(|_| get_mat4(&mut cursor)).collect())
}

fn integrate_instances(
    ctx: &mut KernelContext<'_>,
    count: usize,
    delta_time: f32,
) -> Result<Vec<Mat4>, RenderError> {
    let records = ctx.read(BindingRole::InstanceData)?;
    if records.len() < count * 64 {
        return Err(too_short(BindingRole::InstanceData, count * 64, records.len()));
    }

    let mut cursor = records;
    let mut transforms = Vec::with_capacity(count);
    let mut rotations = Vec::with_capacity(count);
    for _ in 0..count {
        let speed = get_vec4(&mut cursor).truncate();
        let rotation = Quat::from_vec4(get_vec4(&mut cursor));
        let position = get_vec4(&mut cursor).truncate();
        let scale = get_vec4(&mut cursor).truncate();

        let rotation = if speed == Vec3::ZERO {
            rotation
        } else {
            (Quat::from_scaled_axis(speed * delta_time) * rotation).normalize()
        };
        rotations.push(rotation);
        transforms.push(Mat4::from_scale_rotation_translation(scale, rotation, position));
    }

    for (index, rotation) in rotations.into_iter().enumerate() {
        let mut bytes = Vec::with_capacity(16);
        put_vec4(&mut bytes, Vec4::from(rotation));
        ctx.write(BindingRole::InstanceData, index as u64 * 64 + 16, &bytes)?;
    }
    Ok(transforms)
}

/// The Forward+ light culling pass.
///
/// Conservative: every active light is assigned to every tile, up to the
/// per-tile capacity implied by the index buffer size. The whole grid is
/// rewritten on each dispatch, so a frame with no lights clears the lists a
/// previous frame left behind.
pub fn light_cull_kernel() -> ComputeKernel {
    Arc::new(cull_lights)
}

fn cull_lights(ctx: &mut KernelContext<'_>) -> Result<(), RenderError> {
    let uniform = ctx.read(BindingRole::LightCullUniforms)?;
    if uniform.len() < 148 {
        return Err(too_short(BindingRole::LightCullUniforms, 148, uniform.len()));
    }
    let mut fields = &uniform[128..];
    let tiles_x = fields.get_u32_le();
    let tiles_y = fields.get_u32_le();
    let _screen_width = fields.get_f32_le();
    let _screen_height = fields.get_f32_le();
    let light_count = fields.get_u32_le();

    let tiles = (tiles_x * tiles_y) as usize;
    if tiles == 0 {
        return Ok(());
    }
    let index_len = ctx.read(BindingRole::TileLightIndices)?.len();
    let per_tile = (index_len / 4 / tiles) as u32;
    let assigned = light_count.min(per_tile);

    let mut grid = Vec::with_capacity(tiles * 8);
    let mut indices = Vec::with_capacity(tiles * assigned as usize * 4);
    for tile in 0..tiles as u32 {
        grid.put_u32_le(tile * per_tile);
        grid.put_u32_le(assigned);
    }
    for _ in 0..tiles {
        for light in 0..assigned {
            indices.put_u32_le(light);
        }
        for _ in assigned..per_tile {
            indices.put_u32_le(0);
        }
    }
    ctx.write(BindingRole::TileLightGrid, 0, &grid)?;
    ctx.write(BindingRole::TileLightIndices, 0, &indices)?;
    log::trace!("light cull kernel: {light_count} lights over {tiles} tiles");
    Ok(())
}
