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

use crate::error::{RenderError, ResourceError};
use crate::renderer::api::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;

/// Per-role buffer usage overrides for [`GpuBackend::init_bind_group`].
pub type UsageOverrides = HashMap<BindingRole, BufferUsage>;

/// Per-role buffer size overrides for [`GpuBackend::init_bind_group`].
pub type SizeOverrides = HashMap<BindingRole, u64>;

/// The GPU operations consumed by the scene orchestrator and the animators.
///
/// Implementations own every resource they hand out and are addressed only
/// through opaque handles. All methods take `&self`; implementations serialize
/// internally so a backend can be shared behind an `Arc` with worker threads.
pub trait GpuBackend: Send + Sync + Debug + 'static {
    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - Size, usage and label of the buffer.
    /// ## Returns
    /// The ID of the created buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a bind group from resolved resources.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Destroys a bind group. The bound resources are left alone.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Submits a batch of buffer writes in order.
    /// ## Arguments
    /// * `writes` - The writes to apply. A later write to an overlapping range wins.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If a write does not fit its buffer.
    fn write_buffers(&self, writes: &[BufferWrite]) -> Result<(), ResourceError>;

    /// Creates a square depth texture for the shadow map.
    fn create_shadow_depth_texture(&self, size: u32) -> Result<TextureId, ResourceError>;

    /// Creates a depth comparison sampler for shadow lookups.
    fn create_comparison_sampler(&self) -> Result<SamplerId, ResourceError>;

    /// Registers render and compute pipelines.
    fn register_pipelines(&self, descriptors: &[PipelineDescriptor]) -> Result<(), ResourceError>;

    /// Registers the depth-only pipeline used by the shadow pass.
    fn register_shadow_pipeline(&self, descriptor: &PipelineDescriptor)
        -> Result<(), ResourceError>;

    /// Looks up a registered pipeline.
    fn pipeline(&self, key: &PipelineKey) -> Option<PipelineId>;

    /// Opens the compute encoder of the frame.
    fn begin_compute_frame(&self) -> Result<(), RenderError>;

    /// Dispatches a compute pipeline.
    /// ## Arguments
    /// * `pipeline` - Key of a registered compute pipeline.
    /// * `provider` - The bind group provider whose resources the kernel reads and writes.
    /// * `workgroups` - Number of workgroups along X, Y and Z.
    fn dispatch_compute(
        &self,
        pipeline: &PipelineKey,
        provider: &BindGroupProvider,
        workgroups: [u32; 3],
    ) -> Result<(), RenderError>;

    /// Submits the compute encoder.
    fn end_compute_frame(&self) -> Result<(), RenderError>;

    /// Opens the shadow encoder.
    fn begin_shadow_frame(&self) -> Result<(), RenderError>;

    /// Begins the depth-only pass into the shadow map.
    fn begin_shadow_pass(&self) -> Result<(), RenderError>;

    /// Records a direct depth-only draw.
    fn shadow_draw_call(&self, call: &DrawCall) -> Result<(), RenderError>;

    /// Records an indirect depth-only draw reading its arguments from `indirect`.
    fn shadow_draw_call_indirect(&self, call: &DrawCall, indirect: BufferId)
        -> Result<(), RenderError>;

    /// Ends the depth-only pass.
    fn end_shadow_pass(&self) -> Result<(), RenderError>;

    /// Submits the shadow encoder.
    fn end_shadow_frame(&self) -> Result<(), RenderError>;

    /// Acquires the frame target and opens the main pass.
    fn begin_frame(&self) -> Result<(), RenderError>;

    /// Records a direct instanced draw.
    fn draw_call(&self, call: &DrawCall) -> Result<(), RenderError>;

    /// Records an indirect draw reading its arguments from `indirect`.
    fn draw_call_indirect(&self, call: &DrawCall, indirect: BufferId) -> Result<(), RenderError>;

    /// Closes the main pass and submits it.
    fn end_frame(&self) -> Result<(), RenderError>;

    /// Presents the frame target.
    fn present(&self) -> Result<(), RenderError>;

    /// Creates the missing buffers of `provider` for `layout` and (re)builds its bind group.
    ///
    /// Entries the provider already carries are left untouched, so shared
    /// buffers are bound as-is. Missing buffer entries are created with the
    /// role's usage override or the kind's default usage, and the role's size
    /// override or the layout's minimum size; the provider owns them. Missing
    /// texture or sampler entries cannot be created implicitly.
    /// ## Errors
    /// * `ResourceError::MissingBinding` - A texture or sampler role has no resource.
    /// * Any error from buffer or bind group creation.
    fn init_bind_group(
        &self,
        provider: &mut BindGroupProvider,
        layout: &BindGroupLayoutDescriptor,
        usage_overrides: &UsageOverrides,
        size_overrides: &SizeOverrides,
    ) -> Result<BindGroupId, ResourceError> {
        for entry in &layout.entries {
            if provider.has_role(entry.role) {
                continue;
            }
            let usage = match usage_overrides.get(&entry.role) {
                Some(usage) => *usage,
                None => entry
                    .kind
                    .default_usage()
                    .ok_or(ResourceError::MissingBinding(entry.role))?,
            };
            let size = size_overrides
                .get(&entry.role)
                .copied()
                .unwrap_or(entry.min_size)
                .max(4);
            let buffer = self.create_buffer(&BufferDescriptor {
                label: Some(Cow::Owned(format!("{}::{:?}", provider.label(), entry.role))),
                size,
                usage,
            })?;
            provider.insert_owned_buffer(entry.binding, entry.role, buffer);
        }

        if let Some(old) = provider.take_bind_group() {
            self.destroy_bind_group(old)?;
        }
        let id = self.create_bind_group(&provider.descriptor(layout))?;
        provider.set_bind_group(id);
        Ok(id)
    }

    /// Destroys the bind group of `provider` and every buffer it owns.
    ///
    /// Shared entries are dropped from the provider without destroying the
    /// underlying buffer.
    fn release_bind_group(&self, provider: &mut BindGroupProvider) -> Result<(), ResourceError> {
        if let Some(id) = provider.take_bind_group() {
            self.destroy_bind_group(id)?;
        }
        for buffer in provider.drain_owned_buffers() {
            self.destroy_buffer(buffer)?;
        }
        Ok(())
    }
}
