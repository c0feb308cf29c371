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

use super::command::{DrawRecord, RecordedCommand};
use super::kernels::{ComputeKernel, KernelContext};
use marionette_core::renderer::api::*;
use marionette_core::renderer::layout::IndirectArgs;
use marionette_core::renderer::GpuBackend;
use marionette_core::{RenderError, ResourceError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug)]
pub(crate) struct HeadlessBuffer {
    pub(crate) label: String,
    pub(crate) usage: BufferUsage,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pass {
    #[default]
    Idle,
    Compute,
    ShadowFrame,
    ShadowPass,
    Main,
}

#[derive(Default)]
struct HeadlessState {
    buffers: HashMap<BufferId, HeadlessBuffer>,
    bind_groups: HashMap<BindGroupId, BindGroupDescriptor>,
    textures: HashMap<TextureId, u32>,
    samplers: Vec<SamplerId>,
    pipelines: HashMap<PipelineKey, (PipelineId, PipelineKind)>,
    kernels: HashMap<PipelineKey, ComputeKernel>,
    commands: Vec<RecordedCommand>,
    pass: Pass,
    device_lost: bool,
}

impl HeadlessState {
    fn expect_pass(&self, expected: Pass, operation: &str) -> Result<(), RenderError> {
        if self.pass == expected {
            Ok(())
        } else {
            Err(RenderError::RenderingFailed(format!(
                "{operation} called during {:?}, expected {expected:?}",
                self.pass
            )))
        }
    }

    fn transition(
        &mut self,
        from: Pass,
        to: Pass,
        command: RecordedCommand,
    ) -> Result<(), RenderError> {
        if self.device_lost {
            return Err(RenderError::DeviceLost);
        }
        self.expect_pass(from, &format!("{command:?}"))?;
        self.pass = to;
        self.commands.push(command);
        Ok(())
    }

    fn check_pipeline(&self, key: &PipelineKey, kind: PipelineKind) -> Result<(), RenderError> {
        match self.pipelines.get(key) {
            Some((_, registered)) if *registered == kind => Ok(()),
            Some((_, registered)) => Err(RenderError::RenderingFailed(format!(
                "pipeline '{key}' is a {registered:?} pipeline, not {kind:?}"
            ))),
            None => Err(ResourceError::PipelineNotRegistered(key.to_string()).into()),
        }
    }

    fn check_bind_groups(&self, call: &DrawCall) -> Result<(), RenderError> {
        for (group, id) in &call.bind_groups {
            if !self.bind_groups.contains_key(id) {
                return Err(RenderError::RenderingFailed(format!(
                    "bind group {id:?} at group {group} does not exist"
                )));
            }
        }
        Ok(())
    }

    fn indirect_args(&self, buffer: BufferId) -> Result<IndirectArgs, RenderError> {
        let entry = self
            .buffers
            .get(&buffer)
            .ok_or(RenderError::ResourceError(ResourceError::NotFound))?;
        IndirectArgs::decode(&entry.data).ok_or_else(|| {
            RenderError::RenderingFailed(format!(
                "indirect buffer {buffer:?} holds {} bytes",
                entry.data.len()
            ))
        })
    }
}

/// A [`GpuBackend`] that lives entirely in host memory.
///
/// Buffers are plain byte vectors, bind groups are remembered descriptors and
/// every frame-level call is appended to a command log that tests inspect.
/// Pass ordering is enforced: drawing outside an open pass, or dispatching
/// outside a compute frame, is rejected the way a real encoder would reject it.
///
/// Compute dispatches run the [`ComputeKernel`] registered for the pipeline
/// key, if any; a dispatch without a kernel is recorded and otherwise ignored.
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
    next_buffer_id: AtomicUsize,
    next_bind_group_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_sampler_id: AtomicUsize,
    next_pipeline_id: AtomicU64,
}

impl fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeadlessBackend")
            .field("buffers", &state.buffers.len())
            .field("bind_groups", &state.bind_groups.len())
            .field("pipelines", &state.pipelines.len())
            .field("kernels", &state.kernels.len())
            .field("commands", &state.commands.len())
            .finish()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Creates an empty device with no kernels.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
            next_buffer_id: AtomicUsize::new(0),
            next_bind_group_id: AtomicUsize::new(0),
            next_texture_id: AtomicUsize::new(0),
            next_sampler_id: AtomicUsize::new(0),
            next_pipeline_id: AtomicU64::new(0),
        }
    }

    /// Registers the kernel run when `pipeline` is dispatched.
    pub fn register_kernel(&self, pipeline: impl Into<PipelineKey>, kernel: ComputeKernel) {
        self.state.lock().kernels.insert(pipeline.into(), kernel);
    }

    /// Builder form of [`register_kernel`](Self::register_kernel).
    pub fn with_kernel(self, pipeline: impl Into<PipelineKey>, kernel: ComputeKernel) -> Self {
        self.register_kernel(pipeline, kernel);
        self
    }

    /// Simulates a device loss: every later pass transition fails with
    /// [`RenderError::DeviceLost`]. Resources can still be released.
    pub fn lose_device(&self) {
        log::warn!("HeadlessBackend: device lost");
        self.state.lock().device_lost = true;
    }

    /// A copy of a buffer's contents.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&id).map(|b| b.data.clone())
    }

    /// Size in bytes of a live buffer.
    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.state.lock().buffers.get(&id).map(|b| b.data.len() as u64)
    }

    /// Label and usage of a live buffer.
    pub fn buffer_info(&self, id: BufferId) -> Option<(String, BufferUsage)> {
        self.state
            .lock()
            .buffers
            .get(&id)
            .map(|b| (b.label.clone(), b.usage))
    }

    /// The live buffer created under `label`, if exactly one exists.
    pub fn find_buffer(&self, label: &str) -> Option<BufferId> {
        let state = self.state.lock();
        let mut matches = state
            .buffers
            .iter()
            .filter(|(_, b)| b.label == label)
            .map(|(id, _)| *id);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of live bind groups.
    pub fn live_bind_groups(&self) -> usize {
        self.state.lock().bind_groups.len()
    }

    /// The descriptor a live bind group was created from.
    pub fn bind_group(&self, id: BindGroupId) -> Option<BindGroupDescriptor> {
        self.state.lock().bind_groups.get(&id).cloned()
    }

    /// The command log since creation or the last [`take_commands`](Self::take_commands).
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state.lock().commands.clone()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    /// Main-pass draws in the log.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Draw(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Shadow-pass draws in the log.
    pub fn shadow_draws(&self) -> Vec<DrawRecord> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::ShadowDraw(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Dispatched pipelines in the log, in order.
    pub fn dispatches(&self) -> Vec<PipelineKey> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Dispatch { pipeline, .. } => Some(pipeline.clone()),
                _ => None,
            })
            .collect()
    }

    fn register(&self, state: &mut HeadlessState, descriptor: &PipelineDescriptor) {
        if state.pipelines.contains_key(&descriptor.key) {
            return;
        }
        let id = PipelineId(self.next_pipeline_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "HeadlessBackend: Registered {:?} pipeline '{}' ({}) as {id:?}",
            descriptor.kind,
            descriptor.key,
            descriptor.entry_point
        );
        state
            .pipelines
            .insert(descriptor.key.clone(), (id, descriptor.kind));
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if descriptor.size == 0 {
            return Err(ResourceError::BackendError(format!(
                "buffer '{}' has zero size",
                descriptor.label.as_deref().unwrap_or_default()
            )));
        }
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let label = descriptor.label.as_deref().unwrap_or_default().to_owned();
        log::trace!(
            "HeadlessBackend: Created buffer '{label}' with ID: {id:?}, size: {} bytes",
            descriptor.size
        );
        self.state.lock().buffers.insert(
            id,
            HeadlessBuffer {
                label,
                usage: descriptor.usage,
                data: vec![0; descriptor.size as usize],
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        match self.state.lock().buffers.remove(&id) {
            Some(_) => {
                log::trace!("HeadlessBackend: Destroyed buffer with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state.lock();
        for (_, resource) in &descriptor.entries {
            let exists = match resource {
                BindingResource::Buffer(id) => state.buffers.contains_key(id),
                BindingResource::Texture(id) => state.textures.contains_key(id),
                BindingResource::Sampler(id) => state.samplers.contains(id),
            };
            if !exists {
                return Err(ResourceError::InvalidHandle);
            }
        }
        let id = BindGroupId(self.next_bind_group_id.fetch_add(1, Ordering::Relaxed));
        state.bind_groups.insert(id, descriptor.clone());
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        self.state
            .lock()
            .bind_groups
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_buffers(&self, writes: &[BufferWrite]) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        for write in writes {
            let entry = state
                .buffers
                .get(&write.buffer)
                .ok_or(ResourceError::NotFound)?;
            let size = entry.data.len() as u64;
            if write.end() > size {
                return Err(ResourceError::OutOfBounds {
                    buffer: write.buffer,
                    offset: write.offset,
                    len: write.data.len() as u64,
                    size,
                });
            }
        }
        for write in writes {
            if let Some(entry) = state.buffers.get_mut(&write.buffer) {
                let start = write.offset as usize;
                entry.data[start..start + write.data.len()].copy_from_slice(&write.data);
            }
            state.commands.push(RecordedCommand::WriteBuffer {
                buffer: write.buffer,
                offset: write.offset,
                len: write.data.len() as u64,
            });
        }
        Ok(())
    }

    fn create_shadow_depth_texture(&self, size: u32) -> Result<TextureId, ResourceError> {
        if size == 0 {
            return Err(ResourceError::BackendError(
                "shadow map size must be non-zero".to_owned(),
            ));
        }
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        self.state.lock().textures.insert(id, size);
        Ok(id)
    }

    fn create_comparison_sampler(&self) -> Result<SamplerId, ResourceError> {
        let id = SamplerId(self.next_sampler_id.fetch_add(1, Ordering::Relaxed));
        self.state.lock().samplers.push(id);
        Ok(id)
    }

    fn register_pipelines(&self, descriptors: &[PipelineDescriptor]) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        for descriptor in descriptors {
            self.register(&mut state, descriptor);
        }
        Ok(())
    }

    fn register_shadow_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<(), ResourceError> {
        if descriptor.kind != PipelineKind::Shadow {
            return Err(ResourceError::BackendError(format!(
                "'{}' is not a shadow pipeline",
                descriptor.key
            )));
        }
        let mut state = self.state.lock();
        self.register(&mut state, descriptor);
        Ok(())
    }

    fn pipeline(&self, key: &PipelineKey) -> Option<PipelineId> {
        self.state.lock().pipelines.get(key).map(|(id, _)| *id)
    }

    fn begin_compute_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::Idle, Pass::Compute, RecordedCommand::BeginComputeFrame)
    }

    fn dispatch_compute(
        &self,
        pipeline: &PipelineKey,
        provider: &BindGroupProvider,
        workgroups: [u32; 3],
    ) -> Result<(), RenderError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.expect_pass(Pass::Compute, "dispatch_compute")?;
        state.check_pipeline(pipeline, PipelineKind::Compute)?;
        if provider.bind_group().is_none() {
            return Err(RenderError::RenderingFailed(format!(
                "provider '{}' has no bind group",
                provider.label()
            )));
        }
        state.commands.push(RecordedCommand::Dispatch {
            pipeline: pipeline.clone(),
            workgroups,
        });
        if workgroups.contains(&0) {
            return Ok(());
        }
        if let Some(kernel) = state.kernels.get(pipeline).cloned() {
            let mut ctx = KernelContext::new(provider, &mut state.buffers, workgroups);
            kernel(&mut ctx)?;
        }
        Ok(())
    }

    fn end_compute_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::Compute, Pass::Idle, RecordedCommand::EndComputeFrame)
    }

    fn begin_shadow_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::Idle, Pass::ShadowFrame, RecordedCommand::BeginShadowFrame)
    }

    fn begin_shadow_pass(&self) -> Result<(), RenderError> {
        self.state.lock().transition(
            Pass::ShadowFrame,
            Pass::ShadowPass,
            RecordedCommand::BeginShadowPass,
        )
    }

    fn shadow_draw_call(&self, call: &DrawCall) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.expect_pass(Pass::ShadowPass, "shadow_draw_call")?;
        state.check_pipeline(&call.pipeline, PipelineKind::Shadow)?;
        state.check_bind_groups(call)?;
        state
            .commands
            .push(RecordedCommand::ShadowDraw(DrawRecord::direct(call)));
        Ok(())
    }

    fn shadow_draw_call_indirect(
        &self,
        call: &DrawCall,
        indirect: BufferId,
    ) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.expect_pass(Pass::ShadowPass, "shadow_draw_call_indirect")?;
        state.check_pipeline(&call.pipeline, PipelineKind::Shadow)?;
        state.check_bind_groups(call)?;
        let args = state.indirect_args(indirect)?;
        state.commands.push(RecordedCommand::ShadowDraw(DrawRecord::indirect(
            call,
            indirect,
            args.instance_count,
        )));
        Ok(())
    }

    fn end_shadow_pass(&self) -> Result<(), RenderError> {
        self.state.lock().transition(
            Pass::ShadowPass,
            Pass::ShadowFrame,
            RecordedCommand::EndShadowPass,
        )
    }

    fn end_shadow_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::ShadowFrame, Pass::Idle, RecordedCommand::EndShadowFrame)
    }

    fn begin_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::Idle, Pass::Main, RecordedCommand::BeginFrame)
    }

    fn draw_call(&self, call: &DrawCall) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.expect_pass(Pass::Main, "draw_call")?;
        state.check_pipeline(&call.pipeline, PipelineKind::Render)?;
        state.check_bind_groups(call)?;
        state
            .commands
            .push(RecordedCommand::Draw(DrawRecord::direct(call)));
        Ok(())
    }

    fn draw_call_indirect(&self, call: &DrawCall, indirect: BufferId) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.expect_pass(Pass::Main, "draw_call_indirect")?;
        state.check_pipeline(&call.pipeline, PipelineKind::Render)?;
        state.check_bind_groups(call)?;
        let args = state.indirect_args(indirect)?;
        state.commands.push(RecordedCommand::Draw(DrawRecord::indirect(
            call,
            indirect,
            args.instance_count,
        )));
        Ok(())
    }

    fn end_frame(&self) -> Result<(), RenderError> {
        self.state
            .lock()
            .transition(Pass::Main, Pass::Idle, RecordedCommand::EndFrame)
    }

    fn present(&self) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.expect_pass(Pass::Idle, "present")?;
        state.commands.push(RecordedCommand::Present);
        Ok(())
    }
}
