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

use marionette_core::renderer::api::{BindGroupId, BufferId, DrawCall, PipelineKey};
use std::ops::Range;

/// A draw as the headless device executed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Pipeline the draw used.
    pub pipeline: PipelineKey,
    /// Indices drawn per instance.
    pub index_range: Range<u32>,
    /// Instances drawn. For indirect draws this is the count read back from
    /// the arguments buffer at record time.
    pub instance_count: u32,
    /// Bound groups, as `(group index, bind group)`.
    pub bind_groups: Vec<(u32, BindGroupId)>,
    /// The arguments buffer, for indirect draws.
    pub indirect: Option<BufferId>,
}

impl DrawRecord {
    pub(crate) fn direct(call: &DrawCall) -> Self {
        Self {
            pipeline: call.pipeline.clone(),
            index_range: call.index_range.clone(),
            instance_count: call.instance_count,
            bind_groups: call.bind_groups.clone(),
            indirect: None,
        }
    }

    pub(crate) fn indirect(call: &DrawCall, buffer: BufferId, instance_count: u32) -> Self {
        Self {
            instance_count,
            indirect: Some(buffer),
            ..Self::direct(call)
        }
    }

    /// Returns `true` for indirect draws.
    pub fn is_indirect(&self) -> bool {
        self.indirect.is_some()
    }
}

/// One entry of the headless command log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    /// A buffer write was applied.
    WriteBuffer {
        /// Target buffer.
        buffer: BufferId,
        /// Byte offset.
        offset: u64,
        /// Bytes written.
        len: u64,
    },
    /// Compute encoder opened.
    BeginComputeFrame,
    /// Compute pipeline dispatched.
    Dispatch {
        /// The dispatched pipeline.
        pipeline: PipelineKey,
        /// Workgroup counts.
        workgroups: [u32; 3],
    },
    /// Compute encoder submitted.
    EndComputeFrame,
    /// Shadow encoder opened.
    BeginShadowFrame,
    /// Depth-only pass opened.
    BeginShadowPass,
    /// Depth-only draw.
    ShadowDraw(DrawRecord),
    /// Depth-only pass closed.
    EndShadowPass,
    /// Shadow encoder submitted.
    EndShadowFrame,
    /// Main pass opened.
    BeginFrame,
    /// Main-pass draw.
    Draw(DrawRecord),
    /// Main pass submitted.
    EndFrame,
    /// Frame presented.
    Present,
}
