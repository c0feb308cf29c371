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

//! Draw call records handed to the GPU backend.

use super::bind_group::BindGroupId;
use super::buffer::BufferId;
use super::pipeline::PipelineKey;
use std::ops::Range;

/// The vertex and index buffers of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    /// Vertex buffer.
    pub vertex: BufferId,
    /// 32-bit index buffer.
    pub index: BufferId,
    /// Total number of indices.
    pub index_count: u32,
}

/// One indexed, instanced draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    /// Pipeline to draw with.
    pub pipeline: PipelineKey,
    /// Mesh to draw.
    pub mesh: MeshBuffers,
    /// Range of indices to draw.
    pub index_range: Range<u32>,
    /// `(group, bind group)` pairs.
    pub bind_groups: Vec<(u32, BindGroupId)>,
    /// Instance count for direct draws; ignored by indirect draws.
    pub instance_count: u32,
}

impl DrawCall {
    /// Number of indices drawn.
    pub fn index_count(&self) -> u32 {
        self.index_range.end.saturating_sub(self.index_range.start)
    }
}
