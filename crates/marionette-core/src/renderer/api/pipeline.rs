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

//! Pipeline keys and registration descriptors.
//!
//! Pipelines are registered with the backend under a string key and looked up
//! by that key when a draw or dispatch is recorded.

use super::bind_group::ShaderLayout;
use std::fmt;

/// The name under which a pipeline is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineKey(pub String);

impl PipelineKey {
    /// Creates a key from anything string-like.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PipelineKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// An opaque handle to a registered pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u64);

/// The kind of work a pipeline performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// A vertex + fragment pipeline used by the main pass.
    Render,
    /// A depth-only pipeline used by the shadow pass.
    Shadow,
    /// A compute pipeline.
    Compute,
}

/// Everything the backend needs to register a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    /// Registration key.
    pub key: PipelineKey,
    /// What the pipeline does.
    pub kind: PipelineKind,
    /// Shader binding metadata.
    pub layout: ShaderLayout,
    /// Shader entry point.
    pub entry_point: String,
}

impl PipelineDescriptor {
    /// Creates a descriptor with the conventional entry point for `kind`.
    pub fn new(key: impl Into<PipelineKey>, kind: PipelineKind, layout: ShaderLayout) -> Self {
        let entry_point = match kind {
            PipelineKind::Render => "vs_main",
            PipelineKind::Shadow => "vs_shadow",
            PipelineKind::Compute => "cs_main",
        };
        Self {
            key: key.into(),
            kind,
            layout,
            entry_point: entry_point.to_owned(),
        }
    }
}

/// A compute program attached to a model's animator.
#[derive(Debug, Clone)]
pub struct ComputeProgram {
    /// Key of the registered compute pipeline.
    pub pipeline: PipelineKey,
    /// Threads per workgroup along X; dispatches cover one thread per instance.
    pub workgroup_size: u32,
    /// Binding metadata for the animator's compute bind group.
    pub layout: ShaderLayout,
}

impl ComputeProgram {
    /// Number of workgroups needed to cover `instance_count` threads.
    pub fn workgroups_for(&self, instance_count: u32) -> [u32; 3] {
        [instance_count.div_ceil(self.workgroup_size.max(1)), 1, 1]
    }
}
