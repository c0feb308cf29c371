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

//! Shader binding metadata and role-tagged bind-group providers.
//!
//! Shaders describe their bindings as a [`ShaderLayout`]: a list of groups,
//! each entry tagged with a [`BindingRole`]. The orchestrator never hard-codes
//! group or binding indices; it looks up the provider that carries a role and
//! binds it at whatever slot the shader declared.
//!
//! A [`BindGroupProvider`] holds the concrete resources for one group. Each
//! entry is either [`Ownership::Owned`] (the provider created the buffer and
//! destroys it on release) or [`Ownership::Shared`] (a non-owning reference to
//! a buffer created by another provider, e.g. an animator's compute output
//! bound again as the vertex-stage instance buffer).

use super::buffer::{BufferId, BufferUsage};
use super::texture::{SamplerId, TextureId};

/// The logical purpose of a binding, used to resolve providers at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingRole {
    /// Camera uniform (view-projection and eye position).
    Camera,
    /// Per-material parameters.
    Material,
    /// Packed light buffer (header + light records).
    Lights,
    /// Shadow sampling data for the main pass (light matrix, texel size, biases).
    ShadowData,
    /// Light view-projection used by the shadow depth pass.
    ShadowDepth,
    /// The shadow depth texture.
    ShadowMap,
    /// The comparison sampler used to sample [`BindingRole::ShadowMap`].
    ShadowSampler,
    /// Per-tile uniform read by the fragment stage.
    TileUniforms,
    /// Uniform consumed by the light culling compute pass.
    LightCullUniforms,
    /// Per-tile (offset, count) pairs written by light culling.
    TileLightGrid,
    /// Flattened per-tile light index lists written by light culling.
    TileLightIndices,
    /// Per-model effect parameters.
    Effect,
    /// Per-frame animator uniform (instance count, delta time, frustum).
    AnimatorUniform,
    /// Per-instance animator records.
    InstanceData,
    /// Bone array of a skeletal model.
    BoneInfo,
    /// Packed animation clip buffer.
    AnimationClips,
    /// Per-instance model matrices of a skeletal model.
    ModelData,
    /// Compacted per-instance transforms produced by the animator compute pass.
    AnimatorOutput,
    /// Indirect draw arguments filled by the animator compute pass.
    IndirectArgs,
}

/// How a binding is accessed by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A uniform buffer.
    Uniform,
    /// A storage buffer.
    Storage {
        /// Whether the shader only reads the buffer.
        read_only: bool,
    },
    /// A storage buffer that doubles as indirect draw arguments.
    Indirect,
    /// A depth texture.
    DepthTexture,
    /// A comparison sampler.
    ComparisonSampler,
}

impl BindingKind {
    /// The buffer usage a provider requests when it creates a buffer for this kind.
    ///
    /// Returns `None` for texture and sampler kinds; those resources are never
    /// created implicitly.
    pub fn default_usage(&self) -> Option<BufferUsage> {
        match self {
            BindingKind::Uniform => Some(BufferUsage::UNIFORM | BufferUsage::COPY_DST),
            BindingKind::Storage { .. } => Some(BufferUsage::STORAGE | BufferUsage::COPY_DST),
            BindingKind::Indirect => Some(
                BufferUsage::STORAGE | BufferUsage::INDIRECT | BufferUsage::COPY_DST,
            ),
            BindingKind::DepthTexture | BindingKind::ComparisonSampler => None,
        }
    }
}

/// One binding inside a group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    /// Binding index within the group.
    pub binding: u32,
    /// Logical role.
    pub role: BindingRole,
    /// Access kind.
    pub kind: BindingKind,
    /// Minimum buffer size in bytes; used when no size override is supplied.
    pub min_size: u64,
}

impl BindGroupLayoutEntry {
    /// Creates a layout entry.
    pub const fn new(binding: u32, role: BindingRole, kind: BindingKind, min_size: u64) -> Self {
        Self {
            binding,
            role,
            kind,
            min_size,
        }
    }
}

/// The layout of one bind group as declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindGroupLayoutDescriptor {
    /// Debug label.
    pub label: String,
    /// Group index in the shader.
    pub group: u32,
    /// Bindings of the group.
    pub entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutDescriptor {
    /// Creates a group layout.
    pub fn new(label: impl Into<String>, group: u32, entries: Vec<BindGroupLayoutEntry>) -> Self {
        Self {
            label: label.into(),
            group,
            entries,
        }
    }

    /// Returns `true` if any entry carries `role`.
    pub fn has_role(&self, role: BindingRole) -> bool {
        self.entries.iter().any(|e| e.role == role)
    }

    /// The role of the first entry, which names the provider that backs the group.
    pub fn primary_role(&self) -> Option<BindingRole> {
        self.entries.first().map(|e| e.role)
    }
}

/// Binding metadata for a whole shader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderLayout {
    /// Group layouts, in any order.
    pub groups: Vec<BindGroupLayoutDescriptor>,
}

impl ShaderLayout {
    /// Creates a shader layout from its groups.
    pub fn new(groups: Vec<BindGroupLayoutDescriptor>) -> Self {
        Self { groups }
    }

    /// Finds the group and entry declaring `role`.
    pub fn find(
        &self,
        role: BindingRole,
    ) -> Option<(&BindGroupLayoutDescriptor, &BindGroupLayoutEntry)> {
        self.groups
            .iter()
            .find_map(|g| g.entries.iter().find(|e| e.role == role).map(|e| (g, e)))
    }

    /// Finds the group declaring `role`.
    pub fn group_for(&self, role: BindingRole) -> Option<&BindGroupLayoutDescriptor> {
        self.find(role).map(|(g, _)| g)
    }
}

/// An opaque handle to a created bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// A concrete resource bound at one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// A buffer.
    Buffer(BufferId),
    /// A texture.
    Texture(TextureId),
    /// A sampler.
    Sampler(SamplerId),
}

/// Whether a provider is responsible for destroying an entry's resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by this provider; destroyed on release.
    Owned,
    /// Borrowed from another provider; never destroyed here.
    Shared,
}

/// One resolved binding of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEntry {
    /// Binding index within the group.
    pub binding: u32,
    /// Logical role.
    pub role: BindingRole,
    /// The bound resource.
    pub resource: BindingResource,
    /// Who destroys the resource.
    pub ownership: Ownership,
}

/// The concrete resources backing one bind group.
#[derive(Debug, Clone, Default)]
pub struct BindGroupProvider {
    label: String,
    entries: Vec<ProviderEntry>,
    bind_group: Option<BindGroupId>,
}

impl BindGroupProvider {
    /// Creates an empty provider.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
            bind_group: None,
        }
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    fn upsert(&mut self, entry: ProviderEntry) {
        match self.entries.iter_mut().find(|e| e.role == entry.role) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Records a buffer this provider created and owns.
    pub fn insert_owned_buffer(&mut self, binding: u32, role: BindingRole, buffer: BufferId) {
        self.upsert(ProviderEntry {
            binding,
            role,
            resource: BindingResource::Buffer(buffer),
            ownership: Ownership::Owned,
        });
    }

    /// Records a non-owning reference to a buffer owned elsewhere.
    ///
    /// Replaces any previous entry for `role`, which is how a consumer is
    /// re-pointed after the producer recreated its buffer.
    pub fn share_buffer(&mut self, binding: u32, role: BindingRole, buffer: BufferId) {
        self.upsert(ProviderEntry {
            binding,
            role,
            resource: BindingResource::Buffer(buffer),
            ownership: Ownership::Shared,
        });
    }

    /// Records a texture. Textures are always owned by whoever created them.
    pub fn insert_texture(&mut self, binding: u32, role: BindingRole, texture: TextureId) {
        self.upsert(ProviderEntry {
            binding,
            role,
            resource: BindingResource::Texture(texture),
            ownership: Ownership::Shared,
        });
    }

    /// Records a sampler.
    pub fn insert_sampler(&mut self, binding: u32, role: BindingRole, sampler: SamplerId) {
        self.upsert(ProviderEntry {
            binding,
            role,
            resource: BindingResource::Sampler(sampler),
            ownership: Ownership::Shared,
        });
    }

    /// The entry for `role`, if any.
    pub fn entry(&self, role: BindingRole) -> Option<&ProviderEntry> {
        self.entries.iter().find(|e| e.role == role)
    }

    /// Returns `true` if the provider carries `role`.
    pub fn has_role(&self, role: BindingRole) -> bool {
        self.entry(role).is_some()
    }

    /// Returns `true` if the provider carries every role declared by `layout`.
    pub fn covers(&self, layout: &BindGroupLayoutDescriptor) -> bool {
        layout.entries.iter().all(|e| self.has_role(e.role))
    }

    /// The buffer bound for `role`, if the entry is a buffer.
    pub fn buffer(&self, role: BindingRole) -> Option<BufferId> {
        match self.entry(role)?.resource {
            BindingResource::Buffer(id) => Some(id),
            _ => None,
        }
    }

    /// The bind group created by the last successful init.
    pub fn bind_group(&self) -> Option<BindGroupId> {
        self.bind_group
    }

    /// Stores the created bind group.
    pub fn set_bind_group(&mut self, id: BindGroupId) {
        self.bind_group = Some(id);
    }

    /// Removes and returns the bind group handle.
    pub fn take_bind_group(&mut self) -> Option<BindGroupId> {
        self.bind_group.take()
    }

    /// Removes every entry, returning the buffers this provider owned.
    pub fn drain_owned_buffers(&mut self) -> Vec<BufferId> {
        self.entries
            .drain(..)
            .filter(|e| e.ownership == Ownership::Owned)
            .filter_map(|e| match e.resource {
                BindingResource::Buffer(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Builds the descriptor used to create the bind group for `layout`.
    pub fn descriptor(&self, layout: &BindGroupLayoutDescriptor) -> BindGroupDescriptor {
        let mut entries: Vec<(u32, BindingResource)> = layout
            .entries
            .iter()
            .filter_map(|l| self.entry(l.role).map(|e| (l.binding, e.resource)))
            .collect();
        entries.sort_by_key(|(binding, _)| *binding);
        BindGroupDescriptor {
            label: self.label.clone(),
            group: layout.group,
            entries,
        }
    }
}

/// Everything a backend needs to create a bind group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupDescriptor {
    /// Debug label.
    pub label: String,
    /// Group index in the shader.
    pub group: u32,
    /// `(binding, resource)` pairs sorted by binding.
    pub entries: Vec<(u32, BindingResource)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> BindGroupLayoutDescriptor {
        BindGroupLayoutDescriptor::new(
            "instances",
            2,
            vec![
                BindGroupLayoutEntry::new(1, BindingRole::IndirectArgs, BindingKind::Indirect, 20),
                BindGroupLayoutEntry::new(
                    0,
                    BindingRole::AnimatorOutput,
                    BindingKind::Storage { read_only: true },
                    64,
                ),
            ],
        )
    }

    #[test]
    fn share_replaces_previous_entry() {
        let mut provider = BindGroupProvider::new("render");
        provider.share_buffer(0, BindingRole::AnimatorOutput, BufferId(1));
        provider.share_buffer(0, BindingRole::AnimatorOutput, BufferId(7));
        assert_eq!(provider.entries().len(), 1);
        assert_eq!(provider.buffer(BindingRole::AnimatorOutput), Some(BufferId(7)));
    }

    #[test]
    fn drain_returns_only_owned_buffers() {
        let mut provider = BindGroupProvider::new("compute");
        provider.insert_owned_buffer(0, BindingRole::InstanceData, BufferId(1));
        provider.share_buffer(1, BindingRole::Lights, BufferId(2));
        provider.insert_sampler(2, BindingRole::ShadowSampler, SamplerId(0));
        assert_eq!(provider.drain_owned_buffers(), vec![BufferId(1)]);
        assert!(provider.entries().is_empty());
    }

    #[test]
    fn descriptor_is_sorted_by_binding() {
        let mut provider = BindGroupProvider::new("render");
        provider.insert_owned_buffer(1, BindingRole::IndirectArgs, BufferId(4));
        provider.share_buffer(0, BindingRole::AnimatorOutput, BufferId(3));
        let desc = provider.descriptor(&layout());
        assert_eq!(desc.group, 2);
        assert_eq!(
            desc.entries,
            vec![
                (0, BindingResource::Buffer(BufferId(3))),
                (1, BindingResource::Buffer(BufferId(4))),
            ]
        );
        assert!(provider.covers(&layout()));
    }

    #[test]
    fn shader_layout_finds_role() {
        let shader = ShaderLayout::new(vec![layout()]);
        let (group, entry) = shader.find(BindingRole::AnimatorOutput).unwrap();
        assert_eq!(group.group, 2);
        assert_eq!(entry.binding, 0);
        assert!(shader.find(BindingRole::Camera).is_none());
    }

    #[test]
    fn textures_have_no_default_usage() {
        assert!(BindingKind::DepthTexture.default_usage().is_none());
        assert!(BindingKind::Indirect
            .default_usage()
            .unwrap()
            .contains(BufferUsage::INDIRECT));
    }
}
