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

//! Binding layouts of the scene-owned bind groups.
//!
//! The scene backs each of these groups with one provider. A material shader
//! may place them at any group index; draws resolve them by the role of the
//! group's first entry, so a material group must not mix roles from two
//! providers.

use marionette_core::renderer::api::{
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingKind, BindingRole, ComputeProgram,
    PipelineKey, ShaderLayout,
};
use marionette_core::renderer::layout::{
    CameraUniform, GpuRecord, ShadowDataUniform, ShadowDepthUniform, TileCullUniform, TileUniform,
};
use marionette_lanes::BackendKind;

/// Group of the camera uniform in the lit material layout.
pub const CAMERA_GROUP: u32 = 0;
/// Group of the material parameters.
pub const MATERIAL_GROUP: u32 = 1;
/// Group of the packed light buffer.
pub const LIGHTS_GROUP: u32 = 2;
/// Group of the shadow map, its sampler and sampling data.
pub const SHADOW_GROUP: u32 = 3;
/// Group of the Forward+ tile lists.
pub const TILE_GROUP: u32 = 4;
/// Group of the per-instance transforms.
pub const INSTANCE_GROUP: u32 = 5;

/// Workgroup width of the animator compute programs.
pub const ANIMATOR_WORKGROUP_SIZE: u32 = 64;

const READ_ONLY: BindingKind = BindingKind::Storage { read_only: true };
const READ_WRITE: BindingKind = BindingKind::Storage { read_only: false };

fn uniform(binding: u32, role: BindingRole, size: usize) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry::new(binding, role, BindingKind::Uniform, size as u64)
}

/// The camera uniform.
pub fn camera(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "camera",
        group,
        vec![uniform(0, BindingRole::Camera, CameraUniform::SIZE)],
    )
}

/// The packed light buffer. Its size comes from the light budget.
pub fn lights(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "lights",
        group,
        vec![BindGroupLayoutEntry::new(0, BindingRole::Lights, READ_ONLY, 16)],
    )
}

/// Shadow sampling data, the depth texture and its comparison sampler.
pub fn shadow(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "shadow",
        group,
        vec![
            uniform(0, BindingRole::ShadowData, ShadowDataUniform::SIZE),
            BindGroupLayoutEntry::new(1, BindingRole::ShadowMap, BindingKind::DepthTexture, 0),
            BindGroupLayoutEntry::new(
                2,
                BindingRole::ShadowSampler,
                BindingKind::ComparisonSampler,
                0,
            ),
        ],
    )
}

/// Tile uniform plus the light grid and index lists written by light culling.
pub fn tiles(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "tiles",
        group,
        vec![
            uniform(0, BindingRole::TileUniforms, TileUniform::SIZE),
            BindGroupLayoutEntry::new(1, BindingRole::TileLightGrid, READ_ONLY, 8),
            BindGroupLayoutEntry::new(2, BindingRole::TileLightIndices, READ_ONLY, 4),
        ],
    )
}

/// Per-instance transforms produced by the animator compute pass.
pub fn instances(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "instances",
        group,
        vec![BindGroupLayoutEntry::new(0, BindingRole::AnimatorOutput, READ_ONLY, 64)],
    )
}

/// Light view-projection of the depth-only pass.
pub fn shadow_depth(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "shadow_depth",
        group,
        vec![uniform(0, BindingRole::ShadowDepth, ShadowDepthUniform::SIZE)],
    )
}

/// Inputs and outputs of the tiled light culling dispatch.
pub fn light_cull(group: u32) -> BindGroupLayoutDescriptor {
    BindGroupLayoutDescriptor::new(
        "light_cull",
        group,
        vec![
            uniform(0, BindingRole::LightCullUniforms, TileCullUniform::SIZE),
            BindGroupLayoutEntry::new(1, BindingRole::Lights, READ_ONLY, 16),
            BindGroupLayoutEntry::new(2, BindingRole::TileLightGrid, READ_WRITE, 8),
            BindGroupLayoutEntry::new(3, BindingRole::TileLightIndices, READ_WRITE, 4),
        ],
    )
}

/// Layout of the shadow depth pipeline: light matrix, then instances.
pub fn shadow_pipeline() -> ShaderLayout {
    ShaderLayout::new(vec![shadow_depth(0), instances(1)])
}

/// Layout of the light culling pipeline.
pub fn light_cull_pipeline() -> ShaderLayout {
    ShaderLayout::new(vec![light_cull(0)])
}

/// Layout of a lit Forward+ material: every scene group plus a material
/// uniform of `material_size` bytes.
pub fn lit_material(material_size: u64) -> ShaderLayout {
    ShaderLayout::new(vec![
        camera(CAMERA_GROUP),
        BindGroupLayoutDescriptor::new(
            "material",
            MATERIAL_GROUP,
            vec![BindGroupLayoutEntry::new(
                0,
                BindingRole::Material,
                BindingKind::Uniform,
                material_size,
            )],
        ),
        lights(LIGHTS_GROUP),
        shadow(SHADOW_GROUP),
        tiles(TILE_GROUP),
        instances(INSTANCE_GROUP),
    ])
}

/// The animator compute group for a backend kind. Buffer sizes are taken
/// from the backend when the group is initialised, so entries only carry
/// minimums.
pub fn animator_compute(kind: BackendKind) -> BindGroupLayoutDescriptor {
    let entries = match kind {
        BackendKind::Simple => vec![
            uniform(0, BindingRole::AnimatorUniform, 112),
            BindGroupLayoutEntry::new(1, BindingRole::InstanceData, READ_WRITE, 64),
            BindGroupLayoutEntry::new(2, BindingRole::AnimatorOutput, READ_WRITE, 64),
            BindGroupLayoutEntry::new(3, BindingRole::IndirectArgs, BindingKind::Indirect, 20),
        ],
        BackendKind::Skeletal => vec![
            uniform(0, BindingRole::AnimatorUniform, 128),
            BindGroupLayoutEntry::new(1, BindingRole::InstanceData, READ_ONLY, 32),
            BindGroupLayoutEntry::new(2, BindingRole::BoneInfo, READ_ONLY, 128),
            BindGroupLayoutEntry::new(3, BindingRole::AnimationClips, READ_ONLY, 16),
            BindGroupLayoutEntry::new(4, BindingRole::ModelData, READ_ONLY, 64),
            BindGroupLayoutEntry::new(5, BindingRole::AnimatorOutput, READ_WRITE, 64),
            BindGroupLayoutEntry::new(6, BindingRole::IndirectArgs, BindingKind::Indirect, 20),
        ],
    };
    BindGroupLayoutDescriptor::new("animator", 0, entries)
}

/// A compute program for an animator of `kind` dispatched through `pipeline`.
pub fn animator_program(pipeline: impl Into<PipelineKey>, kind: BackendKind) -> ComputeProgram {
    ComputeProgram {
        pipeline: pipeline.into(),
        workgroup_size: ANIMATOR_WORKGROUP_SIZE,
        layout: ShaderLayout::new(vec![animator_compute(kind)]),
    }
}
