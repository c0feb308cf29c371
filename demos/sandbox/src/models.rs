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

//! Hand-built models for the sandbox. Geometry is only sized, never filled.

use anyhow::Result;
use marionette_agents::layouts;
use marionette_core::math::{Quat, Vec3};
use marionette_core::renderer::api::{
    BindGroupProvider, BufferDescriptor, BufferUsage, MeshBuffers, PipelineKey,
};
use marionette_core::renderer::GpuBackend;
use marionette_lanes::{BackendKind, Bone, Channel, Clip, Material, Model};
use std::borrow::Cow;
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

pub const ANIMATE_RIGID: &str = "animate_rigid";
pub const ANIMATE_SKINNED: &str = "animate_skinned";
const LIT: &str = "lit_forward_plus";

fn mesh(backend: &dyn GpuBackend, name: &str, vertices: u64, indices: u32) -> Result<MeshBuffers> {
    let vertex = backend.create_buffer(&BufferDescriptor {
        label: Some(Cow::Owned(format!("{name}::vertices"))),
        size: vertices * 32,
        usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
    })?;
    let index = backend.create_buffer(&BufferDescriptor {
        label: Some(Cow::Owned(format!("{name}::indices"))),
        size: indices as u64 * 4,
        usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
    })?;
    Ok(MeshBuffers {
        vertex,
        index,
        index_count: indices,
    })
}

fn lit(name: &str) -> Material {
    Material {
        name: name.into(),
        pipeline: PipelineKey::new(LIT),
        layout: layouts::lit_material(32),
        provider: BindGroupProvider::new(name),
        index_range: None,
    }
}

/// A unit cube drawn with one lit material.
pub fn crate_model(backend: &dyn GpuBackend) -> Result<Arc<Model>> {
    Ok(Arc::new(Model {
        name: "crate".into(),
        mesh: mesh(backend, "crate", 24, 36)?,
        materials: vec![lit("crate_wood")],
        skeleton: Vec::new(),
        clips: Vec::new(),
        bounding_radius: 0.87,
        compute: Some(layouts::animator_program(ANIMATE_RIGID, BackendKind::Simple)),
        effect: None,
    }))
}

/// A three-bone walker with an idle and a walk clip. The body and the
/// limbs are separate materials over one index buffer.
pub fn walker_model(backend: &dyn GpuBackend) -> Result<Arc<Model>> {
    let skeleton = vec![
        Bone::default(),
        Bone {
            parent: 0,
            translation: Vec3::new(0.3, 1.0, 0.0),
            ..Default::default()
        },
        Bone {
            parent: 0,
            translation: Vec3::new(-0.3, 1.0, 0.0),
            ..Default::default()
        },
    ];

    let swing = |bone, phase: f32| Channel {
        bone,
        rotations: vec![
            (0.0, Quat::from_rotation_x(phase * FRAC_PI_4)),
            (12.0, Quat::from_rotation_x(-phase * FRAC_PI_4)),
            (24.0, Quat::from_rotation_x(phase * FRAC_PI_4)),
        ],
        ..Default::default()
    };
    let idle = Clip {
        name: "idle".into(),
        duration_ticks: 48.0,
        ticks_per_second: 24.0,
        channels: vec![Channel {
            bone: 0,
            translations: vec![(0.0, Vec3::ZERO), (24.0, Vec3::Y * 0.05), (48.0, Vec3::ZERO)],
            ..Default::default()
        }],
    };
    let walk = Clip {
        name: "walk".into(),
        duration_ticks: 24.0,
        ticks_per_second: 24.0,
        channels: vec![swing(1, 1.0), swing(2, -1.0)],
    };

    let mut body = lit("walker_body");
    body.index_range = Some(0..300);
    let mut limbs = lit("walker_limbs");
    limbs.index_range = Some(300..480);

    Ok(Arc::new(Model {
        name: "walker".into(),
        mesh: mesh(backend, "walker", 160, 480)?,
        materials: vec![body, limbs],
        skeleton,
        clips: vec![idle, walk],
        bounding_radius: 1.2,
        compute: Some(layouts::animator_program(
            ANIMATE_SKINNED,
            BackendKind::Skeletal,
        )),
        effect: None,
    }))
}
