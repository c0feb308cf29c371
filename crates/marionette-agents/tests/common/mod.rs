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

#![allow(dead_code)]

use marionette_agents::{layouts, Scene, LIGHT_CULL_PIPELINE};
use marionette_core::math::{Quat, Vec3};
use marionette_core::renderer::api::*;
use marionette_core::renderer::GpuBackend;
use marionette_core::settings::ShadowSettings;
use marionette_core::{Camera, SceneSettings};
use marionette_infra::{frustum_cull_kernel, light_cull_kernel, HeadlessBackend};
use marionette_lanes::{BackendKind, Bone, Channel, Clip, Material, Model};
use std::borrow::Cow;
use std::sync::Arc;

pub const ANIMATE: &str = "animate_rigid";
pub const ANIMATE_SKINNED: &str = "animate_skinned";
pub const LIT: &str = "lit";

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A headless device with the cull kernels installed.
pub fn headless() -> Arc<HeadlessBackend> {
    Arc::new(
        HeadlessBackend::new()
            .with_kernel(ANIMATE, frustum_cull_kernel())
            .with_kernel(ANIMATE_SKINNED, frustum_cull_kernel())
            .with_kernel(LIGHT_CULL_PIPELINE, light_cull_kernel()),
    )
}

/// Small screen, two workers, room for two instances before growing.
pub fn settings(culling: bool) -> SceneSettings {
    SceneSettings {
        culling_enabled: culling,
        screen_width: 64,
        screen_height: 32,
        worker_threads: Some(2),
        initial_animator_capacity: 2,
        shadows: ShadowSettings {
            map_size: 64,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A camera at z = 10 looking down -Z.
pub fn camera() -> Camera {
    Camera::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)
}

pub fn scene(backend: &Arc<HeadlessBackend>, culling: bool) -> Scene {
    Scene::builder()
        .backend(backend.clone())
        .camera(camera())
        .settings(settings(culling))
        .build()
        .unwrap()
}

pub fn mesh(backend: &HeadlessBackend, index_count: u32) -> MeshBuffers {
    let create = |label: &'static str, size: u64, usage: BufferUsage| {
        backend
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed(label)),
                size,
                usage: usage | BufferUsage::COPY_DST,
            })
            .unwrap()
    };
    MeshBuffers {
        vertex: create("vertices", 24 * 32, BufferUsage::VERTEX),
        index: create("indices", index_count as u64 * 4, BufferUsage::INDEX),
        index_count,
    }
}

pub fn material(name: &str) -> Material {
    Material {
        name: name.into(),
        pipeline: PipelineKey::new(LIT),
        layout: layouts::lit_material(16),
        provider: BindGroupProvider::new(name),
        index_range: None,
    }
}

/// A rigid model with one lit material.
pub fn rigid_model(backend: &HeadlessBackend, name: &str) -> Arc<Model> {
    Arc::new(Model {
        name: name.into(),
        mesh: mesh(backend, 36),
        materials: vec![material("wood")],
        skeleton: Vec::new(),
        clips: Vec::new(),
        bounding_radius: 1.0,
        compute: Some(layouts::animator_program(ANIMATE, BackendKind::Simple)),
        effect: None,
    })
}

/// A two-bone model with one walk clip.
pub fn skinned_model(backend: &HeadlessBackend, name: &str) -> Arc<Model> {
    let bones = vec![
        Bone::default(),
        Bone {
            parent: 0,
            translation: Vec3::Y,
            ..Default::default()
        },
    ];
    let walk = Clip {
        name: "walk".into(),
        duration_ticks: 30.0,
        ticks_per_second: 30.0,
        channels: vec![Channel {
            bone: 1,
            rotations: vec![(0.0, Quat::IDENTITY), (30.0, Quat::from_rotation_z(1.0))],
            ..Default::default()
        }],
    };
    Arc::new(Model {
        name: name.into(),
        mesh: mesh(backend, 60),
        materials: vec![material("skin")],
        skeleton: bones,
        clips: vec![walk],
        bounding_radius: 1.5,
        compute: Some(layouts::animator_program(
            ANIMATE_SKINNED,
            BackendKind::Skeletal,
        )),
        effect: None,
    })
}

/// A rigid model whose material also binds an effect group after the scene groups.
pub fn effect_model(
    backend: &HeadlessBackend,
    name: &str,
    effect: Option<BindGroupProvider>,
) -> Arc<Model> {
    let mut material = material("glow");
    material.layout.groups.push(BindGroupLayoutDescriptor::new(
        "effect",
        6,
        vec![BindGroupLayoutEntry::new(0, BindingRole::Effect, BindingKind::Uniform, 16)],
    ));
    let mut model = (*rigid_model(backend, name)).clone();
    model.materials = vec![material];
    model.effect = effect;
    Arc::new(model)
}

/// A rigid model whose material arrives pre-bound to a bind group the device never created.
pub fn broken_model(backend: &HeadlessBackend, name: &str) -> Arc<Model> {
    let mut material = material("stale");
    material
        .provider
        .share_buffer(0, BindingRole::Material, BufferId(usize::MAX));
    material.provider.set_bind_group(BindGroupId(usize::MAX));
    let mut model = (*rigid_model(backend, name)).clone();
    model.materials = vec![material];
    Arc::new(model)
}

pub fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Runs the four phases in order.
pub fn frame(scene: &Scene, delta_time: f32) {
    scene.prepare_compute(delta_time).unwrap();
    scene.prepare_shadows().unwrap();
    scene.prepare_light_culling().unwrap();
    scene.draw_calls().unwrap();
}

/// A rigid model whose material group declares a depth texture the material
/// never supplies. With `uniform_first`, a material uniform precedes it so the
/// device has already created one buffer when the group fails.
pub fn unbindable_model(backend: &HeadlessBackend, name: &str, uniform_first: bool) -> Arc<Model> {
    let mut material = material("mirror");
    let group = material
        .layout
        .groups
        .iter_mut()
        .find(|g| g.has_role(BindingRole::Material))
        .unwrap();
    group.entries = if uniform_first {
        vec![
            BindGroupLayoutEntry::new(0, BindingRole::Material, BindingKind::Uniform, 16),
            BindGroupLayoutEntry::new(1, BindingRole::ShadowMap, BindingKind::DepthTexture, 0),
        ]
    } else {
        vec![BindGroupLayoutEntry::new(0, BindingRole::Material, BindingKind::DepthTexture, 0)]
    };
    let mut model = (*rigid_model(backend, name)).clone();
    model.materials = vec![material];
    Arc::new(model)
}
