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

use approx::assert_relative_eq;
use bytes::BufMut;
use marionette_core::math::{Quat, Vec3, Vec4};
use marionette_core::renderer::api::*;
use marionette_core::renderer::layout::{get_mat4, put_padding, put_vec4, GpuRecord, IndirectArgs};
use marionette_core::renderer::GpuBackend;
use marionette_infra::{frustum_cull_kernel, light_cull_kernel, HeadlessBackend};
use std::borrow::Cow;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn buffer(backend: &HeadlessBackend, label: &'static str, size: u64) -> BufferId {
    backend
        .create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
        })
        .unwrap()
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn compute_pipeline(backend: &HeadlessBackend, key: &str) {
    backend
        .register_pipelines(&[PipelineDescriptor::new(
            key,
            PipelineKind::Compute,
            ShaderLayout::default(),
        )])
        .unwrap();
}

fn simple_instance(position: Vec3) -> Vec<u8> {
    let mut bytes = Vec::new();
    put_vec4(&mut bytes, Vec4::ZERO);
    put_vec4(&mut bytes, Vec4::from(Quat::IDENTITY));
    put_vec4(&mut bytes, position.extend(1.0));
    put_vec4(&mut bytes, Vec4::new(1.0, 1.0, 1.0, 0.0));
    bytes
}

#[test]
fn cull_kernel_compacts_visible_instances_and_counts_them() {
    init();
    let backend = HeadlessBackend::new().with_kernel("animate", frustum_cull_kernel());
    compute_pipeline(&backend, "animate");

    let uniform = buffer(&backend, "uniform", 112);
    let instances = buffer(&backend, "instances", 3 * 64);
    let output = buffer(&backend, "output", 3 * 64);
    let indirect = buffer(&backend, "indirect", 20);

    // keep x >= -1; the other five planes accept everything
    let mut uniform_bytes = Vec::new();
    uniform_bytes.put_u32_le(3);
    uniform_bytes.put_f32_le(0.016);
    uniform_bytes.put_f32_le(1.0);
    put_padding(&mut uniform_bytes, 1);
    put_vec4(&mut uniform_bytes, Vec4::new(1.0, 0.0, 0.0, 0.0));
    for _ in 0..5 {
        put_vec4(&mut uniform_bytes, Vec4::ZERO);
    }

    let mut instance_bytes = simple_instance(Vec3::new(-5.0, 0.0, 0.0));
    instance_bytes.extend(simple_instance(Vec3::new(4.0, 0.0, 0.0)));
    instance_bytes.extend(simple_instance(Vec3::new(-0.5, 2.0, 0.0)));

    backend
        .write_buffers(&[
            BufferWrite::new(uniform, 0, uniform_bytes),
            BufferWrite::new(instances, 0, instance_bytes),
            BufferWrite::new(indirect, 0, IndirectArgs::reset(36).to_bytes()),
        ])
        .unwrap();

    let mut provider = BindGroupProvider::new("animate");
    provider.share_buffer(0, BindingRole::AnimatorUniform, uniform);
    provider.share_buffer(1, BindingRole::InstanceData, instances);
    provider.share_buffer(2, BindingRole::AnimatorOutput, output);
    provider.share_buffer(3, BindingRole::IndirectArgs, indirect);
    provider.set_bind_group(BindGroupId(0));

    backend.begin_compute_frame().unwrap();
    backend
        .dispatch_compute(&PipelineKey::new("animate"), &provider, [1, 1, 1])
        .unwrap();
    backend.end_compute_frame().unwrap();

    let args = IndirectArgs::decode(&backend.buffer_contents(indirect).unwrap()).unwrap();
    assert_eq!(args.index_count, 36);
    assert_eq!(args.instance_count, 2);

    let out = backend.buffer_contents(output).unwrap();
    let mut cursor = &out[..];
    let first = get_mat4(&mut cursor);
    let second = get_mat4(&mut cursor);
    assert_relative_eq!(first.w_axis.x, 4.0);
    assert_relative_eq!(second.w_axis.x, -0.5);
    assert_relative_eq!(second.w_axis.y, 2.0);
}

#[test]
fn cull_kernel_integrates_rotation_speed() {
    init();
    let backend = HeadlessBackend::new().with_kernel("animate", frustum_cull_kernel());
    compute_pipeline(&backend, "animate");

    let uniform = buffer(&backend, "uniform", 112);
    let instances = buffer(&backend, "instances", 64);
    let output = buffer(&backend, "output", 64);

    let mut uniform_bytes = Vec::new();
    uniform_bytes.put_u32_le(1);
    uniform_bytes.put_f32_le(0.5);
    uniform_bytes.put_f32_le(1.0);
    put_padding(&mut uniform_bytes, 25);

    let mut record = Vec::new();
    put_vec4(&mut record, Vec4::new(0.0, std::f32::consts::PI, 0.0, 0.0));
    put_vec4(&mut record, Vec4::from(Quat::IDENTITY));
    put_vec4(&mut record, Vec4::new(0.0, 0.0, 0.0, 1.0));
    put_vec4(&mut record, Vec4::new(1.0, 1.0, 1.0, 0.0));

    backend
        .write_buffers(&[
            BufferWrite::new(uniform, 0, uniform_bytes),
            BufferWrite::new(instances, 0, record),
        ])
        .unwrap();

    let mut provider = BindGroupProvider::new("animate");
    provider.share_buffer(0, BindingRole::AnimatorUniform, uniform);
    provider.share_buffer(1, BindingRole::InstanceData, instances);
    provider.share_buffer(2, BindingRole::AnimatorOutput, output);
    provider.set_bind_group(BindGroupId(0));

    backend.begin_compute_frame().unwrap();
    backend
        .dispatch_compute(&PipelineKey::new("animate"), &provider, [1, 1, 1])
        .unwrap();
    backend.end_compute_frame().unwrap();

    // half a turn per second for half a second: a quarter turn around Y
    let out = backend.buffer_contents(output).unwrap();
    let matrix = get_mat4(&mut &out[..]);
    let x = matrix.transform_vector3(Vec3::X);
    assert_relative_eq!(x.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(x.z, -1.0, epsilon = 1e-5);
}

#[test]
fn light_cull_kernel_rewrites_every_tile() {
    init();
    let backend = HeadlessBackend::new().with_kernel("cull_lights", light_cull_kernel());
    compute_pipeline(&backend, "cull_lights");

    let uniform = buffer(&backend, "cull", 160);
    let grid = buffer(&backend, "grid", 2 * 8);
    let indices = buffer(&backend, "indices", 2 * 4 * 4);

    let cull_uniform = |lights: u32| {
        let mut bytes = vec![0u8; 128];
        bytes.put_u32_le(2);
        bytes.put_u32_le(1);
        bytes.put_f32_le(32.0);
        bytes.put_f32_le(16.0);
        bytes.put_u32_le(lights);
        put_padding(&mut bytes, 3);
        bytes
    };

    let mut provider = BindGroupProvider::new("light_cull");
    provider.share_buffer(0, BindingRole::LightCullUniforms, uniform);
    provider.share_buffer(1, BindingRole::TileLightGrid, grid);
    provider.share_buffer(2, BindingRole::TileLightIndices, indices);
    provider.set_bind_group(BindGroupId(0));

    let dispatch = |lights: u32| {
        backend
            .write_buffers(&[BufferWrite::new(uniform, 0, cull_uniform(lights))])
            .unwrap();
        backend.begin_compute_frame().unwrap();
        backend
            .dispatch_compute(&PipelineKey::new("cull_lights"), &provider, [2, 1, 1])
            .unwrap();
        backend.end_compute_frame().unwrap();
        backend.buffer_contents(grid).unwrap()
    };

    let grid_bytes = dispatch(6);
    assert_eq!(u32_at(&grid_bytes, 0), 0);
    assert_eq!(u32_at(&grid_bytes, 4), 4);
    assert_eq!(u32_at(&grid_bytes, 8), 4);
    assert_eq!(u32_at(&grid_bytes, 12), 4);

    let grid_bytes = dispatch(0);
    assert_eq!(u32_at(&grid_bytes, 4), 0);
    assert_eq!(u32_at(&grid_bytes, 12), 0);
}
