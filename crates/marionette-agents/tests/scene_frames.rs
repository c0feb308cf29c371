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

mod common;

use approx::assert_relative_eq;
use common::*;
use marionette_agents::{layouts, ObjectDesc, LIGHT_CULL_PIPELINE, SHADOW_PIPELINE};
use marionette_core::math::Vec3;
use marionette_core::renderer::api::{BindingResource, PipelineKey};
use marionette_core::renderer::layout::{get_mat4, light_buffer_size, IndirectArgs};
use marionette_core::renderer::Light;
use marionette_infra::RecordedCommand;

#[test]
fn culling_off_draws_one_direct_instance() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    scene
        .add(ObjectDesc::new("crate", rigid_model(&backend, "crate")))
        .unwrap();

    frame(&scene, 0.016);

    let draws = backend.draws();
    assert_eq!(draws.len(), 1);
    assert!(!draws[0].is_indirect());
    assert_eq!(draws[0].instance_count, 1);
    assert_eq!(draws[0].pipeline, PipelineKey::new(LIT));
    assert_eq!(draws[0].index_range, 0..36);
    assert_eq!(draws[0].bind_groups.len(), 6);

    let stats = scene.frame_stats();
    assert_eq!(stats.frame_index, 1);
    assert_eq!(stats.animators_prepared, 1);
    assert_eq!(stats.draws_issued, 1);
    assert_eq!(stats.dispatches, 2);
}

#[test]
fn phases_submit_in_fixed_order() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    scene
        .add(ObjectDesc::new("crate", rigid_model(&backend, "crate")))
        .unwrap();
    backend.take_commands();

    frame(&scene, 0.016);

    let commands = backend.commands();
    let position = |wanted: &RecordedCommand| commands.iter().position(|c| c == wanted).unwrap();
    let first_compute = position(&RecordedCommand::BeginComputeFrame);
    assert!(first_compute > 0);

    // every write of the frame lands ahead of the first dispatch
    assert!(commands[..first_compute]
        .iter()
        .all(|c| matches!(c, RecordedCommand::WriteBuffer { .. })));
    assert!(position(&RecordedCommand::BeginFrame) > position(&RecordedCommand::EndComputeFrame));
    assert_eq!(commands.last(), Some(&RecordedCommand::Present));
    assert_eq!(
        backend.dispatches(),
        vec![PipelineKey::new(common::ANIMATE), PipelineKey::new(LIGHT_CULL_PIPELINE)]
    );
}

#[test]
fn culling_on_hides_objects_behind_the_camera() {
    init();
    let backend = headless();
    let scene = scene(&backend, true);
    scene
        .add(
            ObjectDesc::new("behind", rigid_model(&backend, "crate"))
                .at(Vec3::new(0.0, 0.0, 50.0)),
        )
        .unwrap();

    scene.prepare_compute(0.016).unwrap();
    let indirect = backend.find_buffer("crate::compute::IndirectArgs").unwrap();
    let args = IndirectArgs::decode(&backend.buffer_contents(indirect).unwrap()).unwrap();
    assert_eq!(args.index_count, 36);
    assert_eq!(args.instance_count, 0);

    scene.prepare_shadows().unwrap();
    scene.prepare_light_culling().unwrap();
    scene.draw_calls().unwrap();

    let draws = backend.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].indirect, Some(indirect));
    assert_eq!(draws[0].instance_count, 0);
}

#[test]
fn visible_count_is_reset_every_frame() {
    init();
    let backend = headless();
    let scene = scene(&backend, true);
    let model = rigid_model(&backend, "crate");
    for (label, x, z) in [("a", 0.0, 0.0), ("b", 2.0, 0.0), ("behind", 0.0, 40.0)] {
        scene
            .add(ObjectDesc::new(label, model.clone()).at(Vec3::new(x, 0.0, z)))
            .unwrap();
    }

    for _ in 0..3 {
        scene.prepare_compute(0.016).unwrap();
        let indirect = backend.find_buffer("crate::compute::IndirectArgs").unwrap();
        let args = IndirectArgs::decode(&backend.buffer_contents(indirect).unwrap()).unwrap();
        assert_eq!(args.instance_count, 2);
        scene.prepare_shadows().unwrap();
        scene.prepare_light_culling().unwrap();
        scene.draw_calls().unwrap();
    }
    assert!(backend.draws().iter().all(|d| d.is_indirect() && d.instance_count == 2));
}

#[test]
fn shadow_pass_draws_the_compacted_instances() {
    init();
    let backend = headless();
    let scene = scene(&backend, true);
    scene.add_light(Light::directional(Vec3::new(-1.0, -1.0, 0.0)).with_shadows());
    let model = rigid_model(&backend, "crate");
    scene.add(ObjectDesc::new("seen", model.clone())).unwrap();
    scene
        .add(ObjectDesc::new("hidden", model).at(Vec3::new(0.0, 0.0, 30.0)))
        .unwrap();

    frame(&scene, 0.016);

    let shadow_draws = backend.shadow_draws();
    let draws = backend.draws();
    assert_eq!(shadow_draws.len(), 1);
    assert_eq!(shadow_draws[0].pipeline, PipelineKey::new(SHADOW_PIPELINE));
    assert_eq!(shadow_draws[0].indirect, draws[0].indirect);
    assert_eq!(shadow_draws[0].instance_count, 1);
    assert_eq!(
        shadow_draws[0].bind_groups.iter().map(|(g, _)| *g).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(scene.frame_stats().shadow_draws, 1);

    let shadow_data = backend.find_buffer("scene::shadow::ShadowData").unwrap();
    let bytes = backend.buffer_contents(shadow_data).unwrap();
    let texel = f32::from_le_bytes(bytes[64..68].try_into().unwrap());
    assert_relative_eq!(texel, 1.0 / 64.0);
}

#[test]
fn shadow_pass_needs_an_enabled_directional_caster() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    scene.add_light(Light::directional(Vec3::NEG_Y));
    scene.add_light(Light::point(Vec3::Y, 4.0).with_shadows());
    let caster = scene.add_light(
        Light::directional(Vec3::NEG_Y)
            .with_shadows()
            .with_enabled(false),
    );
    scene
        .add(ObjectDesc::new("crate", rigid_model(&backend, "crate")))
        .unwrap();

    frame(&scene, 0.016);
    assert!(backend.shadow_draws().is_empty());

    scene
        .set_light(caster, Light::directional(Vec3::NEG_Y).with_shadows())
        .unwrap();
    frame(&scene, 0.016);
    assert_eq!(backend.shadow_draws().len(), 1);
    assert!(!backend.shadow_draws()[0].is_indirect());
}

#[test]
fn growth_rebuilds_buffers_before_prep() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    let model = rigid_model(&backend, "crate");
    for x in [-2.0, 0.0, 2.0] {
        scene
            .add(ObjectDesc::new("crate", model.clone()).at(Vec3::new(x, 0.0, 0.0)))
            .unwrap();
    }
    let buffers = backend.live_buffers();
    let bind_groups = backend.live_bind_groups();

    frame(&scene, 0.016);
    assert_eq!(scene.frame_stats().animators_rebuilt, 1);
    // the outgrown compute and instance groups were swapped out, not leaked
    assert_eq!(backend.live_buffers(), buffers);
    assert_eq!(backend.live_bind_groups(), bind_groups);

    let output = backend.find_buffer("crate::compute::AnimatorOutput").unwrap();
    let instances = backend.find_buffer("crate::compute::InstanceData").unwrap();
    assert_eq!(backend.buffer_size(output), Some(8 * 64));
    assert_eq!(backend.buffer_size(instances), Some(8 * 64));

    let bytes = backend.buffer_contents(output).unwrap();
    let mut cursor = &bytes[..];
    for x in [-2.0, 0.0, 2.0] {
        assert_relative_eq!(get_mat4(&mut cursor).w_axis.x, x);
    }

    // the instance group follows the new output buffer
    let draw = &backend.draws()[0];
    assert_eq!(draw.instance_count, 3);
    let (_, instance_group) = draw
        .bind_groups
        .iter()
        .find(|(g, _)| *g == layouts::INSTANCE_GROUP)
        .copied()
        .unwrap();
    let descriptor = backend.bind_group(instance_group).unwrap();
    assert_eq!(descriptor.entries, vec![(0, BindingResource::Buffer(output))]);

    frame(&scene, 0.016);
    assert_eq!(scene.frame_stats().animators_rebuilt, 0);
}

#[test]
fn light_buffer_carries_enabled_lights_only() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    scene.set_ambient(Vec3::new(0.1, 0.2, 0.3));
    for i in 0..5 {
        scene.add_light(Light::point(Vec3::X * i as f32, 3.0).with_enabled(i < 3));
    }
    backend.take_commands();

    scene.prepare_compute(0.016).unwrap();

    let lights = backend.find_buffer("scene::lights::Lights").unwrap();
    assert_eq!(backend.buffer_size(lights), Some(light_buffer_size(1024)));
    let written = backend
        .commands()
        .into_iter()
        .find_map(|c| match c {
            RecordedCommand::WriteBuffer { buffer, len, .. } if buffer == lights => Some(len),
            _ => None,
        })
        .unwrap();
    assert_eq!(written, 16 + 3 * 64);

    let bytes = backend.buffer_contents(lights).unwrap();
    assert_relative_eq!(f32::from_le_bytes(bytes[0..4].try_into().unwrap()), 0.1);
    assert_eq!(u32_at(&bytes, 12), 3);
}

#[test]
fn light_culling_clears_stale_tiles() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    let lights = [
        scene.add_light(Light::point(Vec3::ZERO, 5.0)),
        scene.add_light(Light::point(Vec3::Y, 5.0)),
    ];

    frame(&scene, 0.016);
    let grid = backend.find_buffer("scene::tiles::TileLightGrid").unwrap();
    let bytes = backend.buffer_contents(grid).unwrap();
    // 64x32 pixels in 16 pixel tiles
    assert_eq!(bytes.len(), 4 * 2 * 8);
    assert!((0..8).all(|tile| u32_at(&bytes, tile * 8 + 4) == 2));

    for id in lights {
        scene.remove_light(id).unwrap();
    }
    frame(&scene, 0.016);
    let bytes = backend.buffer_contents(grid).unwrap();
    assert!((0..8).all(|tile| u32_at(&bytes, tile * 8 + 4) == 0));

    let cull_dispatches: Vec<_> = backend
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            RecordedCommand::Dispatch {
                pipeline,
                workgroups,
            } if pipeline.as_str() == LIGHT_CULL_PIPELINE => Some(workgroups),
            _ => None,
        })
        .collect();
    assert_eq!(cull_dispatches, vec![[4, 2, 1], [4, 2, 1]]);
}

#[test]
fn skinned_objects_play_and_draw() {
    init();
    let backend = headless();
    let scene = scene(&backend, false);
    let id = scene
        .add(
            ObjectDesc::new("hero", skinned_model(&backend, "hero"))
                .at(Vec3::new(3.0, 0.0, 0.0))
                .playing(0),
        )
        .unwrap();

    frame(&scene, 0.1);

    let draws = backend.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].instance_count, 1);
    assert_eq!(draws[0].index_range, 0..60);

    let output = backend.find_buffer("hero::compute::AnimatorOutput").unwrap();
    // two slots, each a model matrix followed by two bone matrices
    assert_eq!(backend.buffer_size(output), Some(2 * 3 * 64));
    let bytes = backend.buffer_contents(output).unwrap();
    assert_relative_eq!(get_mat4(&mut &bytes[..]).w_axis.x, 3.0);

    let time = scene
        .update(id, |hero| hero.animation_time())
        .unwrap()
        .unwrap();
    assert!(time > 0.0);
}
