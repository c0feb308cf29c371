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

// Marionette Sandbox
// Drives a small animated scene on the headless device and logs what each frame did.

mod models;

use anyhow::{Context, Result};
use marionette_agents::{FrameLoop, FrameOutcome, ObjectDesc, Scene, LIGHT_CULL_PIPELINE};
use marionette_core::math::Vec3;
use marionette_core::renderer::Light;
use marionette_core::{Camera, ObjectId, SceneSettings};
use marionette_infra::{frustum_cull_kernel, light_cull_kernel, HeadlessBackend};
use std::sync::Arc;

const SETTINGS: &str = r#"(
    culling_enabled: true,
    screen_width: 1280,
    screen_height: 720,
    initial_animator_capacity: 16,
    shadows: (map_size: 1024, extent: 30.0),
)"#;

const FRAME_TIME: f32 = 1.0 / 60.0;

/// Fills the scene and returns the first walker.
fn populate(scene: &Scene, backend: &HeadlessBackend) -> Result<ObjectId> {
    let crates = models::crate_model(backend)?;
    let walker = models::walker_model(backend)?;

    // a ring of spinning crates, a few of them behind the camera
    for i in 0..24 {
        let angle = i as f32 / 24.0 * std::f32::consts::TAU;
        let position = Vec3::new(angle.cos() * 12.0, 0.5, angle.sin() * 12.0);
        scene.add(
            ObjectDesc::new(format!("crate_{i}"), crates.clone())
                .at(position)
                .spinning(Vec3::Y * (0.5 + i as f32 * 0.05)),
        )?;
    }

    let mut walkers = Vec::new();
    for (i, clip) in [0, 1, 1].into_iter().enumerate() {
        walkers.push(
            scene.add(
                ObjectDesc::new(format!("walker_{i}"), walker.clone())
                    .at(Vec3::new(i as f32 * 2.0 - 2.0, 0.0, 0.0))
                    .playing(clip),
            )?,
        );
    }

    scene.add_light(Light::directional(Vec3::new(-0.4, -1.0, -0.3)).with_shadows());
    scene.add_light(Light::point(Vec3::new(0.0, 3.0, 4.0), 10.0));
    scene.add_light(Light::spot(Vec3::new(4.0, 5.0, 0.0), Vec3::NEG_Y));
    scene.set_ambient(Vec3::new(0.05, 0.05, 0.08));
    Ok(walkers[0])
}

fn report(frames: &FrameLoop, outcome: &FrameOutcome) {
    let stats = frames.scene().frame_stats();
    log::info!(
        "frame {}: {:?}, {} prepared, {} writes, {} dispatches, {} shadow, {} drawn, {} skipped",
        stats.frame_index,
        outcome,
        stats.animators_prepared,
        stats.writes_submitted,
        stats.dispatches,
        stats.shadow_draws,
        stats.draws_issued,
        stats.draws_skipped,
    );
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let backend = Arc::new(
        HeadlessBackend::new()
            .with_kernel(models::ANIMATE_RIGID, frustum_cull_kernel())
            .with_kernel(models::ANIMATE_SKINNED, frustum_cull_kernel())
            .with_kernel(LIGHT_CULL_PIPELINE, light_cull_kernel()),
    );
    let settings = SceneSettings::from_ron(SETTINGS).context("sandbox settings")?;
    let scene = Scene::builder()
        .backend(backend.clone())
        .camera(Camera::looking_at(Vec3::new(0.0, 6.0, 16.0), Vec3::ZERO))
        .settings(settings)
        .build()?;
    let walker = populate(&scene, &backend)?;

    let mut frames = FrameLoop::new(Arc::new(scene));
    for frame in 0..120 {
        let outcome = frames.tick(FRAME_TIME);
        if frame % 30 == 0 {
            report(&frames, &outcome);
        }
        if outcome == FrameOutcome::Shutdown {
            anyhow::bail!("frame loop shut down after {} frames", frames.frames());
        }

        // the first walker switches to the walk cycle halfway through
        if frame == 60 {
            frames
                .scene()
                .update(walker, |w| w.blend_to_animation(1, 0.25))??;
        }
    }

    log::info!(
        "{} frames rendered, {} draws recorded, {} buffers live",
        frames.frames(),
        backend.draws().len(),
        backend.live_buffers()
    );
    frames.scene().clear()?;
    Ok(())
}
