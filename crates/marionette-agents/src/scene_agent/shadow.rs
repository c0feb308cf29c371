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

//! The directional shadow pass.

use super::error::{DrawFailure, SceneError};
use super::lighting::shadow_caster;
use super::resources::required_buffer;
use super::scene::{Scene, SHADOW_PIPELINE};
use marionette_core::animation::AnimationBackend;
use marionette_core::math::{Mat4, Vec3};
use marionette_core::renderer::api::{BindingRole, BufferWrite, DrawCall, PipelineKey};
use marionette_core::renderer::layout::{GpuRecord, ShadowDataUniform, ShadowDepthUniform};
use marionette_core::settings::ShadowSettings;
use marionette_core::RenderError;

/// View-projection of a directional light looking along `direction` at `target`.
///
/// The eye sits `settings.distance` back from the target so the shadow volume
/// follows what the camera looks at rather than where it stands.
pub fn light_view_projection(direction: Vec3, target: Vec3, settings: &ShadowSettings) -> Mat4 {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let eye = target - direction * settings.distance;
    // look_at degenerates when the view direction is parallel to up
    let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let view = Mat4::look_at_rh(eye, target, up);
    let extent = settings.extent;
    let projection =
        Mat4::orthographic_rh(-extent, extent, -extent, extent, settings.near, settings.far);
    projection * view
}

impl Scene {
    /// Phase 5: renders one depth-only draw per animator from the first
    /// enabled, shadow-casting directional light.
    ///
    /// Does nothing when shadows are disabled or no light qualifies. With
    /// culling on, draws go through the indirect path so the depth pass reads
    /// exactly the instances the compute pass compacted.
    pub fn prepare_shadows(&self) -> Result<(), SceneError> {
        if !self.settings.shadows.enabled {
            return Ok(());
        }
        let state = self.state.read();
        let Some(direction) = shadow_caster(&state.lights) else {
            log::trace!("Scene: no shadow-casting directional light");
            return Ok(());
        };

        let shadows = &self.settings.shadows;
        let light_view_projection = light_view_projection(direction, state.camera.target, shadows);
        let resources = &state.resources;
        self.backend.write_buffers(&[
            BufferWrite::new(
                required_buffer(&resources.shadow_depth, BindingRole::ShadowDepth)?,
                0,
                ShadowDepthUniform {
                    light_view_projection,
                }
                .to_bytes(),
            ),
            BufferWrite::new(
                required_buffer(&resources.shadow, BindingRole::ShadowData)?,
                0,
                ShadowDataUniform {
                    light_view_projection,
                    texel_size: 1.0 / shadows.map_size.max(1) as f32,
                    bias: shadows.bias,
                    normal_bias: shadows.normal_bias,
                }
                .to_bytes(),
            ),
        ])?;

        let depth_group = resources
            .shadow_depth
            .bind_group()
            .ok_or(RenderError::NotInitialized)?;
        let pipeline = PipelineKey::new(SHADOW_PIPELINE);
        let mut failures = Vec::new();
        let mut draws = 0;

        self.backend.begin_shadow_frame()?;
        self.backend.begin_shadow_pass()?;
        for slot in state.animators.iter().filter(|s| s.animator.instance_count() > 0) {
            let Some(instances) = slot.instances.bind_group() else {
                continue;
            };
            let mesh = slot.animator.model().mesh;
            let call = DrawCall {
                pipeline: pipeline.clone(),
                mesh,
                index_range: 0..mesh.index_count,
                bind_groups: vec![(0, depth_group), (1, instances)],
                instance_count: slot.animator.instance_count(),
            };
            let indirect = slot
                .animator
                .backend()
                .indirect_buffer(slot.compute.buffer(BindingRole::IndirectArgs));
            let result = match indirect {
                Some(buffer) => self.backend.shadow_draw_call_indirect(&call, buffer),
                None => self.backend.shadow_draw_call(&call),
            };
            match result {
                Ok(()) => draws += 1,
                Err(error) => {
                    log::error!("Scene: shadow draw of '{}' failed: {error}", slot.animator.name());
                    failures.push(DrawFailure {
                        model: slot.animator.name().to_owned(),
                        material: SHADOW_PIPELINE.to_owned(),
                        error,
                    });
                }
            }
        }
        self.backend.end_shadow_pass()?;
        self.backend.end_shadow_frame()?;

        self.stats.lock().shadow_draws = draws;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SceneError::DrawFailures(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marionette_core::math::Vec4;

    #[test]
    fn shadow_volume_is_centred_on_the_target() {
        let settings = ShadowSettings::default();
        let target = Vec3::new(10.0, 0.0, -4.0);
        let matrix = light_view_projection(Vec3::new(-1.0, -1.0, 0.0), target, &settings);

        let clip = matrix * Vec4::new(target.x, target.y, target.z, 1.0);
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-4);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn straight_down_light_is_well_formed() {
        let matrix = light_view_projection(Vec3::NEG_Y, Vec3::ZERO, &ShadowSettings::default());
        assert!(matrix.is_finite());
        let clip = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-4);
    }
}
