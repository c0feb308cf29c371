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

//! Camera and light uniforms, and the scene's light registry.

use super::error::SceneError;
use super::resources::required_buffer;
use super::scene::{Scene, SceneState};
use marionette_core::math::Vec3;
use marionette_core::renderer::api::{BindingRole, BufferWrite};
use marionette_core::renderer::layout::{encode_light_buffer, CameraUniform, GpuRecord};
use marionette_core::renderer::Light;
use marionette_core::{LightId, ResourceError};

/// The camera and light-buffer writes that open every frame.
pub(super) fn frame_writes(
    state: &SceneState,
    max_lights: usize,
) -> Result<Vec<BufferWrite>, ResourceError> {
    let camera = CameraUniform {
        view_projection: state.camera.view_projection(),
        position: state.camera.position,
    };
    let lights = encode_light_buffer(
        state.lights.iter().map(|(_, l)| l),
        state.ambient,
        max_lights,
    );
    Ok(vec![
        BufferWrite::new(
            required_buffer(&state.resources.camera, BindingRole::Camera)?,
            0,
            camera.to_bytes(),
        ),
        BufferWrite::new(
            required_buffer(&state.resources.lights, BindingRole::Lights)?,
            0,
            lights,
        ),
    ])
}

/// Number of lights the light buffer carries after the budget is applied.
pub(super) fn active_light_count(lights: &[(LightId, Light)], max_lights: usize) -> u32 {
    lights.iter().filter(|(_, l)| l.enabled).count().min(max_lights) as u32
}

/// Direction of the first enabled, shadow-casting directional light.
pub(super) fn shadow_caster(lights: &[(LightId, Light)]) -> Option<Vec3> {
    lights
        .iter()
        .filter(|(_, l)| l.enabled && l.casts_shadow)
        .find_map(|(_, l)| l.directional_direction())
}

impl Scene {
    /// Registers a light. Lights are marshalled in registration order, so
    /// register the important ones first when the budget may overflow.
    pub fn add_light(&self, light: Light) -> LightId {
        let id = self.ids.next_light();
        self.state.write().lights.push((id, light));
        log::debug!("Scene: light {id} added");
        id
    }

    /// Removes a light.
    pub fn remove_light(&self, id: LightId) -> Result<Light, SceneError> {
        let mut state = self.state.write();
        let position = state
            .lights
            .iter()
            .position(|(light_id, _)| *light_id == id)
            .ok_or(SceneError::UnknownLight(id))?;
        Ok(state.lights.remove(position).1)
    }

    /// Replaces a registered light.
    pub fn set_light(&self, id: LightId, light: Light) -> Result<(), SceneError> {
        let mut state = self.state.write();
        let slot = state
            .lights
            .iter_mut()
            .find(|(light_id, _)| *light_id == id)
            .ok_or(SceneError::UnknownLight(id))?;
        slot.1 = light;
        Ok(())
    }

    /// A copy of a registered light.
    pub fn light(&self, id: LightId) -> Option<Light> {
        self.state
            .read()
            .lights
            .iter()
            .find(|(light_id, _)| *light_id == id)
            .map(|(_, l)| *l)
    }

    /// Number of registered lights, disabled ones included.
    pub fn light_count(&self) -> usize {
        self.state.read().lights.len()
    }

    /// Sets the ambient colour written into the light buffer header.
    pub fn set_ambient(&self, ambient: Vec3) {
        self.state.write().ambient = ambient;
    }
}
