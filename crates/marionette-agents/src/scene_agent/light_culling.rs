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

use super::error::SceneError;
use super::lighting::active_light_count;
use super::resources::required_buffer;
use super::scene::{Scene, LIGHT_CULL_PIPELINE};
use marionette_core::renderer::api::{BindingRole, BufferWrite, PipelineKey};
use marionette_core::renderer::layout::{GpuRecord, TileCullUniform, TileUniform};
use marionette_core::{Camera, SceneSettings};

/// The culling uniform and the fragment-stage tile uniform for one frame.
pub(super) fn tile_uniforms(
    camera: &Camera,
    settings: &SceneSettings,
    light_count: u32,
) -> (TileCullUniform, TileUniform) {
    let (tile_count_x, tile_count_y) = settings
        .tiles
        .tile_dimensions(settings.screen_width, settings.screen_height);
    let cull = TileCullUniform {
        inverse_projection: camera.inverse_projection(),
        view: camera.view(),
        tile_count_x,
        tile_count_y,
        screen_width: settings.screen_width as f32,
        screen_height: settings.screen_height as f32,
        light_count,
        near: camera.near,
        far: camera.far,
    };
    let tile = TileUniform {
        tile_count_x,
        tile_size: settings.tiles.tile_size.pixels(),
    };
    (cull, tile)
}

impl Scene {
    /// Phase 6: Forward+ tiled light culling over the whole tile grid.
    ///
    /// Dispatches even without active lights so the lists of the previous
    /// frame are overwritten.
    pub fn prepare_light_culling(&self) -> Result<(), SceneError> {
        let state = self.state.read();
        let light_count = active_light_count(&state.lights, self.settings.max_lights);
        let (cull, tile) = tile_uniforms(&state.camera, &self.settings, light_count);
        let resources = &state.resources;

        self.backend.write_buffers(&[
            BufferWrite::new(
                required_buffer(&resources.light_cull, BindingRole::LightCullUniforms)?,
                0,
                cull.to_bytes(),
            ),
            BufferWrite::new(
                required_buffer(&resources.tiles, BindingRole::TileUniforms)?,
                0,
                tile.to_bytes(),
            ),
        ])?;

        self.backend.begin_compute_frame()?;
        self.backend.dispatch_compute(
            &PipelineKey::new(LIGHT_CULL_PIPELINE),
            &resources.light_cull,
            [cull.tile_count_x, cull.tile_count_y, 1],
        )?;
        self.backend.end_compute_frame()?;

        self.stats.lock().dispatches += 1;
        log::trace!(
            "Scene: light culling over {}x{} tiles, {light_count} lights",
            cull.tile_count_x,
            cull.tile_count_y
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::math::Vec3;

    #[test]
    fn full_hd_grid_uses_sixteen_pixel_tiles() {
        let camera = Camera::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO);
        let settings = SceneSettings::default();
        let (cull, tile) = tile_uniforms(&camera, &settings, 7);
        assert_eq!((cull.tile_count_x, cull.tile_count_y), (120, 68));
        assert_eq!(cull.light_count, 7);
        assert_eq!(cull.screen_width, 1920.0);
        assert_eq!(tile, TileUniform { tile_count_x: 120, tile_size: 16 });
    }
}
