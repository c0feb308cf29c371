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

use super::layouts;
use super::scene::{LIGHT_CULL_PIPELINE, SHADOW_PIPELINE};
use marionette_core::renderer::api::{
    BindGroupProvider, BindingRole, BufferId, PipelineDescriptor, PipelineKind,
};
use marionette_core::renderer::layout::light_buffer_size;
use marionette_core::renderer::{GpuBackend, SizeOverrides, UsageOverrides};
use marionette_core::{ResourceError, SceneSettings};

/// The buffer bound for `role`, or [`ResourceError::MissingBinding`].
pub(super) fn required_buffer(
    provider: &BindGroupProvider,
    role: BindingRole,
) -> Result<BufferId, ResourceError> {
    provider.buffer(role).ok_or(ResourceError::MissingBinding(role))
}

/// Bind groups owned by the scene rather than by an animator.
#[derive(Debug)]
pub(super) struct SceneResources {
    pub camera: BindGroupProvider,
    pub lights: BindGroupProvider,
    // main-pass shadow sampling
    pub shadow: BindGroupProvider,
    // depth-only pass
    pub shadow_depth: BindGroupProvider,
    pub tiles: BindGroupProvider,
    // shares lights, grid and indices with the groups above
    pub light_cull: BindGroupProvider,
}

impl SceneResources {
    /// Registers the scene pipelines and creates every scene-owned group.
    pub fn create(
        backend: &dyn GpuBackend,
        settings: &SceneSettings,
    ) -> Result<Self, ResourceError> {
        backend.register_shadow_pipeline(&PipelineDescriptor::new(
            SHADOW_PIPELINE,
            PipelineKind::Shadow,
            layouts::shadow_pipeline(),
        ))?;
        backend.register_pipelines(&[PipelineDescriptor::new(
            LIGHT_CULL_PIPELINE,
            PipelineKind::Compute,
            layouts::light_cull_pipeline(),
        )])?;

        let usage = UsageOverrides::new();
        let no_sizes = SizeOverrides::new();
        let (width, height) = (settings.screen_width, settings.screen_height);

        let mut camera = BindGroupProvider::new("scene::camera");
        backend.init_bind_group(&mut camera, &layouts::camera(0), &usage, &no_sizes)?;

        let mut lights = BindGroupProvider::new("scene::lights");
        let sizes =
            SizeOverrides::from([(BindingRole::Lights, light_buffer_size(settings.max_lights))]);
        backend.init_bind_group(&mut lights, &layouts::lights(0), &usage, &sizes)?;

        let shadow_map = backend.create_shadow_depth_texture(settings.shadows.map_size)?;
        let shadow_sampler = backend.create_comparison_sampler()?;
        let mut shadow = BindGroupProvider::new("scene::shadow");
        shadow.insert_texture(1, BindingRole::ShadowMap, shadow_map);
        shadow.insert_sampler(2, BindingRole::ShadowSampler, shadow_sampler);
        backend.init_bind_group(&mut shadow, &layouts::shadow(0), &usage, &no_sizes)?;

        let mut shadow_depth = BindGroupProvider::new("scene::shadow_depth");
        backend.init_bind_group(&mut shadow_depth, &layouts::shadow_depth(0), &usage, &no_sizes)?;

        let mut tiles = BindGroupProvider::new("scene::tiles");
        let sizes = SizeOverrides::from([
            (
                BindingRole::TileLightGrid,
                settings.tiles.light_grid_buffer_size(width, height),
            ),
            (
                BindingRole::TileLightIndices,
                settings.tiles.light_index_buffer_size(width, height),
            ),
        ]);
        backend.init_bind_group(&mut tiles, &layouts::tiles(0), &usage, &sizes)?;

        let mut light_cull = BindGroupProvider::new("scene::light_cull");
        for (binding, role, source) in [
            (1, BindingRole::Lights, &lights),
            (2, BindingRole::TileLightGrid, &tiles),
            (3, BindingRole::TileLightIndices, &tiles),
        ] {
            light_cull.share_buffer(binding, role, required_buffer(source, role)?);
        }
        backend.init_bind_group(&mut light_cull, &layouts::light_cull(0), &usage, &no_sizes)?;

        let (tiles_x, tiles_y) = settings.tiles.tile_dimensions(width, height);
        log::info!(
            "Scene resources created: {} light slots, {}x{} tiles, {}px shadow map",
            settings.max_lights,
            tiles_x,
            tiles_y,
            settings.shadows.map_size
        );

        Ok(Self {
            camera,
            lights,
            shadow,
            shadow_depth,
            tiles,
            light_cull,
        })
    }

    /// Releases the groups in reverse dependency order: sharers before owners.
    pub fn release(&mut self, backend: &dyn GpuBackend) -> Result<(), ResourceError> {
        backend.release_bind_group(&mut self.light_cull)?;
        backend.release_bind_group(&mut self.tiles)?;
        backend.release_bind_group(&mut self.shadow_depth)?;
        backend.release_bind_group(&mut self.shadow)?;
        backend.release_bind_group(&mut self.lights)?;
        backend.release_bind_group(&mut self.camera)
    }

    /// The provider backing a scene-level role, if the scene owns one.
    pub fn provider_for(&self, role: BindingRole) -> Option<&BindGroupProvider> {
        match role {
            BindingRole::Camera => Some(&self.camera),
            BindingRole::Lights => Some(&self.lights),
            BindingRole::ShadowData | BindingRole::ShadowMap | BindingRole::ShadowSampler => {
                Some(&self.shadow)
            }
            BindingRole::TileUniforms
            | BindingRole::TileLightGrid
            | BindingRole::TileLightIndices => Some(&self.tiles),
            _ => None,
        }
    }
}
