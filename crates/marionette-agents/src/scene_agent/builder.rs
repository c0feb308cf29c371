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
use super::scene::Scene;
use marionette_core::renderer::GpuBackend;
use marionette_core::{Camera, ConfigError, IdGenerator, SceneSettings};
use std::sync::Arc;

/// Builds a [`Scene`]. The backend and the camera are required.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    backend: Option<Arc<dyn GpuBackend>>,
    camera: Option<Camera>,
    settings: SceneSettings,
    ids: Option<Arc<IdGenerator>>,
}

impl SceneBuilder {
    /// A builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// The GPU backend every phase submits to.
    pub fn backend(mut self, backend: Arc<dyn GpuBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The initial camera.
    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Scene settings.
    pub fn settings(mut self, settings: SceneSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shares an id generator with other scenes. Each scene gets its own otherwise.
    pub fn id_generator(mut self, ids: Arc<IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Creates the scene resources and the worker pool.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingBackend`] or [`ConfigError::MissingCamera`] when
    /// a required part was not given, and any resource error raised while
    /// creating the scene-owned buffers.
    pub fn build(self) -> Result<Scene, SceneError> {
        let backend = self.backend.ok_or(ConfigError::MissingBackend)?;
        let camera = self.camera.ok_or(ConfigError::MissingCamera)?;
        let ids = self.ids.unwrap_or_default();
        Scene::from_parts(backend, self.settings, ids, camera)
    }
}
