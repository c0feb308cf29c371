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

//! Global settings for a scene and its frame protocol.

use crate::error::ConfigError;
use crate::renderer::forward_plus::ForwardPlusTileConfig;
use serde::Deserialize;

/// Default maximum number of lights marshalled into the light buffer.
pub const DEFAULT_MAX_LIGHTS: usize = 1024;

/// Settings for the directional shadow pass.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Whether the shadow pass runs at all.
    pub enabled: bool,
    /// Edge length of the square shadow depth texture, in texels.
    pub map_size: u32,
    /// Half-width of the orthographic shadow volume, in world units.
    pub extent: f32,
    /// Distance from the camera target back along the light direction to the light eye.
    pub distance: f32,
    /// Near plane of the shadow projection.
    pub near: f32,
    /// Far plane of the shadow projection.
    pub far: f32,
    /// Constant depth bias.
    pub bias: f32,
    /// Bias along the surface normal.
    pub normal_bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            map_size: 2048,
            extent: 25.0,
            distance: 50.0,
            near: 0.1,
            far: 150.0,
            bias: 0.005,
            normal_bias: 0.02,
        }
    }
}

/// A collection of settings that shape the per-frame protocol of a scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// If `true`, animators frustum-cull on the GPU and draws go through the indirect path.
    pub culling_enabled: bool,
    /// Shadow pass configuration.
    pub shadows: ShadowSettings,
    /// Forward+ tile configuration.
    pub tiles: ForwardPlusTileConfig,
    /// Lights beyond this budget are dropped from the light buffer.
    pub max_lights: usize,
    /// Render target width in pixels.
    pub screen_width: u32,
    /// Render target height in pixels.
    pub screen_height: u32,
    /// Number of persistent prep workers. `None` lets the pool decide.
    pub worker_threads: Option<usize>,
    /// Instance capacity of a freshly created animator.
    pub initial_animator_capacity: u32,
    /// Ambient light colour (linear RGB).
    pub ambient: [f32; 3],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            culling_enabled: false,
            shadows: ShadowSettings::default(),
            tiles: ForwardPlusTileConfig::default(),
            max_lights: DEFAULT_MAX_LIGHTS,
            screen_width: 1920,
            screen_height: 1080,
            worker_threads: None,
            initial_animator_capacity: 8,
            ambient: [0.03, 0.03, 0.03],
        }
    }
}

impl SceneSettings {
    /// Parses settings from a RON document. Missing fields keep their defaults.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::forward_plus::TileSize;

    #[test]
    fn defaults_match_documented_budget() {
        let settings = SceneSettings::default();
        assert_eq!(settings.max_lights, 1024);
        assert_eq!(settings.initial_animator_capacity, 8);
        assert_eq!(settings.tiles.tile_size, TileSize::X16);
        assert!(!settings.culling_enabled);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let settings =
            SceneSettings::from_ron("(culling_enabled: true, shadows: (map_size: 1024))").unwrap();
        assert!(settings.culling_enabled);
        assert_eq!(settings.shadows.map_size, 1024);
        assert!(settings.shadows.enabled);
        assert_eq!(settings.screen_width, 1920);
    }

    #[test]
    fn tile_size_parses_from_ron() {
        let settings = SceneSettings::from_ron("(tiles: (tile_size: X32))").unwrap();
        assert_eq!(settings.tiles.tile_size, TileSize::X32);
        assert_eq!(settings.tiles.max_lights_per_tile, 128);
    }

    #[test]
    fn malformed_ron_is_a_config_error() {
        let err = SceneSettings::from_ron("(culling_enabled: maybe)").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }
}
