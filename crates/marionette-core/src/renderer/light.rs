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

//! Defines light types for the rendering system.
//!
//! Lights are registered on a scene, marshalled each frame into one light
//! buffer (see [`encode_light_buffer`](super::layout::encode_light_buffer)),
//! and consumed by the tiled light-culling pass and the shadow pass.

use crate::math::Vec3;

/// Light arriving from one direction everywhere, like the sun.
///
/// The first enabled, shadow-casting directional light of a scene drives
/// the shadow pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Unit vector from the light into the scene.
    pub direction: Vec3,
    /// Linear RGB colour.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// Omni-directional light with a hard range cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Linear RGB colour.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Distance in world units past which the light contributes nothing.
    /// Tile culling relies on it.
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 100.0,
            range: 10.0,
        }
    }
}

/// Cone light with range and angular falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// Unit cone axis.
    pub direction: Vec3,
    /// Linear RGB colour.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Range in world units.
    pub range: f32,
    /// Half-angle in radians where falloff starts.
    pub inner_cone_angle: f32,
    /// Half-angle in radians where the light reaches zero.
    pub outer_cone_angle: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: Vec3::ONE,
            intensity: 200.0,
            range: 15.0,
            inner_cone_angle: 20.0_f32.to_radians(),
            outer_cone_angle: 35.0_f32.to_radians(),
        }
    }
}

/// Type-specific light parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    /// See [`DirectionalLight`].
    Directional(DirectionalLight),
    /// See [`PointLight`].
    Point(PointLight),
    /// See [`SpotLight`].
    Spot(SpotLight),
}

impl Default for LightType {
    fn default() -> Self {
        LightType::Directional(DirectionalLight::default())
    }
}

impl LightType {
    /// GPU type tag: 0 = directional, 1 = point, 2 = spot.
    pub const fn gpu_tag(&self) -> u32 {
        match self {
            LightType::Directional(_) => 0,
            LightType::Point(_) => 1,
            LightType::Spot(_) => 2,
        }
    }
}

/// A light registered on a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// The light's type-specific parameters.
    pub light_type: LightType,
    /// World-space position (ignored for directional lights).
    pub position: Vec3,
    /// Disabled lights are skipped by the light buffer and the shadow pass.
    pub enabled: bool,
    /// Whether the light participates in the shadow pass.
    pub casts_shadow: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::default(),
            position: Vec3::ZERO,
            enabled: true,
            casts_shadow: false,
        }
    }
}

impl Light {
    /// A directional light pointing along `direction`.
    pub fn directional(direction: Vec3) -> Self {
        Self {
            light_type: LightType::Directional(DirectionalLight {
                direction: direction.normalize_or_zero(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// A point light at `position`.
    pub fn point(position: Vec3, range: f32) -> Self {
        Self {
            light_type: LightType::Point(PointLight {
                range,
                ..Default::default()
            }),
            position,
            ..Default::default()
        }
    }

    /// A spot light at `position` pointing along `direction`.
    pub fn spot(position: Vec3, direction: Vec3) -> Self {
        Self {
            light_type: LightType::Spot(SpotLight {
                direction: direction.normalize_or_zero(),
                ..Default::default()
            }),
            position,
            ..Default::default()
        }
    }

    /// Marks the light as a shadow caster.
    pub fn with_shadows(mut self) -> Self {
        self.casts_shadow = true;
        self
    }

    /// Sets the `enabled` flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the direction of a directional light.
    pub fn directional_direction(&self) -> Option<Vec3> {
        match self.light_type {
            LightType::Directional(d) => Some(d.direction),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn default_sun_direction_is_normalized() {
        let light = DirectionalLight::default();
        assert_eq!(light.color, Vec3::ONE);
        assert!(approx_eq(light.intensity, 1.0));
        assert!(approx_eq(light.direction.length(), 1.0));
    }

    #[test]
    fn default_spot_cone_opens_outward() {
        let light = SpotLight::default();
        assert!(light.inner_cone_angle < light.outer_cone_angle);
        assert!(approx_eq(light.direction.length(), 1.0));
    }

    #[test]
    fn gpu_tags_follow_shader_constants() {
        assert_eq!(Light::directional(Vec3::NEG_Y).light_type.gpu_tag(), 0);
        assert_eq!(Light::point(Vec3::ZERO, 5.0).light_type.gpu_tag(), 1);
        assert_eq!(Light::spot(Vec3::ZERO, Vec3::NEG_Y).light_type.gpu_tag(), 2);
    }

    #[test]
    fn builders_set_flags_and_normalize() {
        let light = Light::directional(Vec3::new(0.0, -2.0, 0.0)).with_shadows();
        assert!(light.casts_shadow);
        assert!(light.enabled);
        assert_eq!(light.directional_direction(), Some(Vec3::NEG_Y));
        assert!(!Light::point(Vec3::ZERO, 1.0).with_enabled(false).enabled);
    }
}
