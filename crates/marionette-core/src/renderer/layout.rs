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

//! Byte-exact encoders for the GPU-facing records shared by the scene passes.
//!
//! Every record is written field by field in little-endian order. Nothing here
//! relies on the in-memory layout of a Rust struct; the `SIZE` constant of each
//! record is the contract with the shader side and is checked by tests.

use crate::math::{Mat4, Vec3, Vec4};
use crate::renderer::light::{Light, LightType};
use bytes::{Buf, BufMut};

/// A record with a fixed GPU layout.
pub trait GpuRecord {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Appends the encoded record to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Encodes the record into a fresh vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.encode(&mut buf);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }
}

/// Writes a `vec3<f32>` (12 bytes).
#[inline]
pub fn put_vec3<B: BufMut>(buf: &mut B, v: Vec3) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
    buf.put_f32_le(v.z);
}

/// Writes a `vec4<f32>` (16 bytes).
#[inline]
pub fn put_vec4<B: BufMut>(buf: &mut B, v: Vec4) {
    put_vec3(buf, v.truncate());
    buf.put_f32_le(v.w);
}

/// Writes a column-major `mat4x4<f32>` (64 bytes).
#[inline]
pub fn put_mat4<B: BufMut>(buf: &mut B, m: &Mat4) {
    for value in m.to_cols_array() {
        buf.put_f32_le(value);
    }
}

/// Writes `count` zeroed 32-bit padding words.
#[inline]
pub fn put_padding<B: BufMut>(buf: &mut B, count: usize) {
    for _ in 0..count {
        buf.put_u32_le(0);
    }
}

/// Reads a column-major `mat4x4<f32>`.
pub fn get_mat4<B: Buf>(buf: &mut B) -> Mat4 {
    let mut cols = [0.0f32; 16];
    for value in cols.iter_mut() {
        *value = buf.get_f32_le();
    }
    Mat4::from_cols_array(&cols)
}

/// Header of the packed light buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightHeader {
    /// Ambient colour.
    pub ambient: Vec3,
    /// Number of light records that follow.
    pub count: u32,
}

impl GpuRecord for LightHeader {
    const SIZE: usize = 16;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_vec3(buf, self.ambient);
        buf.put_u32_le(self.count);
    }
}

/// One light as seen by the shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuLight {
    /// World position.
    pub position: Vec3,
    /// Range; zero for directional lights.
    pub range: f32,
    /// Linear RGB colour.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Direction; zero for point lights.
    pub direction: Vec3,
    /// 0 directional, 1 point, 2 spot.
    pub light_type: u32,
    /// Cosine of the inner cone angle.
    pub inner_cos: f32,
    /// Cosine of the outer cone angle.
    pub outer_cos: f32,
    /// Whether the light casts shadows.
    pub casts_shadow: bool,
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        let (color, intensity, range, direction, inner_cos, outer_cos) = match light.light_type {
            LightType::Directional(d) => (d.color, d.intensity, 0.0, d.direction, 0.0, 0.0),
            LightType::Point(p) => (p.color, p.intensity, p.range, Vec3::ZERO, 0.0, 0.0),
            LightType::Spot(s) => (
                s.color,
                s.intensity,
                s.range,
                s.direction,
                s.inner_cone_angle.cos(),
                s.outer_cone_angle.cos(),
            ),
        };
        Self {
            position: light.position,
            range,
            color,
            intensity,
            direction,
            light_type: light.light_type.gpu_tag(),
            inner_cos,
            outer_cos,
            casts_shadow: light.casts_shadow,
        }
    }
}

impl GpuRecord for GpuLight {
    const SIZE: usize = 64;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_vec3(buf, self.position);
        buf.put_f32_le(self.range);
        put_vec3(buf, self.color);
        buf.put_f32_le(self.intensity);
        put_vec3(buf, self.direction);
        buf.put_u32_le(self.light_type);
        buf.put_f32_le(self.inner_cos);
        buf.put_f32_le(self.outer_cos);
        buf.put_u32_le(self.casts_shadow as u32);
        put_padding(buf, 1);
    }
}

/// Size in bytes of a light buffer holding at most `max_lights` records.
pub const fn light_buffer_size(max_lights: usize) -> u64 {
    (LightHeader::SIZE + max_lights * GpuLight::SIZE) as u64
}

/// Marshals the enabled lights and the ambient colour into one buffer.
///
/// Disabled lights are skipped. Lights past `max_lights` are dropped; callers
/// are expected to sort by importance beforehand.
pub fn encode_light_buffer<'a, I>(lights: I, ambient: Vec3, max_lights: usize) -> Vec<u8>
where
    I: IntoIterator<Item = &'a Light>,
{
    let mut enabled: Vec<&Light> = lights.into_iter().filter(|l| l.enabled).collect();
    if enabled.len() > max_lights {
        log::warn!(
            "{} lights enabled, budget is {}; dropping the remainder",
            enabled.len(),
            max_lights
        );
        enabled.truncate(max_lights);
    }

    let mut buf = Vec::with_capacity(LightHeader::SIZE + enabled.len() * GpuLight::SIZE);
    LightHeader {
        ambient,
        count: enabled.len() as u32,
    }
    .encode(&mut buf);
    for light in enabled {
        GpuLight::from(light).encode(&mut buf);
    }
    buf
}

/// Camera uniform for the main pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUniform {
    /// Combined view-projection.
    pub view_projection: Mat4,
    /// Eye position.
    pub position: Vec3,
}

impl GpuRecord for CameraUniform {
    const SIZE: usize = 80;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_mat4(buf, &self.view_projection);
        put_vec3(buf, self.position);
        put_padding(buf, 1);
    }
}

/// Light view-projection for the shadow depth pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowDepthUniform {
    /// Light view-projection.
    pub light_view_projection: Mat4,
}

impl GpuRecord for ShadowDepthUniform {
    const SIZE: usize = 64;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_mat4(buf, &self.light_view_projection);
    }
}

/// Shadow sampling parameters for the main pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowDataUniform {
    /// Light view-projection.
    pub light_view_projection: Mat4,
    /// `1 / shadow_map_size`.
    pub texel_size: f32,
    /// Constant depth bias.
    pub bias: f32,
    /// Normal-offset bias.
    pub normal_bias: f32,
}

impl GpuRecord for ShadowDataUniform {
    const SIZE: usize = 80;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_mat4(buf, &self.light_view_projection);
        buf.put_f32_le(self.texel_size);
        buf.put_f32_le(self.bias);
        buf.put_f32_le(self.normal_bias);
        put_padding(buf, 1);
    }
}

/// Uniform for the tiled light culling compute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCullUniform {
    /// Inverse of the camera projection.
    pub inverse_projection: Mat4,
    /// Camera view matrix.
    pub view: Mat4,
    /// Tiles along X.
    pub tile_count_x: u32,
    /// Tiles along Y.
    pub tile_count_y: u32,
    /// Screen width in pixels.
    pub screen_width: f32,
    /// Screen height in pixels.
    pub screen_height: f32,
    /// Number of lights in the light buffer.
    pub light_count: u32,
    /// Camera near plane.
    pub near: f32,
    /// Camera far plane.
    pub far: f32,
}

impl GpuRecord for TileCullUniform {
    const SIZE: usize = 160;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_mat4(buf, &self.inverse_projection);
        put_mat4(buf, &self.view);
        buf.put_u32_le(self.tile_count_x);
        buf.put_u32_le(self.tile_count_y);
        buf.put_f32_le(self.screen_width);
        buf.put_f32_le(self.screen_height);
        buf.put_u32_le(self.light_count);
        buf.put_f32_le(self.near);
        buf.put_f32_le(self.far);
        put_padding(buf, 1);
    }
}

/// Per-tile uniform read by the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileUniform {
    /// Tiles along X.
    pub tile_count_x: u32,
    /// Tile edge in pixels.
    pub tile_size: u32,
}

impl GpuRecord for TileUniform {
    const SIZE: usize = 8;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.tile_count_x);
        buf.put_u32_le(self.tile_size);
    }
}

/// Arguments of an indexed indirect draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndirectArgs {
    /// Indices per instance.
    pub index_count: u32,
    /// Instances to draw; accumulated by the cull pass.
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Added to each index.
    pub base_vertex: i32,
    /// First instance.
    pub first_instance: u32,
}

impl IndirectArgs {
    /// Byte offset of `instance_count` inside the record.
    pub const INSTANCE_COUNT_OFFSET: usize = 4;

    /// Arguments with the instance count zeroed, ready for the cull pass.
    pub fn reset(index_count: u32) -> Self {
        Self {
            index_count,
            ..Default::default()
        }
    }

    /// Decodes a record from the start of `bytes`.
    pub fn decode(mut bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            index_count: bytes.get_u32_le(),
            instance_count: bytes.get_u32_le(),
            first_index: bytes.get_u32_le(),
            base_vertex: bytes.get_i32_le(),
            first_instance: bytes.get_u32_le(),
        })
    }
}

impl GpuRecord for IndirectArgs {
    const SIZE: usize = 20;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.index_count);
        buf.put_u32_le(self.instance_count);
        buf.put_u32_le(self.first_index);
        buf.put_i32_le(self.base_vertex);
        buf.put_u32_le(self.first_instance);
    }
}
