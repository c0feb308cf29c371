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

//! Bone hierarchy of a skeletal model.

use bytes::BufMut;
use marionette_core::math::{Mat4, Quat, Vec3, Vec4};
use marionette_core::renderer::layout::{put_mat4, put_padding, put_vec4, GpuRecord};
use marionette_core::AnimationError;

/// One bone. Bones are stored parents-first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    /// Mesh space to bone space.
    pub inverse_bind: Mat4,
    /// Index of the parent bone, `-1` for a root.
    pub parent: i32,
    /// Local translation.
    pub translation: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            inverse_bind: Mat4::IDENTITY,
            parent: -1,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl GpuRecord for Bone {
    const SIZE: usize = 128;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_mat4(buf, &self.inverse_bind);
        buf.put_i32_le(self.parent);
        put_padding(buf, 3);
        put_vec4(buf, self.translation.extend(0.0));
        put_vec4(buf, Vec4::from(self.rotation));
        put_vec4(buf, self.scale.extend(0.0));
    }
}

/// Checks that bone `index` may have `parent`.
pub fn check_parent(index: usize, parent: i32) -> Result<(), AnimationError> {
    if parent < 0 || (parent as usize) < index {
        Ok(())
    } else {
        Err(AnimationError::BoneOrder {
            bone: index,
            parent,
        })
    }
}
