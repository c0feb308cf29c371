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

//! View-frustum planes used for GPU instance culling.

use crate::math::{Mat4, Vec3, Vec4};

/// A plane in Hessian normal form: `dot(normal, p) + distance = 0`.
///
/// Points with a positive signed distance lie inside the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the frustum.
    pub normal: Vec3,
    /// Signed distance term.
    pub distance: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            distance: 0.0,
        }
    }
}

impl Plane {
    /// Builds a plane from raw `(a, b, c, d)` coefficients and normalizes it.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.truncate();
        let length = normal.length();
        if length > 0.0 {
            Self {
                normal: normal / length,
                distance: coefficients.w / length,
            }
        } else {
            Self {
                normal,
                distance: coefficients.w,
            }
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Returns the plane packed as `(normal.xyz, distance)`.
    #[inline]
    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }
}

/// The six planes of a view frustum, ordered left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frustum {
    /// The planes, inward facing.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum planes from a combined view-projection matrix
    /// (Gribb/Hartmann), assuming zero-to-one clip depth.
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Builds a frustum from explicit planes.
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Returns `true` if a sphere intersects or lies inside the frustum.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }
}
