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

//! Bounding volumes and the culling contract used by the light registry.

use super::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A spatial volume that light bounds can be tested against.
///
/// The light registry only ever asks one question per light and frame: does
/// the light's bounding box touch the cull volume at all? Anything that can
/// answer it (a camera frustum, a room box, a portal volume) can drive culling.
pub trait CullVolume {
    /// Returns `true` if `bounds` is at least partially inside this volume.
    fn intersects(&self, bounds: &Aabb) -> bool;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// A box covering all of space, used for lights without a finite extent.
    pub const INFINITE: Self = Self {
        min: Vec3::splat(f32::NEG_INFINITY),
        max: Vec3::splat(f32::INFINITY),
    };

    /// Creates a new `Aabb` from two corner points, in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates a new `Aabb` from a center point and its half-extents.
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let h = Vec3::new(
            half_extents.x.abs(),
            half_extents.y.abs(),
            half_extents.z.abs(),
        );
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// Calculates the center point of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Checks if a point is contained within or on the boundary of the box.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Checks if this box overlaps another. Touching boxes intersect.
    #[inline]
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        (self.min.x <= other.max.x && self.max.x >= other.min.x)
            && (self.min.y <= other.max.y && self.max.y >= other.min.y)
            && (self.min.z <= other.max.z && self.max.z >= other.min.z)
    }
}

impl CullVolume for Aabb {
    #[inline]
    fn intersects(&self, bounds: &Aabb) -> bool {
        self.intersects_aabb(bounds)
    }
}

/// A plane in Hessian normal form: `normal · p + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// The plane normal, pointing towards the "inside" half-space.
    pub normal: Vec3,
    /// The signed offset of the plane from the origin.
    pub d: f32,
}

impl Plane {
    /// Creates a plane from raw `(a, b, c, d)` coefficients and normalizes it.
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: v.w / len,
            }
        } else {
            Self { normal, d: v.w }
        }
    }

    /// Signed distance from the plane to `point`; positive on the inside.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// A view frustum made of six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum planes from a view-projection matrix with a
    /// [0, 1] depth range.
    pub fn from_view_proj(m: &Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);
        let sub = |a: Vec4, b: Vec4| Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.w - b.w);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(sub(r3, r0)),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(sub(r3, r1)),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(sub(r3, r2)),
            ],
        }
    }

    /// Tests the box's positive vertex against every plane.
    pub fn intersects_aabb(&self, bounds: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // Zero normal components are skipped so infinite boxes never produce NaN.
            let axis = |n: f32, lo: f32, hi: f32| {
                if n > 0.0 {
                    n * hi
                } else if n < 0.0 {
                    n * lo
                } else {
                    0.0
                }
            };
            let n = plane.normal;
            let dist = axis(n.x, bounds.min.x, bounds.max.x)
                + axis(n.y, bounds.min.y, bounds.max.y)
                + axis(n.z, bounds.min.z, bounds.max.z)
                + plane.d;
            dist >= 0.0
        })
    }
}

impl CullVolume for Frustum {
    #[inline]
    fn intersects(&self, bounds: &Aabb) -> bool {
        self.intersects_aabb(bounds)
    }
}
