//! Planes and the view frustum

use crate::core::types::{Vec3, Vec4, Mat4};
use super::ray::Ray;

/// Below this |n·d| a ray is treated as parallel to a plane
const PARALLEL_EPSILON: f32 = 1e-6;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane with the given (normalized) normal passing through `point`
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self { normal, distance: -normal.dot(point) }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Same plane moved by `offset` against its normal.
    pub fn offset_by(&self, offset: f32) -> Plane {
        Plane { normal: self.normal, distance: self.distance + offset }
    }

    /// Parameter along the normalized ray direction where the ray crosses the
    /// plane. `None` when the ray is parallel or has no direction. Negative
    /// values mean the crossing lies behind the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let dir = ray.direction.normalize_or_zero();
        let denom = dir.dot(self.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        Some(-self.distance_to_point(ray.origin) / denom)
    }
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the six planes of an OpenGL-convention view-projection matrix
    /// by adding and subtracting its rows. Normals point into the frustum.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let [x, y, z, w] = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        Self {
            planes: [w + z, w - z, w + x, w - x, w - y, w + y].map(Self::normalize_plane),
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = plane.truncate();
        let len = normal.length();
        if len == 0.0 {
            return Plane::new(Vec3::ZERO, 0.0);
        }
        Plane::new(normal / len, plane.w / len)
    }

    /// Near plane, normal pointing into the frustum
    pub fn near(&self) -> Plane {
        self.planes[0]
    }
}
