//! Ray type, slab intersection and viewport unprojection

use crate::core::error::Error;
use crate::core::types::{Mat4, Result, Vec2, Vec3, Vec4};
use super::aabb::Aabb;

/// A ray defined by origin and direction.
///
/// The direction is not required to be normalized; consumers normalize it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Result of the slab test. `t_min`/`t_max` are always filled in, even on a miss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlabHit {
    pub hit: bool,
    pub t_min: f32,
    pub t_max: f32,
}

impl SlabHit {
    const MISS: SlabHit = SlabHit { hit: false, t_min: 0.0, t_max: 0.0 };
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get point along the normalized direction at distance t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction.normalize_or_zero() * t
    }

    /// Ray-AABB intersection using the slab method on the normalized direction.
    ///
    /// Zero direction components divide to ±infinity and resolve through the
    /// min/max reductions. A zero-length direction is a miss. A box lying
    /// entirely behind the origin (`t_max <= 0`) is a miss.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> SlabHit {
        let dir = self.direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return SlabHit::MISS;
        }

        let inv_dir = dir.recip();
        let t0 = (aabb.min - self.origin) * inv_dir;
        let t1 = (aabb.max - self.origin) * inv_dir;

        let t_min = t0.min(t1).max_element();
        let t_max = t0.max(t1).min_element();

        SlabHit {
            hit: t_min < t_max && t_max > 0.0,
            t_min,
            t_max,
        }
    }
}

/// Inverse of `projection * world_to_camera`, or `SingularMatrix`.
pub fn clip_to_world(projection: &Mat4, world_to_camera: &Mat4) -> Result<Mat4> {
    let m = *projection * *world_to_camera;
    let det = m.determinant();
    if !det.is_finite() || det.abs() < f32::MIN_POSITIVE {
        return Err(Error::SingularMatrix);
    }
    Ok(m.inverse())
}

/// Unproject a viewport point at clip depth `z` and perspective divide.
fn unproject(clip_to_world: &Mat4, uv: Vec2, z: f32) -> Option<Vec3> {
    let p = *clip_to_world * Vec4::new(uv.x * 2.0 - 1.0, uv.y * 2.0 - 1.0, z, 1.0);
    if p.w == 0.0 || !p.is_finite() {
        return None;
    }
    Some(p.truncate() / p.w)
}

/// Ray through viewport point `uv` from the near plane (clip z = -1) toward the
/// far plane (clip z = 1). Degenerate unprojections produce a zero-direction
/// ray, which every consumer treats as a miss.
pub fn ray_through(clip_to_world: &Mat4, uv: Vec2) -> Ray {
    match (unproject(clip_to_world, uv, -1.0), unproject(clip_to_world, uv, 1.0)) {
        (Some(near), Some(far)) => Ray::new(near, far - near),
        _ => Ray::default(),
    }
}

/// Build the world-space ray for a normalized viewport coordinate (u, v in [0, 1]).
///
/// `projection` must use the OpenGL clip convention (see `Mat4::perspective_rh_gl`).
pub fn viewport_point_to_ray(uv: Vec2, projection: &Mat4, world_to_camera: &Mat4) -> Result<Ray> {
    let inv = clip_to_world(projection, world_to_camera)?;
    let near = unproject(&inv, uv, -1.0).ok_or(Error::SingularMatrix)?;
    let far = unproject(&inv, uv, 1.0).ok_or(Error::SingularMatrix)?;
    Ok(Ray::new(near, far - near))
}

/// World-space point on the near clip plane under viewport coordinate `uv`.
pub fn viewport_point_to_world(uv: Vec2, projection: &Mat4, world_to_camera: &Mat4) -> Result<Vec3> {
    let inv = clip_to_world(projection, world_to_camera)?;
    unproject(&inv, uv, -1.0).ok_or(Error::SingularMatrix)
}
