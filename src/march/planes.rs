//! Marching that snaps samples to camera-facing planes shared by all rays

use rayon::prelude::*;

use crate::core::types::Vec3;
use crate::math::frustum::Plane;
use crate::math::ray::Ray;
use crate::rays::intersector::IntersectionResult;
use super::jitter::{JitterStream, TangentBasis};
use super::params::{MarchParams, MarchView};

/// First plane of the family: faces the camera and passes through the hit
/// entry point closest to it. `None` when no ray hit.
pub(super) fn reference_plane(hits: &IntersectionResult, view: &MarchView) -> Option<Plane> {
    let camera = view.camera_position;
    let (_, closest) = (0..hits.len())
        .into_par_iter()
        .filter(|&i| hits.hit[i])
        .map(|i| (hits.entry[i].distance_squared(camera), i))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))?;

    Some(Plane::from_normal_and_point(-view.view_plane_normal, hits.entry[closest]))
}

/// For plane `j` (the reference shifted `j * fixed_step` away from the camera)
/// write a sample where the segment crosses it within `(0, length]`. Jitter is
/// drawn every step so the stream position does not depend on hits.
pub(super) fn march_ray(
    entry: Vec3,
    exit: Vec3,
    plane: &Plane,
    params: &MarchParams,
    jitter: &mut JitterStream,
    out: &mut [Vec3],
) -> u32 {
    let segment = exit - entry;
    let length = segment.length();
    if !(length > 0.0 && length.is_finite()) {
        return 0;
    }
    let dir = segment / length;
    let ray = Ray::new(entry, dir);
    let basis = TangentBasis::new(dir);

    let mut count = 0;
    for j in 0..out.len() {
        let offset = jitter.offset(&basis);
        let shifted = plane.offset_by(j as f32 * params.fixed_step);

        match shifted.intersect_ray(&ray) {
            Some(t) if t > 0.0 && t <= length => {
                out[count] = entry + dir * t + offset;
                count += 1;
            }
            _ => {}
        }
    }
    count as u32
}
