//! Fixed-step marching from the entry point

use crate::core::types::Vec3;
use super::jitter::{JitterStream, TangentBasis};
use super::params::MarchParams;

/// Write samples at `entry + dir * j * fixed_step` until the distance passes the
/// segment length or `out` is full. Returns the number written.
pub(super) fn march_ray(
    entry: Vec3,
    exit: Vec3,
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
    let basis = TangentBasis::new(dir);

    let mut count = 0;
    for (j, slot) in out.iter_mut().enumerate() {
        let dist = j as f32 * params.fixed_step;
        if dist > length {
            break;
        }
        *slot = entry + dir * dist + jitter.offset(&basis);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march(entry: Vec3, exit: Vec3, params: &MarchParams) -> Vec<Vec3> {
        let mut out = vec![Vec3::ZERO; params.max_steps_per_ray as usize];
        let mut jitter = JitterStream::for_ray(params.seed, 0, params.jitter);
        let count = march_ray(entry, exit, params, &mut jitter, &mut out) as usize;
        out.truncate(count);
        out
    }

    #[test]
    fn test_unit_steps_through_cube() {
        let params = MarchParams { max_steps_per_ray: 16, fixed_step: 1.0, ..Default::default() };
        let samples = march(Vec3::new(4.0, 0.0, 4.0), Vec3::new(4.0, 8.0, 4.0), &params);
        assert_eq!(samples.len(), 9);
        for (i, p) in samples.iter().enumerate() {
            assert_eq!(*p, Vec3::new(4.0, i as f32, 4.0));
        }
    }

    #[test]
    fn test_capped_by_max_steps() {
        let params = MarchParams { max_steps_per_ray: 4, fixed_step: 0.5, ..Default::default() };
        assert_eq!(march(Vec3::ZERO, Vec3::X * 10.0, &params).len(), 4);
    }

    #[test]
    fn test_count_is_floor_plus_one() {
        let params = MarchParams { max_steps_per_ray: 256, fixed_step: 0.3, ..Default::default() };
        let entry = Vec3::new(1.0, -2.0, 0.5);
        // None of these lengths is near a multiple of the step
        for (length, expected) in [(0.1f32, 1), (1.0, 4), (2.95, 10), (7.3, 25)] {
            let dir = Vec3::new(0.2, 0.9, -0.4).normalize();
            let samples = march(entry, entry + dir * length, &params);
            assert_eq!(samples.len(), expected, "length {length}");

            for p in samples {
                assert!((p - entry).cross(dir).length() < 1e-4);
            }
        }
    }

    #[test]
    fn test_zero_length_segment_has_no_samples() {
        let params = MarchParams::default();
        assert!(march(Vec3::ONE, Vec3::ONE, &params).is_empty());
    }

    #[test]
    fn test_jitter_stays_in_tangent_plane() {
        let params = MarchParams { max_steps_per_ray: 32, fixed_step: 0.25, jitter: 0.2, ..Default::default() };
        let samples = march(Vec3::ZERO, Vec3::Y * 4.0, &params);
        assert_eq!(samples.len(), 17);
        for (i, p) in samples.iter().enumerate() {
            assert!((p.y - i as f32 * 0.25).abs() < 1e-5);
            assert!(p.x.abs() <= 0.2 + 1e-6 && p.z.abs() <= 0.2 + 1e-6);
        }
    }
}
