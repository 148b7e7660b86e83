//! Sampling points along the inside segment of every ray that hit the box.
//!
//! Two strategies share the same output layout: ray `i` owns slots
//! `i * max_steps_per_ray ..` of the point buffer, of which the first
//! `counts[i]` are valid.

mod classic;
mod planes;
pub mod jitter;
pub mod params;

pub use params::{MarchMode, MarchParams, MarchView};

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::frustum::Plane;
use crate::parallel::{fill_chunked, fill_indexed, resize_if_changed, ParallelConfig};
use crate::rays::intersector::IntersectionResult;
use crate::stage::{Stage, StageState};
use crate::volume::sampler::VolumeSampler;
use jitter::JitterStream;

/// Sample points of one run. Slots past a ray's count hold stale data.
#[derive(Clone, Debug, Default)]
pub struct MarchResult {
    pub points: Vec<Vec3>,
    pub counts: Vec<u32>,
    pub max_steps_per_ray: usize,
}

impl MarchResult {
    pub fn ray_count(&self) -> usize {
        self.counts.len()
    }

    /// Valid samples of ray `index`
    pub fn ray_samples(&self, index: usize) -> &[Vec3] {
        let start = index * self.max_steps_per_ray;
        &self.points[start..start + self.counts[index] as usize]
    }

    pub fn total_samples(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    /// Every valid sample as `(ray index, point)`
    pub fn samples(&self) -> impl Iterator<Item = (usize, Vec3)> + '_ {
        (0..self.ray_count())
            .flat_map(move |i| self.ray_samples(i).iter().map(move |&p| (i, p)))
    }
}

#[derive(Debug, Default)]
pub struct RayMarcher {
    state: StageState,
    params: MarchParams,
    result: MarchResult,
    reference_plane: Option<Plane>,
    parallel: ParallelConfig,
}

impl RayMarcher {
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel, ..Default::default() }
    }

    pub fn configure(&mut self, params: MarchParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.state = StageState::Ready;
        Ok(())
    }

    pub fn params(&self) -> &MarchParams {
        &self.params
    }

    /// March every ray of `hits`. `view` is required in SnapToPlanes mode and
    /// ignored otherwise.
    pub fn run(&mut self, hits: &IntersectionResult, view: Option<&MarchView>) -> Result<&MarchResult> {
        self.ensure_ready()?;

        let plane = match self.params.mode {
            MarchMode::Classic => None,
            MarchMode::SnapToPlanes => {
                let view = view.ok_or_else(|| {
                    Error::InvalidConfig("snap_to_planes marching needs a camera view".into())
                })?;
                view.validate()?;
                let plane = planes::reference_plane(hits, view);
                if plane.is_none() {
                    log::warn!("{}: no ray hit the box, nothing to snap to", Self::NAME);
                }
                plane
            }
        };
        self.reference_plane = plane;

        let max_steps = self.params.max_steps_per_ray as usize;
        let ray_count = hits.len();
        let resized = resize_if_changed(&mut self.result.points, ray_count * max_steps);
        if resize_if_changed(&mut self.result.counts, ray_count) || resized {
            log::debug!("{}: allocated {} rays x {} steps", Self::NAME, ray_count, max_steps);
        }
        self.result.max_steps_per_ray = max_steps;

        let params = self.params;
        let MarchResult { points, counts, .. } = &mut self.result;
        fill_chunked(points, max_steps, counts, &self.parallel, |i, out| {
            if !hits.hit[i] {
                return 0;
            }
            let mut jitter = JitterStream::for_ray(params.seed, i, params.jitter);
            let (entry, exit) = (hits.entry[i], hits.exit[i]);
            match (params.mode, plane.as_ref()) {
                (MarchMode::Classic, _) => classic::march_ray(entry, exit, &params, &mut jitter, out),
                (MarchMode::SnapToPlanes, Some(plane)) => {
                    planes::march_ray(entry, exit, plane, &params, &mut jitter, out)
                }
                (MarchMode::SnapToPlanes, None) => 0,
            }
        });

        Ok(&self.result)
    }

    pub fn result(&self) -> &MarchResult {
        &self.result
    }

    /// First plane of the last SnapToPlanes run
    pub fn reference_plane(&self) -> Option<Plane> {
        self.reference_plane
    }

    /// Density integrated along each ray: the sum of the volume values under
    /// each valid sample times `fixed_step`. Samples outside the volume count
    /// as empty.
    pub fn integrate_density<S>(&self, volume: &S) -> Result<Vec<f32>>
    where
        S: VolumeSampler + Sync,
    {
        self.ensure_ready()?;
        if !volume.has_density() {
            return Err(Error::DensityMissing);
        }

        let step = self.params.fixed_step;
        let result = &self.result;
        let mut totals = vec![0.0; result.ray_count()];
        fill_indexed(&mut totals, &self.parallel, |i| {
            let sum: f32 = result
                .ray_samples(i)
                .iter()
                .filter_map(|&p| volume.sample_world(p))
                .sum();
            sum * step
        });
        Ok(totals)
    }
}

impl Stage for RayMarcher {
    const NAME: &'static str = "ray_marcher";

    fn state(&self) -> StageState {
        self.state
    }

    fn shutdown(&mut self) {
        if self.state == StageState::Released {
            return;
        }
        self.result = MarchResult::default();
        self.reference_plane = None;
        self.state = StageState::Released;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::aabb::Aabb;
    use crate::math::ray::Ray;
    use crate::rays::intersector::BoxIntersector;
    use crate::volume::grid::{VoxelGrid, VoxelGridBuilder};
    use crate::volume::sampler::VoxelVolume;

    fn intersect(rays: &[Ray], aabb: Aabb) -> IntersectionResult {
        let mut intersector = BoxIntersector::default();
        intersector.configure(aabb).unwrap();
        intersector.run(rays).unwrap().clone()
    }

    fn fan_of_rays(origin: Vec3, target: Vec3, n: usize) -> Vec<Ray> {
        (0..n * n)
            .map(|i| {
                let offset = Vec3::new((i % n) as f32, (i / n) as f32, 0.0) / n as f32 * 6.0 - 3.0;
                Ray::new(origin, target + Vec3::new(offset.x, offset.y, 0.0) - origin)
            })
            .collect()
    }

    #[test]
    fn test_run_before_configure_fails() {
        let mut marcher = RayMarcher::default();
        let hits = IntersectionResult::default();
        assert!(matches!(marcher.run(&hits, None), Err(Error::NotReady(_))));
    }

    #[test]
    fn test_misses_have_no_samples() {
        let hits = intersect(
            &[Ray::new(Vec3::new(20.0, 0.0, 0.0), Vec3::X), Ray::new(Vec3::new(0.5, -1.0, 0.5), Vec3::Y)],
            Aabb::new(Vec3::ZERO, Vec3::ONE),
        );
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams { fixed_step: 0.25, ..Default::default() }).unwrap();
        let result = marcher.run(&hits, None).unwrap();

        assert_eq!(result.counts, vec![0, 5]);
        assert_eq!(result.points.len(), 32);
        assert_eq!(result.ray_samples(1)[4], Vec3::new(0.5, 1.0, 0.5));
        assert_eq!(result.samples().count(), 5);
    }

    #[test]
    fn test_classic_points_lie_on_rays() {
        let aabb = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        let rays = fan_of_rays(Vec3::new(0.5, 0.3, 10.0), Vec3::ZERO, 6);
        let hits = intersect(&rays, aabb);

        let mut marcher = RayMarcher::default();
        let params = MarchParams { max_steps_per_ray: 64, fixed_step: 0.2, ..Default::default() };
        marcher.configure(params).unwrap();
        let result = marcher.run(&hits, None).unwrap();

        for i in 0..rays.len() {
            assert!(result.counts[i] as usize <= 64);
            if !hits.hit[i] {
                assert_eq!(result.counts[i], 0);
                continue;
            }
            let dir = rays[i].direction.normalize();
            for &p in result.ray_samples(i) {
                assert!((p - rays[i].origin).cross(dir).length() < 1e-3);
            }
        }
        assert!(result.total_samples() > 0);
    }

    #[test]
    fn test_jitter_is_reproducible() {
        let aabb = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        let hits = intersect(&fan_of_rays(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 5), aabb);
        let params = MarchParams { max_steps_per_ray: 32, fixed_step: 0.3, jitter: 0.4, seed: 11, ..Default::default() };

        let mut a = RayMarcher::new(ParallelConfig { min_chunk: 1 });
        let mut b = RayMarcher::new(ParallelConfig { min_chunk: 1000 });
        a.configure(params).unwrap();
        b.configure(params).unwrap();
        let ra = a.run(&hits, None).unwrap().clone();
        let rb = b.run(&hits, None).unwrap();

        assert_eq!(ra.counts, rb.counts);
        let sa: Vec<_> = ra.samples().collect();
        let sb: Vec<_> = rb.samples().collect();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_snap_to_planes_shares_planes() {
        let aabb = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        let camera = Vec3::new(1.0, 2.0, 9.0);
        let rays = fan_of_rays(camera, Vec3::ZERO, 8);
        let hits = intersect(&rays, aabb);

        let normal = (Vec3::ZERO - camera).normalize();
        let view = MarchView::new(camera, normal);
        let params = MarchParams { max_steps_per_ray: 64, fixed_step: 0.25, mode: MarchMode::SnapToPlanes, ..Default::default() };
        let mut marcher = RayMarcher::default();
        marcher.configure(params).unwrap();
        let result = marcher.run(&hits, Some(&view)).unwrap();
        assert!(result.total_samples() > 0);

        let reference = marcher.reference_plane().unwrap();
        let base = reference.distance;
        assert!((reference.normal + normal).length() < 1e-5);
        for (_, p) in marcher.result().samples() {
            let k = (normal.dot(p) - base) / params.fixed_step;
            assert!((k - k.round()).abs() < 1e-2, "sample {p} between planes (k = {k})");
            assert!(k.round() >= 0.0);
        }
    }

    #[test]
    fn test_snap_to_planes_requires_view() {
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams { mode: MarchMode::SnapToPlanes, ..Default::default() }).unwrap();
        let hits = IntersectionResult::from_segments([(Vec3::ZERO, Vec3::ONE, true)]);
        assert!(matches!(marcher.run(&hits, None), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_snap_to_planes_without_hits() {
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams { mode: MarchMode::SnapToPlanes, ..Default::default() }).unwrap();
        let hits = IntersectionResult::from_segments([(Vec3::ZERO, Vec3::ONE, false)]);
        let view = MarchView::new(Vec3::Z * 5.0, Vec3::NEG_Z);
        let result = marcher.run(&hits, Some(&view)).unwrap();
        assert_eq!(result.counts, vec![0]);
        assert!(marcher.reference_plane().is_none());
    }

    #[test]
    fn test_integrate_density() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        let mut grid = VoxelGridBuilder::default();
        grid.configure(&aabb, 4).unwrap();
        grid.run().unwrap();

        let hits = intersect(&[Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z)], aabb);
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams { max_steps_per_ray: 16, fixed_step: 0.5, ..Default::default() }).unwrap();
        marcher.run(&hits, None).unwrap();

        assert!(matches!(marcher.integrate_density(&grid.volume()), Err(Error::DensityMissing)));

        grid.populate_density(&|_: Vec3| 1.0f32).unwrap();
        let totals = marcher.integrate_density(&grid.volume()).unwrap();
        // 9 samples at z = 0, 0.5, .., 4; the one at z = 4 is outside the grid
        assert_eq!(totals, vec![4.0]);
    }

    #[test]
    fn test_integrate_empty_volume_without_density() {
        let hits = intersect(&[Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z)], Aabb::new(Vec3::ZERO, Vec3::ONE));
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams::default()).unwrap();
        marcher.run(&hits, None).unwrap();

        let empty = VoxelGrid::default();
        let volume = VoxelVolume::new(&empty, None);
        assert!(matches!(marcher.integrate_density(&volume), Err(Error::DensityMissing)));

        let no_values: [f32; 0] = [];
        let volume = VoxelVolume::new(&empty, Some(&no_values));
        assert_eq!(marcher.integrate_density(&volume).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_shutdown_releases_buffers() {
        let mut marcher = RayMarcher::default();
        marcher.configure(MarchParams::default()).unwrap();
        marcher.run(&IntersectionResult::from_segments([(Vec3::ZERO, Vec3::ONE, true)]), None).unwrap();
        marcher.shutdown();
        assert!(marcher.result().points.is_empty());
        assert_eq!(marcher.state(), StageState::Released);
    }
}
