//! Entry/exit points of every ray against a box

use rayon::prelude::*;

use crate::core::types::{Result, Vec3};
use crate::math::aabb::Aabb;
use crate::math::ray::Ray;
use crate::parallel::{resize_if_changed, ParallelConfig};
use crate::stage::{Stage, StageState};

/// Per-ray intersection, indexed like the ray set.
///
/// On a miss `entry`/`exit` still hold the slab extremes; only `hit` makes
/// the segment valid.
#[derive(Clone, Debug, Default)]
pub struct IntersectionResult {
    pub entry: Vec<Vec3>,
    pub exit: Vec<Vec3>,
    pub hit: Vec<bool>,
}

impl IntersectionResult {
    pub fn len(&self) -> usize {
        self.hit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hit.is_empty()
    }

    pub fn hit_count(&self) -> usize {
        self.hit.iter().filter(|&&h| h).count()
    }

    /// Build from per-ray tuples, mostly for drivers that computed hits elsewhere.
    pub fn from_segments(segments: impl IntoIterator<Item = (Vec3, Vec3, bool)>) -> Self {
        let mut result = Self::default();
        for (entry, exit, hit) in segments {
            result.entry.push(entry);
            result.exit.push(exit);
            result.hit.push(hit);
        }
        result
    }

    fn resize(&mut self, len: usize) -> bool {
        let a = resize_if_changed(&mut self.entry, len);
        let b = resize_if_changed(&mut self.exit, len);
        let c = resize_if_changed(&mut self.hit, len);
        a || b || c
    }
}

#[derive(Debug, Default)]
pub struct BoxIntersector {
    state: StageState,
    aabb: Aabb,
    result: IntersectionResult,
    parallel: ParallelConfig,
}

impl BoxIntersector {
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel, ..Default::default() }
    }

    pub fn configure(&mut self, aabb: Aabb) -> Result<()> {
        aabb.validate()?;
        self.aabb = aabb;
        self.state = StageState::Ready;
        Ok(())
    }

    /// Intersect every ray with the configured box. Output buffers follow the
    /// ray count and are reused while it stays the same.
    pub fn run(&mut self, rays: &[Ray]) -> Result<&IntersectionResult> {
        self.ensure_ready()?;

        if self.result.resize(rays.len()) {
            log::debug!("{}: allocated {} intersection slots", Self::NAME, rays.len());
        }

        let aabb = self.aabb;
        let IntersectionResult { entry, exit, hit } = &mut self.result;
        (entry.par_iter_mut(), exit.par_iter_mut(), hit.par_iter_mut())
            .into_par_iter()
            .zip(rays.par_iter())
            .with_min_len(self.parallel.min_len())
            .for_each(|((entry, exit, hit), ray)| {
                let slab = ray.intersect_aabb(&aabb);
                *entry = ray.at(slab.t_min);
                *exit = ray.at(slab.t_max);
                *hit = slab.hit;
            });

        Ok(&self.result)
    }

    pub fn result(&self) -> &IntersectionResult {
        &self.result
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }
}

impl Stage for BoxIntersector {
    const NAME: &'static str = "box_intersector";

    fn state(&self) -> StageState {
        self.state
    }

    fn shutdown(&mut self) {
        if self.state == StageState::Released {
            return;
        }
        self.result = IntersectionResult::default();
        self.state = StageState::Released;
    }
}
