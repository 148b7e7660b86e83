//! Runs the stages in order for one camera/box configuration.
//!
//! Ray generation and voxel work are independent and run concurrently;
//! intersection and marching follow the rays. The voxel grid and its density
//! are only rebuilt when the bounds or volume settings change.

use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::core::types::{Result, UVec2};
use crate::march::{MarchResult, MarchView, RayMarcher};
use crate::math::ray::Ray;
use crate::rays::{BoxIntersector, IntersectionResult, RayGenParams, RayGenerator};
use crate::stage::Stage;
use crate::volume::density::DensitySource;
use crate::volume::grid::VoxelGridBuilder;
use crate::volume::sampler::VoxelVolume;

/// Summary of one run
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineStats {
    pub ray_count: usize,
    pub hit_count: usize,
    pub sample_count: usize,
    pub voxel_count: usize,
    pub elapsed: Duration,
}

/// Owns every stage and the per-frame camera view.
pub struct Pipeline {
    rays: RayGenerator,
    intersector: BoxIntersector,
    volume: VoxelGridBuilder,
    marcher: RayMarcher,
    density: Option<Box<dyn DensitySource>>,
    view: Option<MarchView>,
    config: Option<PipelineConfig>,
    volume_dirty: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            rays: RayGenerator::default(),
            intersector: BoxIntersector::default(),
            volume: VoxelGridBuilder::default(),
            marcher: RayMarcher::default(),
            density: None,
            view: None,
            config: None,
            volume_dirty: true,
        }
    }

    /// Validate `config` and configure every stage. On error nothing changes.
    pub fn configure(&mut self, config: &PipelineConfig) -> Result<()> {
        config.validate()?;
        let ray_params = RayGenParams::from_camera(&config.camera, config.ray_resolution);

        let parallel_changed = self.config.as_ref().is_none_or(|c| c.parallel != config.parallel);
        if parallel_changed {
            self.rays = RayGenerator::new(config.parallel);
            self.intersector = BoxIntersector::new(config.parallel);
            self.volume = VoxelGridBuilder::new(config.parallel);
            self.marcher = RayMarcher::new(config.parallel);
            self.volume_dirty = true;
        }

        // `validate` covers every stage check, so none of these fail and no
        // stage is left configured from a rejected config.
        self.rays.configure(&ray_params)?;
        self.intersector.configure(config.bounds)?;
        self.marcher.configure(config.march)?;

        let volume_changed = self.config.as_ref().is_none_or(|c| {
            c.bounds != config.bounds || c.volume != config.volume
        });
        if volume_changed {
            self.volume.configure(&config.bounds, config.volume.resolution)?;
            self.density = config.volume.density.source();
            self.volume_dirty = true;
        }

        self.view = Some(MarchView::from_camera(&config.camera));
        self.config = Some(config.clone());
        Ok(())
    }

    /// Replace the density field with an external one; applied on the next run.
    pub fn set_density_source(&mut self, source: Box<dyn DensitySource>) {
        self.density = Some(source);
        self.volume_dirty = true;
    }

    /// Execute all stages once.
    pub fn run(&mut self) -> Result<PipelineStats> {
        let start = Instant::now();

        let Self { rays, intersector, volume, marcher, density, view, volume_dirty, .. } = self;
        let rebuild_volume = *volume_dirty;

        let (ray_result, volume_result) = rayon::join(
            || rays.run().map(|_| ()),
            || -> Result<()> {
                if rebuild_volume {
                    volume.run()?;
                    if let Some(source) = density.as_deref() {
                        volume.populate_density(source)?;
                    }
                }
                Ok(())
            },
        );
        ray_result?;
        volume_result?;
        *volume_dirty = false;

        let hits = intersector.run(rays.rays())?;
        let march = marcher.run(hits, view.as_ref())?;

        let stats = PipelineStats {
            ray_count: hits.len(),
            hit_count: hits.hit_count(),
            sample_count: march.total_samples(),
            voxel_count: volume.grid().voxels.len(),
            elapsed: start.elapsed(),
        };
        log::info!(
            "Marched {} rays ({} hits, {} samples), {} voxels in {:.2}ms",
            stats.ray_count,
            stats.hit_count,
            stats.sample_count,
            stats.voxel_count,
            stats.elapsed.as_secs_f64() * 1000.0
        );

        Ok(stats)
    }

    /// Release every stage's buffers. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.rays.shutdown();
        self.intersector.shutdown();
        self.volume.shutdown();
        self.marcher.shutdown();
        self.config = None;
        self.volume_dirty = true;
    }

    pub fn config(&self) -> Option<&PipelineConfig> {
        self.config.as_ref()
    }

    pub fn ray_resolution(&self) -> UVec2 {
        self.rays.resolution()
    }

    pub fn rays(&self) -> &[Ray] {
        self.rays.rays()
    }

    pub fn intersections(&self) -> &IntersectionResult {
        self.intersector.result()
    }

    pub fn march(&self) -> &MarchResult {
        self.marcher.result()
    }

    pub fn marcher(&self) -> &RayMarcher {
        &self.marcher
    }

    pub fn volume(&self) -> VoxelVolume<'_> {
        self.volume.volume()
    }

    /// Integrated density along each ray of the last run
    pub fn integrate_density(&self) -> Result<Vec<f32>> {
        self.marcher.integrate_density(&self.volume.volume())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
