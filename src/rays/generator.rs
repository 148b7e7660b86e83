//! One camera ray per cell of a viewport-aligned sample grid

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Mat4, Result, UVec2, Vec2};
use crate::math::ray::{clip_to_world, ray_through, Ray};
use crate::parallel::{fill_indexed, resize_if_changed, ParallelConfig};
use crate::stage::{Stage, StageState};

/// Inputs of the ray generator
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayGenParams {
    pub world_to_camera: Mat4,
    /// OpenGL clip convention (z in [-1, 1])
    pub projection: Mat4,
    /// Cells along x and y
    pub resolution: UVec2,
}

impl RayGenParams {
    pub fn new(world_to_camera: Mat4, projection: Mat4, resolution: UVec2) -> Self {
        Self { world_to_camera, projection, resolution }
    }

    pub fn from_camera(camera: &Camera, resolution: UVec2) -> Self {
        Self::new(camera.world_to_camera(), camera.projection(), resolution)
    }

    /// Derive the row count from the horizontal resolution and the aspect ratio
    /// (`count_y = floor(count_x / aspect)`).
    pub fn from_aspect(camera: &Camera, resolution_x: u32) -> Self {
        let resolution_y = (resolution_x as f32 / camera.aspect) as u32;
        Self::from_camera(camera, UVec2::new(resolution_x, resolution_y))
    }

    pub fn ray_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize
    }
}

/// Owns the ray buffer; index is `iy * count_x + ix`.
#[derive(Debug, Default)]
pub struct RayGenerator {
    state: StageState,
    resolution: UVec2,
    clip_to_world: Mat4,
    rays: Vec<Ray>,
    parallel: ParallelConfig,
}

impl RayGenerator {
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel, ..Default::default() }
    }

    /// Validate inputs and size the ray buffer. The buffer is only reallocated
    /// when the ray count changes.
    pub fn configure(&mut self, params: &RayGenParams) -> Result<()> {
        if params.resolution.min_element() == 0 {
            return Err(Error::InvalidConfig(format!(
                "ray resolution must be at least 1x1, got {}", params.resolution
            )));
        }
        let clip_to_world = clip_to_world(&params.projection, &params.world_to_camera)?;

        if resize_if_changed(&mut self.rays, params.ray_count()) {
            log::debug!("{}: allocated {} rays ({})", Self::NAME, self.rays.len(), params.resolution);
        }
        self.resolution = params.resolution;
        self.clip_to_world = clip_to_world;
        self.state = StageState::Ready;
        Ok(())
    }

    /// Regenerate every ray in place.
    pub fn run(&mut self) -> Result<&[Ray]> {
        self.ensure_ready()?;

        let count_x = self.resolution.x as usize;
        let count = self.resolution.as_vec2();
        let clip_to_world = self.clip_to_world;

        fill_indexed(&mut self.rays, &self.parallel, |index| {
            let ix = index % count_x;
            let iy = index / count_x;
            let uv = Vec2::new(ix as f32, iy as f32) / count;
            ray_through(&clip_to_world, uv)
        });

        Ok(&self.rays)
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }
}

impl Stage for RayGenerator {
    const NAME: &'static str = "ray_generator";

    fn state(&self) -> StageState {
        self.state
    }

    fn shutdown(&mut self) {
        if self.state == StageState::Released {
            return;
        }
        self.rays = Vec::new();
        self.state = StageState::Released;
    }
}
