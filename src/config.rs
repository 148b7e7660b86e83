//! Pipeline configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Result, UVec2, Vec3};
use crate::march::MarchParams;
use crate::math::aabb::Aabb;
use crate::math::ray::clip_to_world;
use crate::parallel::ParallelConfig;
use crate::volume::grid::GridLayout;
use crate::volume::density::{DensitySource, NoiseDensity, DEFAULT_NOISE_FREQUENCY};

/// Accepted voxel resolution (cells along the longest box side)
pub const VOLUME_RESOLUTION_RANGE: (u32, u32) = (8, 128);

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the driver resolves before running the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub camera: Camera,
    /// Box the rays are intersected with and the voxel grid covers
    pub bounds: Aabb,
    /// Ray grid cells along x and y
    pub ray_resolution: UVec2,
    pub volume: VolumeConfig,
    pub march: MarchParams,
    pub parallel: ParallelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: Camera::look_at(Vec3::new(4.0, 6.0, 20.0), Vec3::splat(4.0), Vec3::Y),
            bounds: Aabb::new(Vec3::ZERO, Vec3::splat(8.0)),
            ray_resolution: UVec2::new(32, 18),
            volume: VolumeConfig::default(),
            march: MarchParams::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check everything the stages check when configured, so a config that
    /// passes configures every stage.
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        if !camera.position.is_finite() || !camera.rotation.is_finite() {
            return Err(Error::InvalidConfig("camera transform must be finite".into()));
        }
        if !(camera.aspect > 0.0) || !(camera.fov_y > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "camera fov {} and aspect {} must be positive", camera.fov_y, camera.aspect
            )));
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(Error::InvalidConfig(format!(
                "camera clip planes must satisfy 0 < near < far, got {} / {}", camera.near, camera.far
            )));
        }

        clip_to_world(&camera.projection(), &camera.world_to_camera())?;

        self.bounds.validate()?;

        if self.ray_resolution.min_element() == 0 {
            return Err(Error::InvalidConfig(format!(
                "ray resolution must be at least 1x1, got {}", self.ray_resolution
            )));
        }

        let (lo, hi) = VOLUME_RESOLUTION_RANGE;
        if !(lo..=hi).contains(&self.volume.resolution) {
            return Err(Error::InvalidConfig(format!(
                "volume resolution {} outside [{lo}, {hi}]", self.volume.resolution
            )));
        }
        GridLayout::new(&self.bounds, self.volume.resolution)?;

        self.march.validate()
    }

    /// Load from a JSON file
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Voxels along the longest box side
    pub resolution: u32,
    pub density: DensityConfig,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            resolution: 32,
            density: DensityConfig::default(),
        }
    }
}

/// Built-in density fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DensityConfig {
    /// Grid only, no density pass
    None,
    Noise { seed: u32, frequency: f32 },
}

impl Default for DensityConfig {
    fn default() -> Self {
        DensityConfig::Noise { seed: 0, frequency: DEFAULT_NOISE_FREQUENCY }
    }
}

impl DensityConfig {
    pub fn source(&self) -> Option<Box<dyn DensitySource>> {
        match *self {
            DensityConfig::None => None,
            DensityConfig::Noise { seed, frequency } => {
                Some(Box::new(NoiseDensity::new(seed, frequency)))
            }
        }
    }
}
