//! Ray-marching tunables

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

pub const MAX_STEPS_RANGE: (u32, u32) = (1, 256);
pub const FIXED_STEP_RANGE: (f32, f32) = (0.01, 1.0);
pub const JITTER_RANGE: (f32, f32) = (0.0, 1.0);

/// How sample positions are chosen along each ray. One mode governs a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarchMode {
    /// Fixed distance steps from the entry point
    #[default]
    Classic,
    /// Samples on a family of parallel planes facing the camera, shared by all rays
    SnapToPlanes,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchParams {
    pub max_steps_per_ray: u32,
    /// Distance between samples (Classic) or between planes (SnapToPlanes)
    pub fixed_step: f32,
    /// Max offset of a sample along each tangent axis
    pub jitter: f32,
    pub mode: MarchMode,
    /// Base seed of the per-ray jitter streams
    pub seed: u64,
}

impl Default for MarchParams {
    fn default() -> Self {
        Self {
            max_steps_per_ray: 16,
            fixed_step: 0.1,
            jitter: 0.0,
            mode: MarchMode::Classic,
            seed: 0,
        }
    }
}

impl MarchParams {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = MAX_STEPS_RANGE;
        if !(lo..=hi).contains(&self.max_steps_per_ray) {
            return Err(Error::InvalidConfig(format!(
                "max_steps_per_ray {} outside [{lo}, {hi}]", self.max_steps_per_ray
            )));
        }
        let (lo, hi) = FIXED_STEP_RANGE;
        if !(lo..=hi).contains(&self.fixed_step) {
            return Err(Error::InvalidConfig(format!(
                "fixed_step {} outside [{lo}, {hi}]", self.fixed_step
            )));
        }
        let (lo, hi) = JITTER_RANGE;
        if !(lo..=hi).contains(&self.jitter) {
            return Err(Error::InvalidConfig(format!(
                "jitter {} outside [{lo}, {hi}]", self.jitter
            )));
        }
        Ok(())
    }
}

/// Per-frame camera inputs needed by SnapToPlanes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchView {
    pub camera_position: Vec3,
    /// Near frustum plane normal, pointing away from the camera
    pub view_plane_normal: Vec3,
}

impl MarchView {
    pub fn new(camera_position: Vec3, view_plane_normal: Vec3) -> Self {
        Self { camera_position, view_plane_normal }
    }

    pub fn from_camera(camera: &Camera) -> Self {
        Self::new(camera.position, camera.near_plane_normal())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.camera_position.is_finite()
            || !self.view_plane_normal.is_finite()
            || self.view_plane_normal.length_squared() == 0.0
        {
            return Err(Error::InvalidConfig(format!("degenerate march view {self:?}")));
        }
        Ok(())
    }
}
