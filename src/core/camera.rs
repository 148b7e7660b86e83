//! Camera producing the matrices the ray generator consumes

use serde::{Deserialize, Serialize};

use glam::Mat3;

use crate::core::types::{Vec3, Mat4, Quat};
use crate::math::frustum::Frustum;

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera looking down -Z
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Camera at `position` facing `target`, with `up` as the approximate up axis
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let back = (position - target).normalize();
        let right = up.cross(back).normalize();
        let rotation = Quat::from_mat3(&Mat3::from_cols(right, back.cross(right), back));
        Self { position, rotation, ..Self::default() }
    }

    /// World to camera space (the view matrix)
    pub fn world_to_camera(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// Camera to clip space, OpenGL depth convention (z in [-1, 1])
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.world_to_camera()
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Normal of the near frustum plane, pointing into the frustum.
    pub fn near_plane_normal(&self) -> Vec3 {
        Frustum::from_view_projection(&self.view_projection()).near().normal
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert!((camera.forward().z - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_world_to_camera_translation() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 0.0);

        let origin_in_camera = camera.world_to_camera().transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_near_plane_normal_matches_forward() {
        let camera = Camera::look_at(Vec3::new(3.0, 4.0, -6.0), Vec3::ZERO, Vec3::Y);
        let normal = camera.near_plane_normal();
        assert!(normal.dot(camera.forward()) > 0.999);
    }
}
