//! Scalar density fields evaluated at voxel centers

use noise::{NoiseFn, Perlin};

use crate::core::error::Error;
use crate::core::types::{Result, UVec3, Vec3};
use crate::math::aabb::Aabb;

/// Sampling frequency applied to voxel centers by [`NoiseDensity::default`]
pub const DEFAULT_NOISE_FREQUENCY: f32 = 0.5;

/// A density field over world space. Implementations must be safe to call
/// from many worker threads at once.
pub trait DensitySource: Send + Sync {
    fn density(&self, position: Vec3) -> f32;
}

impl<F> DensitySource for F
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    fn density(&self, position: Vec3) -> f32 {
        self(position)
    }
}

/// 3D Perlin noise at `position * frequency`, saturated to [0, 1]
pub struct NoiseDensity {
    noise: Perlin,
    frequency: f32,
}

impl NoiseDensity {
    pub fn new(seed: u32, frequency: f32) -> Self {
        Self {
            noise: Perlin::new(seed),
            frequency,
        }
    }
}

impl Default for NoiseDensity {
    fn default() -> Self {
        Self::new(0, DEFAULT_NOISE_FREQUENCY)
    }
}

impl DensitySource for NoiseDensity {
    fn density(&self, position: Vec3) -> f32 {
        let p = (position * self.frequency).as_dvec3();
        let value = self.noise.get([p.x, p.y, p.z]);
        (value as f32).clamp(0.0, 1.0)
    }
}

/// Externally supplied dense 3D buffer stretched over a box.
///
/// Values are laid out `x + y*dims.x + z*dims.x*dims.y`. Positions map to
/// cells through their normalized coordinate inside `bounds`; positions
/// outside the box read as zero.
#[derive(Clone, Debug)]
pub struct BufferDensity {
    bounds: Aabb,
    dimensions: UVec3,
    values: Vec<f32>,
}

impl BufferDensity {
    pub fn new(bounds: Aabb, dimensions: UVec3, values: Vec<f32>) -> Result<Self> {
        bounds.validate()?;
        let expected = dimensions.x as usize * dimensions.y as usize * dimensions.z as usize;
        if expected == 0 || values.len() != expected {
            return Err(Error::InvalidConfig(format!(
                "density buffer of {} values does not match dimensions {dimensions}",
                values.len()
            )));
        }
        Ok(Self { bounds, dimensions, values })
    }

    pub fn dimensions(&self) -> UVec3 {
        self.dimensions
    }
}

impl DensitySource for BufferDensity {
    fn density(&self, position: Vec3) -> f32 {
        if !self.bounds.contains_point(position) {
            return 0.0;
        }
        let normalized = (position - self.bounds.min) / self.bounds.size();
        let cell = (normalized * self.dimensions.as_vec3())
            .floor()
            .as_uvec3()
            .min(self.dimensions - UVec3::ONE);

        let (dx, dy) = (self.dimensions.x as usize, self.dimensions.y as usize);
        self.values[cell.x as usize + cell.y as usize * dx + cell.z as usize * dx * dy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_saturated_and_deterministic() {
        let a = NoiseDensity::default();
        let b = NoiseDensity::default();
        for i in 0..200 {
            let p = Vec3::new(i as f32 * 0.37, i as f32 * 0.11 - 3.0, 7.0 - i as f32 * 0.23);
            let d = a.density(p);
            assert!((0.0..=1.0).contains(&d));
            assert_eq!(d, b.density(p));
        }
    }

    #[test]
    fn test_noise_is_not_constant() {
        let noise = NoiseDensity::default();
        let values: Vec<f32> = (0..64)
            .map(|i| noise.density(Vec3::new(i as f32 * 0.9 + 0.3, 1.7, 2.1)))
            .collect();
        assert!(values.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_buffer_density_lookup() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let values: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let buffer = BufferDensity::new(bounds, UVec3::splat(2), values).unwrap();

        assert_eq!(buffer.density(Vec3::splat(0.5)), 0.0);
        assert_eq!(buffer.density(Vec3::new(1.5, 0.5, 0.5)), 1.0);
        assert_eq!(buffer.density(Vec3::new(0.5, 1.5, 1.5)), 6.0);
        assert_eq!(buffer.density(Vec3::splat(2.0)), 7.0);
        assert_eq!(buffer.density(Vec3::splat(3.0)), 0.0);
    }

    #[test]
    fn test_buffer_density_rejects_wrong_length() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(BufferDensity::new(bounds, UVec3::splat(2), vec![0.0; 7]).is_err());
        assert!(BufferDensity::new(bounds, UVec3::ZERO, vec![]).is_err());
    }
}
