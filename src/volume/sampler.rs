//! Integer-coordinate access to a built voxel volume

use crate::core::error::Error;
use crate::core::types::{IVec3, Result, Vec3};
use super::grid::{Voxel, VoxelGrid};

/// Read access to a voxel volume by integer grid coordinate.
///
/// Coordinates outside `0 <= c < resolution` are a caller error and return
/// [`Error::OutOfBounds`]; callers pre-validate with [`world_to_grid`](Self::world_to_grid)
/// or the bounds accessors.
pub trait VolumeSampler {
    /// Grid min corner
    fn min(&self) -> Vec3;

    /// Grid max corner
    fn max(&self) -> Vec3;

    /// Voxels per axis
    fn resolution(&self) -> IVec3;

    fn sample(&self, coord: IVec3) -> Result<f32>;

    fn sample_box(&self, coord: IVec3) -> Result<Voxel>;

    /// Whether [`sample`](Self::sample) has values to return
    fn has_density(&self) -> bool;

    /// Remap a world point from `[min, max]` to `[0, resolution]` and floor it.
    /// `None` when the point falls outside the grid.
    fn world_to_grid(&self, point: Vec3) -> Option<IVec3> {
        let (min, max) = (self.min(), self.max());
        let resolution = self.resolution();
        let normalized = (point - min) / (max - min);
        if !normalized.is_finite() {
            return None;
        }
        let coord = (normalized * resolution.as_vec3()).floor().as_ivec3();
        let inside = coord.cmpge(IVec3::ZERO).all() && coord.cmplt(resolution).all();
        inside.then_some(coord)
    }

    /// Value of the voxel containing `point`, `None` outside the grid
    fn sample_world(&self, point: Vec3) -> Option<f32> {
        self.world_to_grid(point).and_then(|coord| self.sample(coord).ok())
    }
}

/// Borrowed view over a grid and its optional density buffer
#[derive(Clone, Copy, Debug)]
pub struct VoxelVolume<'a> {
    grid: &'a VoxelGrid,
    density: Option<&'a [f32]>,
}

impl<'a> VoxelVolume<'a> {
    pub fn new(grid: &'a VoxelGrid, density: Option<&'a [f32]>) -> Self {
        Self { grid, density }
    }

    fn index(&self, coord: IVec3) -> Result<usize> {
        self.grid
            .layout
            .flatten(coord)
            .filter(|&i| i < self.grid.voxels.len())
            .ok_or(Error::OutOfBounds { coord, resolution: self.grid.layout.resolution() })
    }
}

impl VolumeSampler for VoxelVolume<'_> {
    fn min(&self) -> Vec3 {
        self.grid.layout.extent().min
    }

    fn max(&self) -> Vec3 {
        self.grid.layout.extent().max
    }

    fn resolution(&self) -> IVec3 {
        self.grid.layout.resolution()
    }

    fn sample(&self, coord: IVec3) -> Result<f32> {
        let index = self.index(coord)?;
        let density = self.density.ok_or(Error::DensityMissing)?;
        Ok(density[index])
    }

    fn sample_box(&self, coord: IVec3) -> Result<Voxel> {
        let index = self.index(coord)?;
        Ok(self.grid.voxels[index])
    }

    fn has_density(&self) -> bool {
        self.density.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::aabb::Aabb;
    use crate::volume::grid::VoxelGridBuilder;

    fn builder(aabb: Aabb, resolution: u32) -> VoxelGridBuilder {
        let mut builder = VoxelGridBuilder::default();
        builder.configure(&aabb, resolution).unwrap();
        builder.run().unwrap();
        builder
    }

    #[test]
    fn test_sample_box_matches_builder() {
        let builder = builder(Aabb::new(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(3.0, 1.5, 4.0)), 11);
        let volume = builder.volume();
        let layout = builder.layout();

        for (index, voxel) in builder.grid().voxels.iter().enumerate() {
            let coord = layout.unflatten(index).as_ivec3();
            assert_eq!(volume.sample_box(coord).unwrap(), *voxel);
        }
    }

    #[test]
    fn test_out_of_range_is_error() {
        let builder = builder(Aabb::new(Vec3::ZERO, Vec3::splat(8.0)), 8);
        let volume = builder.volume();
        for coord in [IVec3::new(8, 0, 0), IVec3::new(0, -1, 0), IVec3::new(0, 0, 99)] {
            assert!(matches!(volume.sample_box(coord), Err(Error::OutOfBounds { .. })));
        }
    }

    #[test]
    fn test_sample_without_density() {
        let builder = builder(Aabb::new(Vec3::ZERO, Vec3::ONE), 8);
        assert!(matches!(builder.volume().sample(IVec3::ZERO), Err(Error::DensityMissing)));
        assert!(!builder.volume().has_density());
    }

    #[test]
    fn test_sample_reads_density() {
        let mut builder = builder(Aabb::new(Vec3::ZERO, Vec3::splat(8.0)), 8);
        builder.populate_density(&|p: Vec3| p.x + 10.0 * p.y).unwrap();
        let volume = builder.volume();
        assert_eq!(volume.sample(IVec3::new(2, 3, 0)).unwrap(), 2.5 + 35.0);
    }

    #[test]
    fn test_world_to_grid() {
        let builder = builder(Aabb::new(Vec3::ZERO, Vec3::splat(8.0)), 8);
        let volume = builder.volume();
        assert_eq!(volume.world_to_grid(Vec3::new(0.5, 7.9, 3.2)), Some(IVec3::new(0, 7, 3)));
        assert_eq!(volume.world_to_grid(Vec3::new(-0.5, 1.0, 1.0)), None);
        assert_eq!(volume.world_to_grid(Vec3::new(8.0, 1.0, 1.0)), None);
    }

    #[test]
    fn test_world_to_grid_uses_overhanging_extent() {
        // 3 x 1 x 3 box at resolution 5: voxel 0.6, count (5, 2, 5), grid reaches y = 1.2
        let builder = builder(Aabb::new(Vec3::ZERO, Vec3::new(3.0, 1.0, 3.0)), 5);
        let volume = builder.volume();
        assert_eq!(volume.resolution(), IVec3::new(5, 2, 5));
        let coord = volume.world_to_grid(Vec3::new(1.0, 0.7, 2.9)).unwrap();
        let voxel = volume.sample_box(coord).unwrap();
        assert!(voxel.bounds().contains_point(Vec3::new(1.0, 0.7, 2.9)));
    }

    #[test]
    fn test_sample_world() {
        let mut builder = builder(Aabb::new(Vec3::ZERO, Vec3::splat(4.0)), 4);
        builder.populate_density(&|p: Vec3| p.z).unwrap();
        assert_eq!(builder.volume().sample_world(Vec3::new(1.0, 1.0, 2.2)), Some(2.5));
        assert_eq!(builder.volume().sample_world(Vec3::splat(5.0)), None);
    }
}
