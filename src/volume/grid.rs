//! Regular voxel grid over a bounding box.
//!
//! Voxels are cubic: the longest box side is split into `resolution` cells and
//! the other axes get `ceil(resolution * side / longest)` cells of the same
//! size, so the grid may overhang the box by less than one voxel on the
//! shorter axes.

use crate::core::error::Error;
use crate::core::types::{IVec3, Result, UVec3, Vec3};
use crate::math::aabb::Aabb;
use crate::parallel::{fill_indexed, resize_if_changed, ParallelConfig};
use crate::stage::{Stage, StageState};
use super::density::DensitySource;
use super::sampler::VoxelVolume;

/// One grid cell
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Voxel {
    pub center: Vec3,
    pub half_extent: f32,
}

impl Voxel {
    /// Edge length
    pub fn size(&self) -> f32 {
        self.half_extent * 2.0
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extent(self.center, Vec3::splat(self.half_extent))
    }
}

/// Derived dimensions of a grid; all index arithmetic lives here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridLayout {
    /// Box min corner, the grid origin
    pub origin: Vec3,
    pub voxel_size: f32,
    pub count: UVec3,
}

impl GridLayout {
    pub fn new(aabb: &Aabb, resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::InvalidConfig("voxel resolution must be at least 1".into()));
        }
        aabb.validate()?;

        let size = aabb.size();
        if size.min_element() <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "box must have positive extent on every axis, got {size}"
            )));
        }

        let max_side = aabb.max_side();
        let relative = size / max_side;
        let count = (relative * resolution as f32).ceil().as_uvec3();

        // Coordinates are addressed as IVec3 and flattened into a usize index.
        let addressable = count.max_element() <= i32::MAX as u32
            && (count.x as usize)
                .checked_mul(count.y as usize)
                .and_then(|n| n.checked_mul(count.z as usize))
                .is_some();
        if !addressable {
            return Err(Error::InvalidConfig(format!(
                "voxel resolution {resolution} gives an unaddressable grid of {count} voxels"
            )));
        }

        Ok(Self {
            origin: aabb.min,
            voxel_size: max_side / resolution as f32,
            count,
        })
    }

    pub fn voxel_count(&self) -> usize {
        self.count.x as usize * self.count.y as usize * self.count.z as usize
    }

    /// `count` as signed coordinates, for bounds checks
    pub fn resolution(&self) -> IVec3 {
        self.count.as_ivec3()
    }

    /// Region actually covered by voxels (box min to `min + count * voxel_size`)
    pub fn extent(&self) -> Aabb {
        Aabb::new(self.origin, self.origin + self.count.as_vec3() * self.voxel_size)
    }

    pub fn contains(&self, coord: IVec3) -> bool {
        coord.cmpge(IVec3::ZERO).all() && coord.cmplt(self.resolution()).all()
    }

    /// Flattened index `x + y*count.x + z*count.x*count.y`, `None` out of range
    pub fn flatten(&self, coord: IVec3) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let c = coord.as_uvec3();
        let (cx, cy) = (self.count.x as usize, self.count.y as usize);
        Some(c.x as usize + c.y as usize * cx + c.z as usize * cx * cy)
    }

    pub fn unflatten(&self, index: usize) -> UVec3 {
        let (cx, cy) = (self.count.x as usize, self.count.y as usize);
        UVec3::new(
            (index % cx) as u32,
            ((index / cx) % cy) as u32,
            (index / (cx * cy)) as u32,
        )
    }

    pub fn voxel_at(&self, index: usize) -> Voxel {
        let cell = self.unflatten(index).as_vec3();
        Voxel {
            center: cell * self.voxel_size + self.origin + self.voxel_size * 0.5,
            half_extent: self.voxel_size * 0.5,
        }
    }
}

/// Layout plus the generated voxels
#[derive(Clone, Debug, Default)]
pub struct VoxelGrid {
    pub layout: GridLayout,
    pub voxels: Vec<Voxel>,
}

/// Builds the voxel grid and the optional density buffer.
#[derive(Debug, Default)]
pub struct VoxelGridBuilder {
    state: StageState,
    grid: VoxelGrid,
    density: Vec<f32>,
    generated: bool,
    populated: bool,
    parallel: ParallelConfig,
}

impl VoxelGridBuilder {
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel, ..Default::default() }
    }

    /// Derive the layout. Voxel storage is reallocated only when the voxel
    /// count changes; any change of layout invalidates generated content.
    pub fn configure(&mut self, aabb: &Aabb, resolution: u32) -> Result<()> {
        let layout = GridLayout::new(aabb, resolution)?;

        if resize_if_changed(&mut self.grid.voxels, layout.voxel_count()) {
            log::debug!("{}: allocated {} voxels ({})", Self::NAME, layout.voxel_count(), layout.count);
            self.density.clear();
        }
        if layout != self.grid.layout {
            self.generated = false;
            self.populated = false;
        }
        self.grid.layout = layout;
        self.state = StageState::Ready;
        Ok(())
    }

    /// Compute every voxel center in parallel.
    pub fn run(&mut self) -> Result<&VoxelGrid> {
        self.ensure_ready()?;

        let layout = self.grid.layout;
        fill_indexed(&mut self.grid.voxels, &self.parallel, |index| layout.voxel_at(index));
        self.generated = true;
        self.populated = false;

        Ok(&self.grid)
    }

    /// Fill one density value per voxel from `source`, evaluated at the voxel
    /// center. Requires a completed [`run`](Self::run).
    pub fn populate_density(&mut self, source: &dyn DensitySource) -> Result<&[f32]> {
        self.ensure_ready()?;
        if !self.generated {
            return Err(Error::NotReady("voxel_grid (generate before populating density)"));
        }

        resize_if_changed(&mut self.density, self.grid.voxels.len());
        let voxels = &self.grid.voxels;
        fill_indexed(&mut self.density, &self.parallel, |index| {
            source.density(voxels[index].center)
        });
        self.populated = true;

        Ok(&self.density)
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn layout(&self) -> &GridLayout {
        &self.grid.layout
    }

    /// Density buffer, present only after a successful population pass
    pub fn density(&self) -> Option<&[f32]> {
        self.populated.then_some(self.density.as_slice())
    }

    /// Read-only sampling view over the grid and density
    pub fn volume(&self) -> VoxelVolume<'_> {
        VoxelVolume::new(&self.grid, self.density())
    }
}

impl Stage for VoxelGridBuilder {
    const NAME: &'static str = "voxel_grid";

    fn state(&self) -> StageState {
        self.state
    }

    fn shutdown(&mut self) {
        if self.state == StageState::Released {
            return;
        }
        self.grid = VoxelGrid::default();
        self.density = Vec::new();
        self.generated = false;
        self.populated = false;
        self.state = StageState::Released;
    }
}
